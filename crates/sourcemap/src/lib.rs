//! Source Map v3 codec: Base64-VLQ encoding, a mapping builder with
//! source/generated position queries, upstream map composition, and the
//! `sourceMappingURL` comment convention.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod builder;
mod error;
mod json;
mod mapping;
mod url;
pub mod vlq;

#[doc(inline)]
pub use builder::SourceMapBuilder;
#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use json::{emit, parse};
#[doc(inline)]
pub use mapping::{Mapping, SourcePos, SourceQuery};
#[doc(inline)]
pub use url::emit_source_map_url;
