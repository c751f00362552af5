//! Append-only text writers: a plain line/column tracker and a
//! source-map-aware variant that keeps fragment provenance as it
//! concatenates.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod source_map_writer;
mod writer;

#[doc(inline)]
pub use source_map_writer::{FragmentSource, SourceMapWriter};
#[doc(inline)]
pub use writer::{Position, Writer};
