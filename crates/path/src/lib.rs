//! Path normalization and the compiled glob/regex/predicate [`Matcher`].
//!
//! This is the bottom of the loom stack (component C1): everything else that
//! needs to decide whether a path belongs to a pipeline goes through a
//! [`Matcher`].

#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

pub mod glob;
pub mod matcher;
pub mod path;

#[doc(inline)]
pub use crate::{
	glob::CompiledGlob,
	matcher::{Matcher, Pattern},
	path::{common_dir, common_dir_of, from_logical, host_is_case_insensitive, in_dir, normalize, relative_to, resolve, to_logical},
};
