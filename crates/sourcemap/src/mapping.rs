//! A single mapping point within a generated line.

/// Where a generated position came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourcePos {
	/// Index into the map's `sources` table.
	pub source_index: usize,
	/// Zero-based line in the source.
	pub source_line: u32,
	/// Zero-based column in the source.
	pub source_column: u32,
	/// Index into the map's `names` table, if this mapping carries a name.
	pub name_index: Option<usize>,
}

/// One mapping point on a generated line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
	/// Zero-based column on the generated line this mapping starts at.
	pub generated_column: u32,
	/// The originating source position, absent for "unmapped" segments.
	pub source: Option<SourcePos>,
}

impl Mapping {
	/// Construct a mapping with no originating source (a pure generated-only
	/// segment).
	#[must_use]
	pub const fn unmapped(generated_column: u32) -> Self {
		Self { generated_column, source: None }
	}

	/// Construct a fully-specified mapping.
	#[must_use]
	pub const fn mapped(generated_column: u32, source: SourcePos) -> Self {
		Self { generated_column, source: Some(source) }
	}
}

/// The result of a [`super::SourceMapBuilder::get_source`] query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceQuery {
	/// The resolved source path.
	pub source: String,
	/// The resolved line in that source.
	pub line: u32,
	/// The resolved column in that source.
	pub column: u32,
	/// The resolved name, if any.
	pub name: Option<String>,
}
