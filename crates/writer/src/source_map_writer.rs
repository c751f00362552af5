//! The source-map-aware writer: inserts mappings at fragment boundaries and
//! character-class transitions, and can splice in a fragment's own map.

use loom_sourcemap::{Mapping, SourceMapBuilder, SourcePos};

use crate::writer::Writer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CharClass {
	Identifier,
	Whitespace,
	Punctuation,
}

fn classify(ch: char) -> CharClass {
	if ch.is_alphanumeric() || ch == '_' {
		CharClass::Identifier
	} else if ch.is_whitespace() {
		CharClass::Whitespace
	} else {
		CharClass::Punctuation
	}
}

/// Where a fragment being written came from, for mapping purposes.
#[derive(Clone, Copy, Debug)]
pub struct FragmentSource {
	/// Index into the writer's source-map source table.
	pub source_index: usize,
	/// The fragment's starting line in that source.
	pub line: u32,
	/// The fragment's starting column in that source.
	pub column: u32,
}

/// Concatenates fragments into one output while building a Source Map v3
/// document describing where each generated position came from.
#[derive(Debug, Default)]
pub struct SourceMapWriter {
	inner: Writer,
	map: SourceMapBuilder,
	/// When set, a mapping is inserted only at the first column of each
	/// generated line rather than at every character-class transition.
	pub line_mappings_only: bool,
}

impl SourceMapWriter {
	/// A writer with no indent and an empty map.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// A writer that inserts `indent` after every newline it emits.
	#[must_use]
	pub fn with_indent(indent: impl Into<String>) -> Self {
		Self { inner: Writer::with_indent(indent), ..Self::default() }
	}

	/// Intern a source path for later [`FragmentSource`] references.
	pub fn add_source(&mut self, path: impl Into<String>) -> usize {
		self.map.add_source(path)
	}

	/// The current generated position.
	#[must_use]
	pub fn position(&self) -> crate::writer::Position {
		self.inner.position()
	}

	/// Append `content`, optionally tracking its origin. A mapping is
	/// inserted at the fragment's first character and at every transition
	/// between identifier/whitespace/punctuation runs (unless
	/// [`Self::line_mappings_only`]), mirroring the source cursor alongside
	/// the generated one under the assumption the fragment is emitted
	/// unmodified (no token reordering within it).
	pub fn write(&mut self, content: &str, source: Option<FragmentSource>) {
		let mut prev_class = None;
		let mut src_line = source.map_or(0, |s| s.line);
		let mut src_col = source.map_or(0, |s| s.column);
		let mut first = true;

		for ch in content.chars() {
			let class = classify(ch);
			let at_line_start = self.inner.position().column == 0;
			let boundary = if self.line_mappings_only {
				first || at_line_start
			} else {
				first || prev_class != Some(class)
			};

			if let Some(src) = source {
				if boundary {
					let position = self.inner.position();
					self.map.add_mapping(
						position.line,
						Mapping::mapped(position.column, SourcePos { source_index: src.source_index, source_line: src_line, source_column: src_col, name_index: None }),
					);
				}
			}

			self.inner.advance(ch);
			match ch {
				'\n' => {
					src_line += 1;
					src_col = 0;
				}
				'\r' => {}
				_ => src_col += 1,
			}
			prev_class = Some(class);
			first = false;
		}
	}

	/// Append a fragment that already carries its own source map, splicing
	/// its mappings into this writer's map rather than re-deriving them
	/// character by character. Mappings on the fragment's first line before
	/// `fragment_start_column`, and on its last line at or beyond
	/// `fragment_end_column`, are outside the slice being written and are
	/// dropped.
	pub fn write_with_map(&mut self, content: &str, fragment_map: &SourceMapBuilder, fragment_start_column: u32, fragment_end_column: u32) {
		let base_position = self.inner.position();
		let fragment_line_count = content.matches('\n').count() as u32;

		for (source_index, source) in fragment_map.sources().iter().enumerate() {
			let resolved_index = self.map.add_source(source.clone());
			if let Some(source_content) = fragment_map.sources_content().get(source_index).cloned().flatten() {
				self.map.set_source_content(resolved_index, source_content);
			}
		}

		for (line_idx, row) in fragment_map.mapping_lines().iter().enumerate() {
			let line_idx = line_idx as u32;
			if line_idx == 0 && row.iter().all(|m| m.generated_column < fragment_start_column) {
				continue;
			}
			if line_idx == fragment_line_count && row.iter().all(|m| m.generated_column >= fragment_end_column) {
				continue;
			}

			for mapping in row {
				if line_idx == 0 && mapping.generated_column < fragment_start_column {
					continue;
				}
				if line_idx == fragment_line_count && mapping.generated_column >= fragment_end_column {
					continue;
				}

				let column_in_output = if line_idx == 0 { base_position.column + (mapping.generated_column - fragment_start_column) } else { mapping.generated_column };
				let generated_line = base_position.line + line_idx;

				let Some(source) = mapping.source else { continue };
				let source_index = self.map.add_source(fragment_map.sources()[source.source_index].clone());
				self.map.add_mapping(
					generated_line,
					Mapping::mapped(column_in_output, SourcePos { source_index, source_line: source.source_line, source_column: source.source_column, name_index: None }),
				);
			}
		}

		self.inner.write(content);
	}

	/// Consume the writer, returning the accumulated text and its map.
	#[must_use]
	pub fn end(self) -> (String, SourceMapBuilder) {
		(self.inner.end(), self.map)
	}

	/// Consume the writer, assigning the accumulated text and map directly
	/// to the file this writer was building output for.
	pub fn end_into_file(self, file: &mut loom_file::File) {
		let (text, map) = self.end();
		file.set_content(text);
		file.set_source_map(map, "");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn maps_two_concatenated_fragments() {
		let mut w = SourceMapWriter::new();
		let a = w.add_source("a.js");
		let b = w.add_source("b.js");

		w.write("X", Some(FragmentSource { source_index: a, line: 0, column: 0 }));
		w.write("\n", None);
		w.write("Y", Some(FragmentSource { source_index: b, line: 0, column: 0 }));

		let (text, map) = w.end();
		assert_eq!(text, "X\nY");

		let q0 = map.get_source(0, 0).unwrap();
		assert_eq!(q0.source, "a.js");
		let q1 = map.get_source(1, 0).unwrap();
		assert_eq!(q1.source, "b.js");
	}

	#[test]
	fn inserts_mapping_at_identifier_whitespace_transition() {
		let mut w = SourceMapWriter::new();
		let a = w.add_source("a.js");
		w.write("foo bar", Some(FragmentSource { source_index: a, line: 0, column: 0 }));
		let (_, map) = w.end();
		// boundaries at col 0 (fragment start), col 3 (space), col 4 (bar start)
		assert_eq!(map.mapping_lines()[0].len(), 3);
	}
}
