//! [`SourceMapBuilder`]: an in-memory Source Map v3 document, with the query
//! and composition operations pipeline stages need.

use tracing::trace;

use crate::mapping::{Mapping, SourcePos, SourceQuery};

/// An in-memory Source Map v3 structure.
///
/// Mappings are stored as a sparse two-dimensional array keyed by generated
/// line, each row a column-sorted list of [`Mapping`]s.
#[derive(Clone, Debug, Default)]
pub struct SourceMapBuilder {
	/// The name of the generated file this map describes, if known.
	pub file: Option<String>,
	/// A prefix prepended to every source path on emission.
	pub source_root: Option<String>,
	sources: Vec<String>,
	sources_content: Vec<Option<String>>,
	names: Vec<String>,
	mappings: Vec<Vec<Mapping>>,
}

impl SourceMapBuilder {
	/// An empty builder.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The sources table.
	#[must_use]
	pub fn sources(&self) -> &[String] {
		&self.sources
	}

	/// The per-source embedded content table, parallel to [`Self::sources`].
	#[must_use]
	pub fn sources_content(&self) -> &[Option<String>] {
		&self.sources_content
	}

	/// The names table.
	#[must_use]
	pub fn names(&self) -> &[String] {
		&self.names
	}

	/// The mapping rows, one per generated line.
	#[must_use]
	pub fn mapping_lines(&self) -> &[Vec<Mapping>] {
		&self.mappings
	}

	/// Intern a source path, returning its index.
	pub fn add_source(&mut self, path: impl Into<String>) -> usize {
		let path = path.into();
		if let Some(idx) = self.sources.iter().position(|s| *s == path) {
			return idx;
		}
		self.sources.push(path);
		self.sources_content.push(None);
		self.sources.len() - 1
	}

	/// Intern a name, returning its index.
	pub fn add_name(&mut self, name: impl Into<String>) -> usize {
		let name = name.into();
		if let Some(idx) = self.names.iter().position(|n| *n == name) {
			return idx;
		}
		self.names.push(name);
		self.names.len() - 1
	}

	/// Attach embedded source content for a previously interned source.
	pub fn set_source_content(&mut self, source_index: usize, content: impl Into<String>) {
		if let Some(slot) = self.sources_content.get_mut(source_index) {
			*slot = Some(content.into());
		}
	}

	fn line_mut(&mut self, generated_line: u32) -> &mut Vec<Mapping> {
		let idx = generated_line as usize;
		if self.mappings.len() <= idx {
			self.mappings.resize_with(idx + 1, Vec::new);
		}
		&mut self.mappings[idx]
	}

	/// Insert a mapping, sorted on `generated_column` within its line.
	/// Duplicate columns replace the existing mapping.
	pub fn add_mapping(&mut self, generated_line: u32, mapping: Mapping) {
		let row = self.line_mut(generated_line);
		match row.binary_search_by_key(&mapping.generated_column, |m| m.generated_column) {
			Ok(existing) => row[existing] = mapping,
			Err(insert_at) => row.insert(insert_at, mapping),
		}
	}

	/// Find the greatest mapping on `generated_line` whose column is `<=
	/// generated_column`. If none exists on that line, walk backward to the
	/// last mapped prior line and project (line delta, column =
	/// `generated_column`).
	#[must_use]
	pub fn get_source(&self, generated_line: u32, generated_column: u32) -> Option<SourceQuery> {
		if let Some(row) = self.mappings.get(generated_line as usize) {
			if let Some(mapping) = floor_mapping(row, generated_column) {
				return self.resolve(mapping, generated_column, mapping.generated_column);
			}
		}

		// walk backward to the last mapped prior line
		let mut line = generated_line;
		while line > 0 {
			line -= 1;
			if let Some(row) = self.mappings.get(line as usize) {
				if let Some(mapping) = row.last() {
					let line_delta = generated_line - line;
					return self.resolve_with_line_delta(mapping, line_delta, generated_column);
				}
			}
		}

		None
	}

	fn resolve(&self, mapping: &Mapping, generated_column: u32, mapping_column: u32) -> Option<SourceQuery> {
		let source = mapping.source?;
		let column_delta = generated_column.saturating_sub(mapping_column);
		Some(SourceQuery {
			source: self.sources.get(source.source_index)?.clone(),
			line: source.source_line,
			column: source.source_column + column_delta,
			name: source.name_index.and_then(|i| self.names.get(i)).cloned(),
		})
	}

	fn resolve_with_line_delta(&self, mapping: &Mapping, line_delta: u32, generated_column: u32) -> Option<SourceQuery> {
		let source = mapping.source?;
		Some(SourceQuery {
			source: self.sources.get(source.source_index)?.clone(),
			line: source.source_line + line_delta,
			column: generated_column,
			name: source.name_index.and_then(|i| self.names.get(i)).cloned(),
		})
	}

	/// Scan the mapping table for all points matching `source_path` and
	/// `source_line`, and project to a generated position using the
	/// mapping whose source column span contains `source_column`.
	#[must_use]
	pub fn get_generated(&self, source_path: &str, source_line: u32, source_column: u32) -> Option<(u32, u32)> {
		let source_index = self.sources.iter().position(|s| s == source_path)?;

		let mut best: Option<(u32, u32, u32)> = None; // (generated_line, generated_column, source_column)
		for (line_idx, row) in self.mappings.iter().enumerate() {
			for mapping in row {
				let Some(source) = mapping.source else { continue };
				if source.source_index != source_index || source.source_line != source_line {
					continue;
				}
				if source.source_column > source_column {
					continue;
				}
				let better = match best {
					None => true,
					Some((_, _, prev_col)) => source.source_column > prev_col,
				};
				if better {
					best = Some((line_idx as u32, mapping.generated_column, source.source_column));
				}
			}
		}

		best.map(|(line, col, src_col)| (line, col + (source_column - src_col)))
	}

	/// Rewrite this map's mappings so that any mapping pointing at the
	/// source named `upstream_file_name` instead points through `upstream`
	/// to upstream's own origin. The `upstream_file_name` source is removed
	/// from this map's source list afterward.
	///
	/// A single mapping here can span a column range that, in `upstream`,
	/// crosses more than one of `upstream`'s own mapping boundaries (a
	/// later stage collapsing several original statements into one mapped
	/// region). When that happens, an extra mapping is inserted at each
	/// such boundary's corresponding column, so composition doesn't lose
	/// granularity relative to `upstream`.
	pub fn apply_source_map(&mut self, upstream: &SourceMapBuilder, upstream_file_name: &str) {
		let Some(stage_index) = self.sources.iter().position(|s| s == upstream_file_name) else {
			trace!(upstream_file_name, "apply_source_map: no matching source, skipping");
			return;
		};

		// Resolve every affected mapping first (only reads `self.sources`/`names`
		// through `upstream`, a distinct value), deferring the interning of new
		// sources/names so we never hold a mutable borrow of `self.mappings`
		// alongside a call that needs the rest of `self`.
		let mut resolutions: Vec<(usize, usize, SourceQuery, Vec<(u32, SourceQuery)>)> = Vec::new();
		for (line_idx, row) in self.mappings.iter().enumerate() {
			for (col_idx, mapping) in row.iter().enumerate() {
				let Some(source) = mapping.source else { continue };
				if source.source_index != stage_index {
					continue;
				}
				let Some(resolved) = upstream.get_source(source.source_line, source.source_column) else { continue };

				// This mapping's span, in upstream's source-column space, runs
				// from `source.source_column` up to the next mapping on this
				// row (or is unbounded, if this is the row's last mapping).
				let splits = row.get(col_idx + 1).map_or_else(Vec::new, |next| {
					let span_start = source.source_column;
					let span_end = span_start + next.generated_column.saturating_sub(mapping.generated_column);
					upstream
						.mappings
						.get(source.source_line as usize)
						.into_iter()
						.flatten()
						.filter(|boundary| boundary.generated_column > span_start && boundary.generated_column < span_end)
						.filter_map(|boundary| {
							let offset = mapping.generated_column + (boundary.generated_column - span_start);
							upstream.resolve(boundary, boundary.generated_column, boundary.generated_column).map(|query| (offset, query))
						})
						.collect()
				});

				resolutions.push((line_idx, col_idx, resolved, splits));
			}
		}

		// Processed in reverse so a row's later columns (and the splits they
		// insert) are handled before earlier ones, keeping each `col_idx`
		// collected above valid at the point it's used: every split's offset
		// is strictly greater than its own mapping's column, so it can only
		// ever shift indices to the right of positions already visited.
		for (line_idx, col_idx, resolved, splits) in resolutions.into_iter().rev() {
			let new_index = self.add_source(resolved.source);
			let name_index = resolved.name.map(|n| self.add_name(n));
			let mapping = &mut self.mappings[line_idx][col_idx];
			let old_name_index = mapping.source.and_then(|s| s.name_index);
			mapping.source = Some(SourcePos {
				source_index: new_index,
				source_line: resolved.line,
				source_column: resolved.column,
				name_index: name_index.or(old_name_index),
			});

			for (offset, query) in splits {
				let split_index = self.add_source(query.source);
				let split_name_index = query.name.map(|n| self.add_name(n));
				self.add_mapping(
					line_idx as u32,
					Mapping::mapped(offset, SourcePos { source_index: split_index, source_line: query.line, source_column: query.column, name_index: split_name_index }),
				);
			}
		}

		self.remove_source(stage_index);
	}

	fn remove_source(&mut self, index: usize) {
		self.sources.remove(index);
		self.sources_content.remove(index);
		for row in &mut self.mappings {
			row.retain_mut(|mapping| {
				let Some(source) = mapping.source.as_mut() else { return true };
				match source.source_index.cmp(&index) {
					std::cmp::Ordering::Equal => false,
					std::cmp::Ordering::Greater => {
						source.source_index -= 1;
						true
					}
					std::cmp::Ordering::Less => true,
				}
			});
		}
	}

	/// Fill missing rows by propagating the previous line's trailing
	/// mapping one logical line downward.
	pub fn compute_lines(&mut self) {
		let mut carry: Option<Mapping> = None;
		for row in &mut self.mappings {
			if row.is_empty() {
				if let Some(m) = carry {
					row.push(Mapping { generated_column: 0, source: m.source });
				}
			} else {
				carry = row.last().copied();
			}
		}
	}
}

fn floor_mapping(row: &[Mapping], generated_column: u32) -> Option<&Mapping> {
	match row.binary_search_by_key(&generated_column, |m| m.generated_column) {
		Ok(idx) => Some(&row[idx]),
		Err(0) => None,
		Err(idx) => Some(&row[idx - 1]),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_mapping_is_sorted_and_dedups_columns() {
		let mut b = SourceMapBuilder::new();
		let s = b.add_source("a.ts");
		b.add_mapping(0, Mapping::mapped(5, SourcePos { source_index: s, source_line: 0, source_column: 0, name_index: None }));
		b.add_mapping(0, Mapping::mapped(1, SourcePos { source_index: s, source_line: 0, source_column: 10, name_index: None }));
		b.add_mapping(0, Mapping::mapped(5, SourcePos { source_index: s, source_line: 0, source_column: 20, name_index: None }));

		let row = &b.mapping_lines()[0];
		assert_eq!(row.len(), 2);
		assert_eq!(row[0].generated_column, 1);
		assert_eq!(row[1].generated_column, 5);
		assert_eq!(row[1].source.unwrap().source_column, 20);
	}

	#[test]
	fn get_source_floor_lookup() {
		let mut b = SourceMapBuilder::new();
		let s = b.add_source("a.ts");
		b.add_mapping(0, Mapping::mapped(0, SourcePos { source_index: s, source_line: 0, source_column: 0, name_index: None }));
		b.add_mapping(0, Mapping::mapped(10, SourcePos { source_index: s, source_line: 0, source_column: 100, name_index: None }));

		let q = b.get_source(0, 12).unwrap();
		assert_eq!(q.source, "a.ts");
		assert_eq!(q.column, 102);
	}

	#[test]
	fn get_source_projects_from_prior_line() {
		let mut b = SourceMapBuilder::new();
		let s = b.add_source("a.ts");
		b.add_mapping(0, Mapping::mapped(0, SourcePos { source_index: s, source_line: 0, source_column: 0, name_index: None }));

		let q = b.get_source(2, 5).unwrap();
		assert_eq!(q.line, 2);
		assert_eq!(q.column, 5);
	}

	#[test]
	fn get_generated_round_trip() {
		let mut b = SourceMapBuilder::new();
		let s = b.add_source("a.ts");
		b.add_mapping(3, Mapping::mapped(7, SourcePos { source_index: s, source_line: 1, source_column: 2, name_index: None }));

		let (line, col) = b.get_generated("a.ts", 1, 2).unwrap();
		assert_eq!((line, col), (3, 7));
	}

	#[test]
	fn apply_source_map_composes_two_stages() {
		// stage1: origin.ts -> intermediate.js at (1,1) <-> (101,99)
		let mut stage1 = SourceMapBuilder::new();
		let origin = stage1.add_source("origin.ts");
		stage1.add_mapping(101, Mapping::mapped(99, SourcePos { source_index: origin, source_line: 1, source_column: 1, name_index: None }));

		// stage2: intermediate.js -> out.js at (101,101) <-> (201,202), named "x"
		let mut stage2 = SourceMapBuilder::new();
		let intermediate = stage2.add_source("intermediate.js");
		let name = stage2.add_name("x");
		stage2.add_mapping(
			201,
			Mapping::mapped(202, SourcePos { source_index: intermediate, source_line: 101, source_column: 101, name_index: Some(name) }),
		);

		stage2.apply_source_map(&stage1, "intermediate.js");

		assert!(!stage2.sources().contains(&"intermediate.js".to_owned()));
		let q = stage2.get_source(201, 202).unwrap();
		assert_eq!(q.source, "origin.ts");
		assert_eq!(q.name.as_deref(), Some("x"));
	}

	#[test]
	fn apply_source_map_splits_a_span_covering_multiple_upstream_mappings() {
		// stage1: two separate statements in origin.ts both land on
		// intermediate.js's line 101, at columns 0 and 10.
		let mut stage1 = SourceMapBuilder::new();
		let origin = stage1.add_source("origin.ts");
		stage1.add_mapping(101, Mapping::mapped(0, SourcePos { source_index: origin, source_line: 1, source_column: 0, name_index: None }));
		stage1.add_mapping(101, Mapping::mapped(10, SourcePos { source_index: origin, source_line: 2, source_column: 0, name_index: None }));

		// stage2 (a minifier) collapses both statements into a single
		// mapped region starting at out.js column 5, with nothing else on
		// the row to bound it until the next mapping at column 50.
		let mut stage2 = SourceMapBuilder::new();
		let intermediate = stage2.add_source("intermediate.js");
		stage2.add_mapping(0, Mapping::mapped(5, SourcePos { source_index: intermediate, source_line: 101, source_column: 0, name_index: None }));
		stage2.add_mapping(0, Mapping::mapped(50, SourcePos { source_index: intermediate, source_line: 101, source_column: 0, name_index: None }));

		stage2.apply_source_map(&stage1, "intermediate.js");

		let row = &stage2.mapping_lines()[0];
		// the original mapping at column 5, plus a new one inserted at the
		// column offset corresponding to the second statement's boundary
		// (column 5 + (10 - 0) == 15), plus the untouched mapping at 50.
		assert_eq!(row.len(), 3);
		assert_eq!(row[0].generated_column, 5);
		assert_eq!(stage2.sources()[row[0].source.unwrap().source_index], "origin.ts");
		assert_eq!(row[0].source.unwrap().source_line, 1);

		assert_eq!(row[1].generated_column, 15);
		assert_eq!(stage2.sources()[row[1].source.unwrap().source_index], "origin.ts");
		assert_eq!(row[1].source.unwrap().source_line, 2);

		assert_eq!(row[2].generated_column, 50);
	}

	#[test]
	fn compute_lines_propagates_previous_mapping() {
		let mut b = SourceMapBuilder::new();
		let s = b.add_source("a.ts");
		b.add_mapping(0, Mapping::mapped(0, SourcePos { source_index: s, source_line: 0, source_column: 0, name_index: None }));
		// force an empty line 1 to exist
		b.line_mut(1);
		b.compute_lines();
		assert_eq!(b.mapping_lines()[1][0].generated_column, 0);
	}
}
