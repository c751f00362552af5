//! Parsing and emitting the Source Map v3 JSON document shape.
//!
//! The `mappings` field is a sequence of `;`-separated lines, each a
//! `,`-separated sequence of segments, each segment a run of Base64-VLQ
//! fields. Per the standard, `generatedColumn` resets to zero at the start of
//! every line, while `sourceIndex`, `sourceLine`, `sourceColumn` and
//! `nameIndex` are deltas that persist across the whole document.

use serde::{Deserialize, Serialize};

use crate::builder::SourceMapBuilder;
use crate::error::Error;
use crate::mapping::{Mapping, SourcePos};
use crate::vlq;

#[derive(Serialize, Deserialize)]
struct RawDocument {
	version: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none", rename = "sourceRoot")]
	source_root: Option<String>,
	sources: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", rename = "sourcesContent")]
	sources_content: Option<Vec<Option<String>>>,
	#[serde(default)]
	names: Vec<String>,
	mappings: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	sections: Option<serde_json::Value>,
}

/// Parse a Source Map v3 JSON document.
///
/// # Errors
/// Returns an error if the document is malformed, declares a version other
/// than `3`, uses the indexed ("sections") format, or its `mappings` field
/// contains an invalid Base64-VLQ segment or an out-of-range table index.
pub fn parse(json: &str) -> Result<SourceMapBuilder, Error> {
	let raw: RawDocument = serde_json::from_str(json)?;

	if raw.sections.is_some() {
		return Err(Error::IndexedMapUnsupported);
	}
	if raw.version != 3 {
		return Err(Error::UnsupportedVersion(raw.version));
	}

	let mut builder = SourceMapBuilder::new();
	builder.file = raw.file;
	builder.source_root = raw.source_root;

	for source in raw.sources {
		builder.add_source(source);
	}
	for name in raw.names {
		builder.add_name(name);
	}
	if let Some(contents) = raw.sources_content {
		for (index, content) in contents.into_iter().enumerate() {
			if let Some(content) = content {
				builder.set_source_content(index, content);
			}
		}
	}

	decode_mappings(&raw.mappings, &mut builder)?;

	Ok(builder)
}

fn decode_mappings(mappings: &str, builder: &mut SourceMapBuilder) -> Result<(), Error> {
	let source_count = builder.sources().len();
	let name_count = builder.names().len();

	let mut source_index = 0i64;
	let mut source_line = 0i64;
	let mut source_column = 0i64;
	let mut name_index = 0i64;

	for (line_number, line) in mappings.split(';').enumerate() {
		let mut generated_column = 0i64;
		if line.is_empty() {
			continue;
		}
		for segment in line.split(',') {
			if segment.is_empty() {
				continue;
			}
			let mut rest = segment;
			let (col_delta, consumed) = vlq::decode(rest)?;
			generated_column += col_delta;
			rest = &rest[consumed..];

			if rest.is_empty() {
				builder.add_mapping(line_number as u32, Mapping::unmapped(checked_u32(generated_column)?));
				continue;
			}

			let (src_delta, consumed) = vlq::decode(rest)?;
			source_index += src_delta;
			rest = &rest[consumed..];

			let (line_delta, consumed) = vlq::decode(rest)?;
			source_line += line_delta;
			rest = &rest[consumed..];

			let (col_delta, consumed) = vlq::decode(rest)?;
			source_column += col_delta;
			rest = &rest[consumed..];

			let resolved_source_index = checked_index(source_index, source_count)?;
			let resolved_source_line = checked_u32(source_line)?;
			let resolved_source_column = checked_u32(source_column)?;

			let resolved_name_index = if rest.is_empty() {
				None
			} else {
				let (delta, _) = vlq::decode(rest)?;
				name_index += delta;
				Some(checked_index(name_index, name_count)?)
			};

			builder.add_mapping(
				line_number as u32,
				Mapping::mapped(
					checked_u32(generated_column)?,
					SourcePos {
						source_index: resolved_source_index,
						source_line: resolved_source_line,
						source_column: resolved_source_column,
						name_index: resolved_name_index,
					},
				),
			);
		}
	}

	Ok(())
}

fn checked_u32(value: i64) -> Result<u32, Error> {
	u32::try_from(value).map_err(|_| Error::InvalidVlq)
}

fn checked_index(value: i64, len: usize) -> Result<usize, Error> {
	let index = usize::try_from(value).map_err(|_| Error::InvalidVlq)?;
	if index >= len {
		return Err(Error::IndexOutOfRange { index, len });
	}
	Ok(index)
}

/// Serialize a [`SourceMapBuilder`] to a Source Map v3 JSON document.
///
/// # Errors
/// Returns an error if JSON serialization fails (this should not happen for
/// well-formed builders).
pub fn emit(builder: &SourceMapBuilder) -> Result<String, Error> {
	let raw = RawDocument {
		version: 3,
		file: builder.file.clone(),
		source_root: builder.source_root.clone(),
		sources: builder.sources().to_vec(),
		sources_content: has_any_content(builder.sources_content()).then(|| builder.sources_content().to_vec()),
		names: builder.names().to_vec(),
		mappings: encode_mappings(builder),
		sections: None,
	};
	Ok(serde_json::to_string(&raw)?)
}

fn has_any_content(contents: &[Option<String>]) -> bool {
	contents.iter().any(Option::is_some)
}

fn encode_mappings(builder: &SourceMapBuilder) -> String {
	let mut out = String::new();
	let mut source_index = 0i64;
	let mut source_line = 0i64;
	let mut source_column = 0i64;
	let mut name_index = 0i64;

	for (line_number, row) in builder.mapping_lines().iter().enumerate() {
		if line_number > 0 {
			out.push(';');
		}
		let mut generated_column = 0i64;
		for (segment_number, mapping) in row.iter().enumerate() {
			if segment_number > 0 {
				out.push(',');
			}
			let column_delta = i64::from(mapping.generated_column) - generated_column;
			generated_column = i64::from(mapping.generated_column);
			out.push_str(&vlq::encode(column_delta));

			if let Some(source) = mapping.source {
				let si_delta = source.source_index as i64 - source_index;
				source_index = source.source_index as i64;
				let sl_delta = i64::from(source.source_line) - source_line;
				source_line = i64::from(source.source_line);
				let sc_delta = i64::from(source.source_column) - source_column;
				source_column = i64::from(source.source_column);
				out.push_str(&vlq::encode(si_delta));
				out.push_str(&vlq::encode(sl_delta));
				out.push_str(&vlq::encode(sc_delta));

				if let Some(idx) = source.name_index {
					let ni_delta = idx as i64 - name_index;
					name_index = idx as i64;
					out.push_str(&vlq::encode(ni_delta));
				}
			}
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_non_v3() {
		let err = parse(r#"{"version":2,"sources":[],"names":[],"mappings":""}"#).unwrap_err();
		assert!(matches!(err, Error::UnsupportedVersion(2)));
	}

	#[test]
	fn rejects_indexed_maps() {
		let err = parse(r#"{"version":3,"sources":[],"names":[],"mappings":"","sections":[]}"#).unwrap_err();
		assert!(matches!(err, Error::IndexedMapUnsupported));
	}

	#[test]
	fn round_trips_through_json() {
		let mut builder = SourceMapBuilder::new();
		let s = builder.add_source("a.ts");
		let n = builder.add_name("foo");
		builder.add_mapping(0, Mapping::mapped(0, SourcePos { source_index: s, source_line: 0, source_column: 0, name_index: Some(n) }));
		builder.add_mapping(0, Mapping::mapped(4, SourcePos { source_index: s, source_line: 0, source_column: 10, name_index: None }));
		builder.add_mapping(1, Mapping::unmapped(0));

		let json = emit(&builder).unwrap();
		let parsed = parse(&json).unwrap();

		assert_eq!(parsed.sources(), builder.sources());
		assert_eq!(parsed.names(), builder.names());
		assert_eq!(parsed.mapping_lines().len(), builder.mapping_lines().len());
		assert_eq!(parsed.mapping_lines()[0], builder.mapping_lines()[0]);
	}

	#[test]
	fn empty_lines_produce_no_segments() {
		let mut builder = SourceMapBuilder::new();
		builder.add_mapping(2, Mapping::unmapped(0));
		let json = emit(&builder).unwrap();
		assert!(json.contains(r#""mappings":";;A""#));
	}
}
