use thiserror::Error;

/// Errors produced while parsing, querying, or composing source maps.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// A Base64-VLQ segment could not be decoded.
	#[error("invalid Base64-VLQ segment")]
	InvalidVlq,

	/// The document's `version` field was not `3`.
	#[error("unsupported source map version: {0}")]
	UnsupportedVersion(u32),

	/// The document used the indexed ("sections") map format, which this
	/// codec deliberately does not support.
	#[error("indexed (sections) source maps are not supported")]
	IndexedMapUnsupported,

	/// A mapping segment referenced a source or name index out of range.
	#[error("mapping referenced out-of-range index {index} (len {len})")]
	IndexOutOfRange {
		/// The offending index.
		index: usize,
		/// The length of the table it was supposed to index into.
		len: usize,
	},

	/// The JSON document was malformed.
	#[error("malformed source map JSON: {0}")]
	Json(#[from] serde_json::Error),
}
