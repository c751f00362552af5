//! Buffer/text conversion for a file's content.

/// The text encoding a file's buffer is decoded through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
	/// UTF-8, the default for every file unless overridden.
	Utf8,
	/// UTF-16, little-endian. Only ever assigned by [`sniff_subprocess_output`];
	/// never the default for a file loaded from disk.
	Utf16Le,
}

impl Default for Encoding {
	fn default() -> Self {
		Self::Utf8
	}
}

impl Encoding {
	/// Decode bytes to text under this encoding, replacing malformed
	/// sequences rather than failing.
	#[must_use]
	pub fn decode(self, bytes: &[u8]) -> String {
		match self {
			Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
			Self::Utf16Le => {
				let (text, _, _) = encoding_rs::UTF_16LE.decode(bytes);
				text.into_owned()
			}
		}
	}

	/// Encode text to bytes under this encoding.
	#[must_use]
	pub fn encode(self, text: &str) -> Vec<u8> {
		match self {
			Self::Utf8 => text.as_bytes().to_vec(),
			Self::Utf16Le => {
				let (bytes, _, _) = encoding_rs::UTF_16LE.encode(text);
				bytes.into_owned()
			}
		}
	}
}

/// Guess whether raw subprocess output is UTF-16LE: any zero byte at an odd
/// offset is taken as evidence of two-byte little-endian code units. Only
/// meant for decoding a subprocess's stdout/stderr; files read from disk
/// always default to [`Encoding::Utf8`] (or whatever the caller configured).
#[must_use]
pub fn sniff_subprocess_output(bytes: &[u8]) -> Encoding {
	if bytes.iter().enumerate().any(|(i, &b)| b == 0 && i % 2 == 1) {
		Encoding::Utf16Le
	} else {
		Encoding::Utf8
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sniffs_utf16le_from_zero_high_bytes() {
		let bytes: Vec<u8> = "hi".encode_utf16().flat_map(u16::to_le_bytes).collect();
		assert_eq!(sniff_subprocess_output(&bytes), Encoding::Utf16Le);
	}

	#[test]
	fn plain_ascii_is_utf8() {
		assert_eq!(sniff_subprocess_output(b"hello"), Encoding::Utf8);
	}

	#[test]
	fn round_trips_utf16le() {
		let text = "héllo";
		let bytes = Encoding::Utf16Le.encode(text);
		assert_eq!(Encoding::Utf16Le.decode(&bytes), text);
	}
}
