use crate::encoding::Encoding;

/// A buffer/text pair, each lazily derived from the other on first access.
#[derive(Clone, Debug, Default)]
pub(crate) struct Slot {
	buffer: Option<Vec<u8>>,
	text: Option<String>,
}

impl Slot {
	pub(crate) fn is_empty(&self) -> bool {
		self.buffer.is_none() && self.text.is_none()
	}

	pub(crate) fn set_buffer(&mut self, buffer: Vec<u8>) {
		self.buffer = Some(buffer);
		self.text = None;
	}

	pub(crate) fn set_text(&mut self, text: String) {
		self.text = Some(text);
		self.buffer = None;
	}

	pub(crate) fn buffer(&mut self, encoding: Encoding) -> &[u8] {
		if self.buffer.is_none() {
			let encoded = self.text.as_deref().map(|t| encoding.encode(t)).unwrap_or_default();
			self.buffer = Some(encoded);
		}
		self.buffer.as_deref().unwrap_or(&[])
	}

	pub(crate) fn text(&mut self, encoding: Encoding) -> &str {
		if self.text.is_none() {
			let decoded = self.buffer.as_deref().map(|b| encoding.decode(b)).unwrap_or_default();
			self.text = Some(decoded);
		}
		self.text.as_deref().unwrap_or("")
	}
}
