//! Per-file diagnostics: one structured record per `log`/`error`/`warning`/
//! `verbose` call, classified rather than pre-formatted into a string.

use std::path::PathBuf;

/// How serious a [`Diagnostic`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	/// Aborts nothing by itself, but counts toward the run's error total.
	Error,
	/// Counts toward the run's warning total.
	Warning,
	/// Shown only when verbose reporting is requested.
	Verbose,
	/// A plain informational message.
	Log,
}

/// A line/column span within a file's text, used to locate a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
	/// Zero-based starting line.
	pub start_line: u32,
	/// Zero-based starting column.
	pub start_column: u32,
	/// Zero-based ending line.
	pub end_line: u32,
	/// Zero-based ending column.
	pub end_column: u32,
}

/// One diagnostic entry attached to a file.
#[derive(Clone, Debug)]
pub struct Diagnostic {
	/// How serious this entry is.
	pub severity: Severity,
	/// The message template, e.g. `"unexpected token {0}"`.
	pub message: String,
	/// Positional arguments substituted into `message` by a reporting sink;
	/// the core does not interpolate these itself.
	pub args: Vec<String>,
	/// The file this diagnostic is reported against. Starts as the file it
	/// was raised on; may be rewritten to point at an upstream source if a
	/// source map remaps it.
	pub file: PathBuf,
	/// Where in `file` this diagnostic applies, if known.
	pub region: Option<Region>,
	/// A snippet of source text surrounding `region`, if captured.
	pub snippet: Option<String>,
	/// A rendering of the underlying error, if this diagnostic wraps one.
	pub error: Option<String>,
	/// Whether a reporting sink should print a stack trace for this entry.
	pub print_stack: bool,
}

impl Diagnostic {
	/// Construct a bare diagnostic with no region, snippet, or error.
	#[must_use]
	pub fn new(severity: Severity, message: impl Into<String>, file: PathBuf) -> Self {
		Self { severity, message: message.into(), args: Vec::new(), file, region: None, snippet: None, error: None, print_stack: false }
	}

	/// Attach positional arguments.
	#[must_use]
	pub fn with_args(mut self, args: Vec<String>) -> Self {
		self.args = args;
		self
	}

	/// Attach a region.
	#[must_use]
	pub fn with_region(mut self, region: Region) -> Self {
		self.region = Some(region);
		self
	}

	/// Attach a source snippet.
	#[must_use]
	pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
		self.snippet = Some(snippet.into());
		self
	}

	/// Attach an underlying error rendering and request a stack trace.
	#[must_use]
	pub fn with_error(mut self, error: impl Into<String>) -> Self {
		self.error = Some(error.into());
		self.print_stack = true;
		self
	}
}
