use std::path::{Path, PathBuf};

use tracing::trace;

use loom_sourcemap::SourceMapBuilder;

use crate::diagnostic::{Diagnostic, Region, Severity};
use crate::encoding::Encoding;
use crate::mode::BuildMode;
use crate::slot::Slot;

const GENERATED_SRC_PATH: &str = "<generated>";

/// Outcome of a [`File::save`] call, for the runner's aggregated counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
	/// Content was (or, in preview mode, would have been) written.
	Written,
	/// Destination already matched source content; nothing written.
	Skipped,
	/// The file's on-disk counterpart was deleted (clean mode).
	Deleted,
	/// Save was refused (e.g. overwrite not permitted) and logged as an error.
	Refused,
}

/// Options controlling [`File::save`], threaded through from the active
/// task's configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveOptions {
	/// The active build mode.
	pub mode: Option<BuildMode>,
	/// Whether writing back onto the source path is permitted.
	pub overwrite: bool,
	/// Retry budget passed through to the filesystem facade.
	pub try_count: u32,
	/// Whether a source map, if present, should be emitted as a sidecar
	/// `.map` file (or inlined; see [`SaveOptions::source_map_inline`]).
	pub source_map_emit: bool,
	/// Whether the source map should be inlined as a data URI rather than
	/// written as a sidecar file.
	pub source_map_inline: bool,
}

/// An in-memory record of one logical artifact flowing through a pipeline.
#[derive(Clone, Debug)]
pub struct File {
	initial_path: Option<PathBuf>,
	base: PathBuf,
	name: Option<String>,
	encoding: Encoding,
	source: Slot,
	target: Option<Slot>,
	source_map: Option<SourceMapBuilder>,
	diagnostics: Vec<Diagnostic>,
	error_count: usize,
	warning_count: usize,
	deps: Vec<PathBuf>,
	refs: Vec<PathBuf>,
	line_starts: Option<Vec<usize>>,
	deleted: bool,
}

impl File {
	/// A file discovered on disk: `initial_path` is its absolute location,
	/// `base` the directory its logical `name` is relative to.
	#[must_use]
	pub fn from_disk(initial_path: PathBuf, base: PathBuf, name: String) -> Self {
		Self {
			initial_path: Some(initial_path),
			base,
			name: Some(name),
			encoding: Encoding::default(),
			source: Slot::default(),
			target: None,
			source_map: None,
			diagnostics: Vec::new(),
			error_count: 0,
			warning_count: 0,
			deps: Vec::new(),
			refs: Vec::new(),
			line_starts: None,
			deleted: false,
		}
	}

	/// A file with no backing disk path, emitted by a processor.
	#[must_use]
	pub fn generated(base: PathBuf, name: impl Into<String>, content: impl Into<String>) -> Self {
		let mut file = Self {
			initial_path: None,
			base,
			name: Some(name.into()),
			encoding: Encoding::default(),
			source: Slot::default(),
			target: None,
			source_map: None,
			diagnostics: Vec::new(),
			error_count: 0,
			warning_count: 0,
			deps: Vec::new(),
			refs: Vec::new(),
			line_starts: None,
			deleted: false,
		};
		file.set_content(content.into());
		file
	}

	/// The absolute path this file was read from, as a display string, or
	/// `"<generated>"` if it has none.
	#[must_use]
	pub fn src_path(&self) -> String {
		self.initial_path.as_ref().map_or_else(|| GENERATED_SRC_PATH.to_owned(), |p| p.display().to_string())
	}

	/// Whether this file has no backing disk path.
	#[must_use]
	pub const fn is_generated(&self) -> bool {
		self.initial_path.is_none()
	}

	/// Mark this file as standing in for a source that has vanished from
	/// disk (a watcher rebuild re-admitting a deleted path), rather than one
	/// that was freshly discovered or regenerated.
	pub fn mark_deleted(&mut self) {
		self.deleted = true;
	}

	/// Whether this file represents a source that has been deleted, as
	/// opposed to a normal admission.
	#[must_use]
	pub const fn is_deleted(&self) -> bool {
		self.deleted
	}

	/// The base directory anchoring `name`.
	#[must_use]
	pub fn base(&self) -> &Path {
		&self.base
	}

	/// Set the base directory; recomputes `path` on next access.
	pub fn set_base(&mut self, base: PathBuf) {
		self.base = base;
	}

	/// The logical name (forward-slash separated) relative to `base`.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Set the logical name; recomputes `path` on next access.
	pub fn set_name(&mut self, name: impl Into<String>) {
		self.name = Some(name.into());
	}

	/// The file's directory, as a logical name.
	#[must_use]
	pub fn dir(&self) -> Option<String> {
		self.name.as_deref().map(|n| match n.rsplit_once('/') {
			Some((dir, _)) => dir.to_owned(),
			None => String::new(),
		})
	}

	/// Set the file's directory, keeping its basename.
	pub fn set_dir(&mut self, dir: &str) {
		if let Some(name) = &self.name {
			let basename = name.rsplit_once('/').map_or(name.as_str(), |(_, b)| b);
			self.name = Some(if dir.is_empty() { basename.to_owned() } else { format!("{dir}/{basename}") });
		}
	}

	/// The file's extension (without the leading dot), if any.
	#[must_use]
	pub fn ext(&self) -> Option<&str> {
		self.name.as_deref().and_then(|n| n.rsplit_once('.').map(|(_, ext)| ext))
	}

	/// `base` joined with `name`, using host path separators.
	#[must_use]
	pub fn path(&self) -> Option<PathBuf> {
		self.name.as_deref().map(|n| self.base.join(loom_path::from_logical(n)))
	}

	/// The path content would be written to: `path()`, or `src_path()` if
	/// unset (a name-less generated file, which shouldn't normally happen
	/// past construction, but is handled rather than panicking).
	#[must_use]
	pub fn dest_path(&self) -> PathBuf {
		self.path().unwrap_or_else(|| PathBuf::from(self.src_path()))
	}

	/// Whether the target slot has been written (by content/buffer
	/// assignment).
	#[must_use]
	pub const fn modified(&self) -> bool {
		self.target.is_some()
	}

	/// The file's current text encoding.
	#[must_use]
	pub const fn encoding(&self) -> Encoding {
		self.encoding
	}

	/// Override the file's text encoding. Does not re-decode already-cached
	/// buffer/text forms.
	pub fn set_encoding(&mut self, encoding: Encoding) {
		self.encoding = encoding;
	}

	fn active_slot_mut(&mut self) -> &mut Slot {
		if self.target.is_none() {
			self.target = Some(Slot::default());
		}
		self.target.as_mut().expect("just inserted")
	}

	/// The current content, decoding from the current buffer if needed.
	/// Reads from the target slot once one exists (i.e. once the file has
	/// been modified), otherwise from the source slot.
	pub fn content(&mut self) -> &str {
		let encoding = self.encoding;
		match &mut self.target {
			Some(target) => target.text(encoding),
			None => self.source.text(encoding),
		}
	}

	/// Assign text content, marking the file modified and invalidating the
	/// cached buffer and line index.
	pub fn set_content(&mut self, text: impl Into<String>) {
		self.active_slot_mut().set_text(text.into());
		self.line_starts = None;
	}

	/// The current buffer, encoding from the current text if needed.
	pub fn buffer(&mut self) -> &[u8] {
		let encoding = self.encoding;
		match &mut self.target {
			Some(target) => target.buffer(encoding),
			None => self.source.buffer(encoding),
		}
	}

	/// Assign raw buffer content, marking the file modified and
	/// invalidating the cached text and line index.
	pub fn set_buffer(&mut self, buffer: Vec<u8>) {
		self.active_slot_mut().set_buffer(buffer);
		self.line_starts = None;
	}

	/// The content as it was first loaded from disk, ignoring any
	/// processor mutation.
	pub fn src_content(&mut self) -> &str {
		let encoding = self.encoding;
		self.source.text(encoding)
	}

	/// The buffer as it was first loaded from disk.
	pub fn src_buffer(&mut self) -> &[u8] {
		let encoding = self.encoding;
		self.source.buffer(encoding)
	}

	/// The source map attached by a processor, if any.
	#[must_use]
	pub fn source_map(&self) -> Option<&SourceMapBuilder> {
		self.source_map.as_ref()
	}

	/// Attach a source map. If one is already present, `apply_source_map` is
	/// used to compose it rather than replacing it outright, naming the
	/// prior stage's output path as the upstream's source.
	pub fn set_source_map(&mut self, mut map: SourceMapBuilder, prior_stage_name: &str) {
		if let Some(existing) = self.source_map.take() {
			map.apply_source_map(&existing, prior_stage_name);
		}
		self.source_map = Some(map);
	}

	/// Ensure the source slot is populated, reading from `initial_path` at
	/// most once. A read failure is recorded as a file-level error and the
	/// source is left with an empty buffer; processing continues.
	pub async fn load(&mut self, try_count: u32) {
		if !self.source.is_empty() {
			return;
		}
		let Some(path) = self.initial_path.clone() else {
			self.source.set_buffer(Vec::new());
			return;
		};
		match loom_fs::read_file(&path, try_count).await {
			Ok(bytes) => self.source.set_buffer(bytes),
			Err(err) => {
				trace!(path = %path.display(), %err, "failed to load file, leaving empty");
				self.error(format!("could not read {}: {err}", path.display()));
				self.source.set_buffer(Vec::new());
			}
		}
	}

	/// Append a dep edge: a file that, if it changes, invalidates this one.
	pub fn dep(&mut self, path: PathBuf) {
		if !self.deps.contains(&path) {
			self.deps.push(path);
		}
	}

	/// Append a ref edge: a file whose existence (but not mutation) this
	/// file's correctness depends on.
	pub fn add_ref(&mut self, path: PathBuf) {
		if !self.refs.contains(&path) {
			self.refs.push(path);
		}
	}

	/// Declared dep edges.
	#[must_use]
	pub fn deps(&self) -> &[PathBuf] {
		&self.deps
	}

	/// Declared ref edges.
	#[must_use]
	pub fn refs(&self) -> &[PathBuf] {
		&self.refs
	}

	/// Record a diagnostic, remapping its region through the file's source
	/// map if one is present and the diagnostic carries a generated
	/// position.
	pub fn log(&mut self, mut diagnostic: Diagnostic) {
		match diagnostic.severity {
			Severity::Error => self.error_count += 1,
			Severity::Warning => self.warning_count += 1,
			Severity::Verbose | Severity::Log => {}
		}

		if let (Some(map), Some(region)) = (&self.source_map, diagnostic.region) {
			if let Some(query) = map.get_source(region.start_line, region.start_column) {
				diagnostic.file = PathBuf::from(&query.source);
				diagnostic.region = Some(Region { start_line: query.line, start_column: query.column, ..region });
			}
		}

		self.diagnostics.push(diagnostic);
	}

	/// Record an error-severity diagnostic against this file.
	pub fn error(&mut self, message: impl Into<String>) {
		let file = self.dest_path();
		self.log(Diagnostic::new(Severity::Error, message, file));
	}

	/// Record a warning-severity diagnostic against this file.
	pub fn warning(&mut self, message: impl Into<String>) {
		let file = self.dest_path();
		self.log(Diagnostic::new(Severity::Warning, message, file));
	}

	/// Record a verbose-severity diagnostic against this file.
	pub fn verbose(&mut self, message: impl Into<String>) {
		let file = self.dest_path();
		self.log(Diagnostic::new(Severity::Verbose, message, file));
	}

	/// All diagnostics recorded against this file, in emission order.
	#[must_use]
	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diagnostics
	}

	/// Number of error-severity diagnostics recorded.
	#[must_use]
	pub const fn error_count(&self) -> usize {
		self.error_count
	}

	/// Number of warning-severity diagnostics recorded.
	#[must_use]
	pub const fn warning_count(&self) -> usize {
		self.warning_count
	}

	/// Zero-based (line, column) for a byte offset into the current
	/// content, computing and caching the line-start table on first use.
	pub fn line_col_at(&mut self, offset: usize) -> (u32, u32) {
		if self.line_starts.is_none() {
			let content = self.content();
			let mut starts = vec![0];
			starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
			self.line_starts = Some(starts);
		}
		let starts = self.line_starts.as_ref().expect("just populated");
		let line = match starts.binary_search(&offset) {
			Ok(idx) => idx,
			Err(idx) => idx.saturating_sub(1),
		};
		let column = offset - starts[line];
		(line as u32, column as u32)
	}

	/// Write this file's content to disk according to `opts`, or redirect to
	/// `sink` in server mode.
	pub async fn save(&mut self, opts: &SaveOptions, sink: Option<&(dyn Fn(&Path, &[u8]) + Send + Sync)>) -> SaveOutcome {
		if opts.mode == Some(BuildMode::Clean) {
			return self.save_clean(opts.try_count).await;
		}

		let dest = self.dest_path();
		let is_self_write = self.initial_path.as_deref() == Some(dest.as_path());

		if is_self_write && !self.modified() {
			return SaveOutcome::Skipped;
		}
		if is_self_write && self.modified() && !opts.overwrite {
			self.error(format!("refusing to overwrite source file {}", dest.display()));
			return SaveOutcome::Refused;
		}

		if opts.mode == Some(BuildMode::Preview) {
			return SaveOutcome::Written;
		}

		let mut text = self.content().to_owned();
		let has_map = opts.source_map_emit && self.source_map.is_some();
		let map_url = self.source_map_url(&dest, opts.source_map_inline);
		if let Some(url) = &map_url {
			text = loom_sourcemap::emit_source_map_url(&text, url, false);
		}
		let bytes = self.encoding.encode(&text);

		if let Some(sink) = sink {
			sink(&dest, &bytes);
		} else if let Err(err) = loom_fs::write_file(&dest, &bytes, opts.try_count).await {
			self.error(format!("could not write {}: {err}", dest.display()));
			return SaveOutcome::Refused;
		}

		if has_map && !opts.source_map_inline {
			if let Some(map) = &self.source_map {
				if let Ok(json) = loom_sourcemap::emit(map) {
					let map_path = sidecar_map_path(&dest);
					if sink.is_none() {
						if let Err(err) = loom_fs::write_file(&map_path, json.as_bytes(), opts.try_count).await {
							self.error(format!("could not write {}: {err}", map_path.display()));
						}
					}
				}
			}
		}

		SaveOutcome::Written
	}

	fn source_map_url(&self, dest: &Path, inline: bool) -> Option<String> {
		let map = self.source_map.as_ref()?;
		if inline {
			let json = loom_sourcemap::emit(map).ok()?;
			Some(format!("data:application/json;base64,{}", base64_encode(json.as_bytes())))
		} else {
			Some(sidecar_map_path(dest).file_name()?.to_string_lossy().into_owned())
		}
	}

	async fn save_clean(&mut self, try_count: u32) -> SaveOutcome {
		let dest = self.dest_path();
		let map_path = sidecar_map_path(&dest);
		let _ = loom_fs::delete_file(&dest, try_count).await;
		let _ = loom_fs::delete_file(&map_path, try_count).await;
		let _ = loom_fs::prune_empty_parents(&dest, &self.base).await;
		SaveOutcome::Deleted
	}

	/// Delete the file's on-disk counterpart (a no-op for generated files),
	/// then prune any now-empty parent directories up to `stop_at`.
	pub async fn delete(&mut self, stop_at: &Path, delete_empty_parent: bool, try_count: u32) {
		let Some(path) = self.initial_path.clone() else { return };
		if let Err(err) = loom_fs::delete_file(&path, try_count).await {
			self.error(format!("could not delete {}: {err}", path.display()));
			return;
		}
		if delete_empty_parent {
			let _ = loom_fs::prune_empty_parents(&path, stop_at).await;
		}
	}

	/// Shallow-clone this file, duplicating owned buffers so the clone and
	/// the original can be mutated independently. Used by collecting stages
	/// to retain a stable snapshot while downstream stages mutate later
	/// copies.
	#[must_use]
	pub fn snapshot(&self) -> Self {
		self.clone()
	}
}

fn sidecar_map_path(dest: &Path) -> PathBuf {
	let mut os = dest.as_os_str().to_owned();
	os.push(".map");
	PathBuf::from(os)
}

fn base64_encode(bytes: &[u8]) -> String {
	use base64::Engine;
	base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unmodified_file_mirrors_source_buffer() {
		let mut file = File::from_disk(PathBuf::from("/root/a.txt"), PathBuf::from("/root"), "a.txt".to_owned());
		file.source.set_buffer(b"hello".to_vec());
		assert_eq!(file.content(), "hello");
		assert!(!file.modified());
	}

	#[test]
	fn setting_content_marks_modified_and_invalidates_buffer() {
		let mut file = File::generated(PathBuf::from("/out"), "x.txt", "one");
		assert!(file.modified());
		assert_eq!(file.buffer(), b"one");
		file.set_content("two");
		assert_eq!(file.buffer(), b"two");
	}

	#[test]
	fn dest_path_joins_base_and_name() {
		let file = File::from_disk(PathBuf::from("/src/a.txt"), PathBuf::from("/out"), "sub/a.txt".to_owned());
		assert_eq!(file.dest_path(), PathBuf::from("/out").join(loom_path::from_logical("sub/a.txt")));
	}

	#[test]
	fn set_name_changes_dest_path() {
		let mut file = File::from_disk(PathBuf::from("/src/a.txt"), PathBuf::from("/out"), "a.txt".to_owned());
		file.set_name("b.txt");
		assert_eq!(file.dest_path(), PathBuf::from("/out/b.txt"));
	}

	#[test]
	fn dep_edges_are_deduplicated() {
		let mut file = File::generated(PathBuf::from("/out"), "x.txt", "");
		file.dep(PathBuf::from("/a"));
		file.dep(PathBuf::from("/a"));
		assert_eq!(file.deps().len(), 1);
	}

	#[test]
	fn line_col_at_finds_second_line() {
		let mut file = File::generated(PathBuf::from("/out"), "x.txt", "one\ntwo\nthree");
		let (line, col) = file.line_col_at(4);
		assert_eq!((line, col), (1, 0));
	}

	#[tokio::test]
	async fn load_missing_file_records_error_and_leaves_buffer_empty() {
		let mut file = File::from_disk(PathBuf::from("/definitely/missing/path.txt"), PathBuf::from("/definitely/missing"), "path.txt".to_owned());
		file.load(1).await;
		assert_eq!(file.error_count(), 1);
		assert_eq!(file.src_buffer(), b"");
	}

	#[tokio::test]
	async fn preview_mode_counts_as_written_without_io() {
		let tmp = tempfile::tempdir().unwrap();
		let dest_dir = tmp.path().join("out");
		let mut file = File::generated(dest_dir.clone(), "a.txt", "hi");
		let opts = SaveOptions { mode: Some(BuildMode::Preview), overwrite: false, try_count: 1, source_map_emit: false, source_map_inline: false };
		let outcome = file.save(&opts, None).await;
		assert_eq!(outcome, SaveOutcome::Written);
		assert!(!dest_dir.join("a.txt").exists());
	}
}
