//! The event bus: one method per notable occurrence in the file graph, each
//! with a no-op default so implementors only override what they watch.

use std::path::Path;

use loom_file::{Diagnostic, File, SaveOutcome};

use crate::list::List;

/// Observes the file graph as it runs. All methods default to no-ops;
/// the `*_validate` hooks default to allowing (returning `true`).
pub trait Observer: Send + Sync {
	/// A new list was appended to a chain.
	fn add_list(&self, _list: &List) {}
	/// A file arrived at some list.
	fn add_file(&self, _file: &File) {}
	/// A directory was enumerated during source discovery.
	fn add_dir(&self, _dir: &Path) {}
	/// A file was saved (or would have been, in preview mode).
	fn file_save(&self, _file: &File, _outcome: SaveOutcome) {}
	/// A file's on-disk counterpart was deleted.
	fn file_delete(&self, _file: &File) {}
	/// A diagnostic was logged against a file.
	fn file_log(&self, _file: &File, _diagnostic: &Diagnostic) {}
	/// A dependency edge was added to a file.
	fn file_dep(&self, _file: &File, _dep: &Path) {}
	/// A reference edge was added to a file.
	fn file_ref(&self, _file: &File, _reference: &Path) {}
	/// Called before a file is admitted to a list; return `false` to veto.
	fn file_validate(&self, _file: &File) -> bool {
		true
	}
	/// Called before a source map is attached to a file; return `false` to
	/// veto attaching it.
	fn source_map_validate(&self, _file: &File) -> bool {
		true
	}
}

/// An [`Observer`] that does nothing, for pipelines that don't need one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
