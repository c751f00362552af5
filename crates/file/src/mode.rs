//! The build mode a task invocation runs under; governs how [`crate::File::save`]
//! behaves.

/// One of the five execution modes a task can run under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
	/// Write processed files to disk.
	Build,
	/// Delete the files that a build would have produced.
	Clean,
	/// Run the pipeline without touching disk; count files as written.
	Preview,
	/// Like `Build`, but stay resident and re-run on filesystem changes.
	Watch,
	/// Like `Build`, but redirect writes to an in-memory sink served over HTTP.
	Server,
}
