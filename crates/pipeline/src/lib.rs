//! The file graph: a linked chain of [`List`]s that admit, transform, and
//! forward [`loom_file::File`]s, plus the glob-driven [`Pipeline::src`] that
//! seeds a root list from disk.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod config;
mod list;
mod observer;
mod pipeline;
mod processor;
mod source;

#[doc(inline)]
pub use config::{Computed, Options};
#[doc(inline)]
pub use list::List;
#[doc(inline)]
pub use observer::{NoopObserver, Observer};
#[doc(inline)]
pub use pipeline::Pipeline;
#[doc(inline)]
pub use processor::{AddHook, EndHook, LifecycleHook, Processor};
#[doc(inline)]
pub use source::drive as drive_source;

#[cfg(test)]
mod tests {
	use std::path::PathBuf;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::{Arc, Mutex};

	use futures::FutureExt;
	use loom_file::File;

	use super::*;

	#[tokio::test]
	async fn files_flow_through_a_two_stage_chain() {
		let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
		let root = List::new("root", Processor::passthrough(), Options::default(), observer);

		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_for_hook = Arc::clone(&seen);
		let processor = Processor {
			add: Some(AddHook::Sync(Arc::new(move |file: File, _options: &Options| {
				seen_for_hook.lock().unwrap().push(file.name().unwrap_or_default().to_owned());
				(file, true)
			}))),
			..Processor::passthrough()
		};
		root.pipe(processor, Options::default()).await;

		root.add(File::from_disk(PathBuf::from("/src/a.txt"), PathBuf::from("/src"), "a.txt".to_owned())).await;
		root.end_upstream().await;

		assert_eq!(*seen.lock().unwrap(), vec!["a.txt".to_owned()]);
	}

	#[tokio::test]
	async fn veto_suppresses_forwarding() {
		let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
		let root = List::new("root", Processor::passthrough(), Options::default(), observer);

		let forwarded = Arc::new(AtomicUsize::new(0));
		let forwarded_for_filter = Arc::clone(&forwarded);
		let veto = Processor {
			add: Some(AddHook::Sync(Arc::new(|file: File, _options: &Options| (file, false)))),
			..Processor::passthrough()
		};
		let filtered = root.pipe(veto, Options::default()).await;

		let count = Processor {
			add: Some(AddHook::Sync(Arc::new(move |file: File, _options: &Options| {
				forwarded_for_filter.fetch_add(1, Ordering::SeqCst);
				(file, true)
			}))),
			..Processor::passthrough()
		};
		filtered.pipe(count, Options::default()).await;

		root.add(File::from_disk(PathBuf::from("/src/a.txt"), PathBuf::from("/src"), "a.txt".to_owned())).await;
		root.end_upstream().await;

		assert_eq!(forwarded.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn collecting_stage_batches_into_end() {
		let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
		let root = List::new("root", Processor::passthrough(), Options::default(), observer);

		let batch_len = Arc::new(AtomicUsize::new(0));
		let batch_len_for_end = Arc::clone(&batch_len);
		let batch_names: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
		let batch_names_for_end = Arc::clone(&batch_names);
		let collecting = Processor {
			collect: true,
			end: Some(Arc::new(move |files: Vec<File>, _options: Options, _list: List| {
				let batch_len = Arc::clone(&batch_len_for_end);
				let batch_names = Arc::clone(&batch_names_for_end);
				async move {
					batch_len.store(files.len(), Ordering::SeqCst);
					*batch_names.lock().unwrap() = files.iter().map(|file| file.name().unwrap_or_default().to_owned()).collect();
				}
				.boxed()
			})),
			..Processor::passthrough()
		};
		let collector = root.pipe(collecting, Options::default()).await;

		// Admitted out of alphabetical order, to rule out a key-sorted or
		// hash-ordered buffer passing this by accident.
		collector.add(File::from_disk(PathBuf::from("/src/b.txt"), PathBuf::from("/src"), "b.txt".to_owned())).await;
		collector.add(File::from_disk(PathBuf::from("/src/a.txt"), PathBuf::from("/src"), "a.txt".to_owned())).await;
		root.end_upstream().await;

		assert_eq!(batch_len.load(Ordering::SeqCst), 2);
		assert_eq!(*batch_names.lock().unwrap(), vec!["b.txt".to_owned(), "a.txt".to_owned()]);
	}
}
