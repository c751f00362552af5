use std::sync::Arc;

use futures::future::BoxFuture;
use loom::Config;
use loom_file::BuildMode;
use loom_pipeline::{Options, Pipeline};
use loom_runner::{Summary, Task};

#[tokio::test]
async fn build_mode_writes_files_under_the_dest_directory() {
	let src = tempfile::tempdir().unwrap();
	let out = src.path().join("_out");
	std::fs::write(src.path().join("a.txt"), b"hello").unwrap();

	let config = Config::default();
	config.cwd(src.path()).build_mode(Some(BuildMode::Build));

	let task: Task = Arc::new({
		let out = out.clone();
		move |pipeline: Arc<Pipeline>, options: Options| -> BoxFuture<'static, ()> {
			let out = out.clone();
			Box::pin(async move {
				let root = pipeline.src(vec!["*.txt"], options.clone());
				root.dest(out, options).await;
			})
		}
	});

	let runner = config.runner(task, "build", None).unwrap();
	let summary = runner.run().unwrap().await.unwrap();

	assert_eq!(summary.status, loom_runner::Status::BuildSuccess);
	assert_eq!(std::fs::read_to_string(out.join("a.txt")).unwrap(), "hello");
}

#[tokio::test]
async fn preview_mode_counts_files_without_touching_disk() {
	let src = tempfile::tempdir().unwrap();
	let out = src.path().join("_out");
	std::fs::write(src.path().join("a.txt"), b"hello").unwrap();

	let config = Config::default();
	config.cwd(src.path()).build_mode(Some(BuildMode::Preview));

	let task: Task = Arc::new({
		let out = out.clone();
		move |pipeline: Arc<Pipeline>, options: Options| -> BoxFuture<'static, ()> {
			let out = out.clone();
			Box::pin(async move {
				let root = pipeline.src(vec!["*.txt"], options.clone());
				root.dest(out, options).await;
			})
		}
	});

	let runner = config.runner(task, "preview", None).unwrap();
	let summary: Summary = runner.run().unwrap().await.unwrap();

	assert_eq!(summary.status, loom_runner::Status::PreviewCompleted);
	assert_eq!(summary.files, 1);
	assert!(!out.exists());
}
