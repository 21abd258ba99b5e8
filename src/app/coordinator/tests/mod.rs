//! Coordinator tests against a mock handler

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::app::models::{TaskKind, TaskSuccess};
use crate::app::worker::Dispatched;

/// Records when each task started and finished on a shared clock
#[derive(Default)]
struct TimelineHandler {
    clock: AtomicU64,
    spans: Mutex<HashMap<String, (u64, u64)>>,
    fail: Vec<String>,
}

impl TimelineHandler {
    fn failing(paths: &[&str]) -> Self {
        Self {
            fail: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn spans(&self) -> HashMap<String, (u64, u64)> {
        self.spans.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskHandler for TimelineHandler {
    async fn handle(&self, task: &Task) -> Dispatched {
        let start = self.clock.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let end = self.clock.fetch_add(1, Ordering::SeqCst);
        self.spans
            .lock()
            .unwrap()
            .insert(task.path().to_string(), (start, end));

        let outcome = if self.fail.iter().any(|f| f == task.path()) {
            Err(TransferError::Protocol { status: 409 })
        } else if task.is_directory() {
            Ok(TaskSuccess::Created)
        } else {
            Ok(TaskSuccess::Uploaded { bytes: 1 })
        };
        Dispatched {
            outcome,
            attempts: 1,
        }
    }
}

/// Cancels the run from inside its first dispatch
struct CancellingHandler {
    cancel: CancellationToken,
    calls: AtomicU64,
    started_after_cancel: AtomicU64,
}

impl CancellingHandler {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            calls: AtomicU64::new(0),
            started_after_cancel: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl TaskHandler for CancellingHandler {
    async fn handle(&self, _task: &Task) -> Dispatched {
        if self.cancel.is_cancelled() {
            self.started_after_cancel.fetch_add(1, Ordering::SeqCst);
        }
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.cancel.cancel();
        }
        // still in flight after the cancel
        tokio::time::sleep(Duration::from_millis(50)).await;
        Dispatched {
            outcome: Ok(TaskSuccess::Created),
            attempts: 1,
        }
    }
}

fn build_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for d in ["a/b/c", "a/d", "bad/sub", "e"] {
        fs::create_dir_all(root.join(d)).unwrap();
    }
    for f in [
        "a/1.txt",
        "a/b/2.txt",
        "a/b/c/3.txt",
        "a/d/4.txt",
        "bad/5.txt",
        "bad/sub/6.txt",
        "top.txt",
    ] {
        fs::write(root.join(f), f).unwrap();
    }
    dir
}

fn coordinator(
    root: &std::path::Path,
    handler: Arc<TimelineHandler>,
    workers: usize,
    cancel: CancellationToken,
) -> Coordinator<TimelineHandler> {
    Coordinator::new(
        Enumerator::new(root),
        handler,
        WorkerConfig::with_workers(workers),
        cancel,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parents_complete_before_children_start() {
    let dir = build_tree();
    let handler = Arc::new(TimelineHandler::default());

    let summary = coordinator(dir.path(), Arc::clone(&handler), 4, CancellationToken::new())
        .run()
        .await
        .unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.directories_created, 7);
    assert_eq!(summary.files_uploaded, 7);

    let spans = handler.spans();
    for (path, (start, _)) in &spans {
        let task = Task::file(path.clone());
        for ancestor in task.ancestors() {
            let (_, parent_end) = spans[ancestor];
            assert!(
                parent_end < *start,
                "{} started before its parent {} finished",
                path,
                ancestor
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_directory_precedes_every_file() {
    let dir = build_tree();
    let handler = Arc::new(TimelineHandler::default());

    coordinator(dir.path(), Arc::clone(&handler), 3, CancellationToken::new())
        .run()
        .await
        .unwrap();

    let spans = handler.spans();
    let last_dir_end = ["a", "a/b", "a/b/c", "a/d", "bad", "bad/sub", "e"]
        .iter()
        .map(|d| spans[*d].1)
        .max()
        .unwrap();
    let first_file_start = spans
        .iter()
        .filter(|(p, _)| p.ends_with(".txt"))
        .map(|(_, (s, _))| *s)
        .min()
        .unwrap();
    assert!(last_dir_end < first_file_start);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_directory_skips_descendants() {
    let dir = build_tree();
    let handler = Arc::new(TimelineHandler::failing(&["bad"]));

    let summary = coordinator(dir.path(), Arc::clone(&handler), 2, CancellationToken::new())
        .run()
        .await
        .unwrap();

    let spans = handler.spans();
    assert!(spans.contains_key("bad"));
    assert!(!spans.contains_key("bad/sub"));
    assert!(!spans.contains_key("bad/5.txt"));
    assert!(!spans.contains_key("bad/sub/6.txt"));
    assert!(spans.contains_key("top.txt"));

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.total(), 14);
    assert_eq!(summary.exit_code(), 1);

    let nested = summary
        .failures
        .iter()
        .find(|f| f.path == "bad/sub/6.txt")
        .unwrap();
    assert_eq!(nested.category, "parent-failed");
    assert!(nested.reason.contains("bad/sub"));
}

#[tokio::test]
async fn test_cancelled_run_dispatches_nothing() {
    let dir = build_tree();
    let handler = Arc::new(TimelineHandler::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = coordinator(dir.path(), Arc::clone(&handler), 2, cancel)
        .run()
        .await
        .unwrap();

    assert!(handler.spans().is_empty());
    assert!(summary.cancelled);
    assert_ne!(summary.exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_run_stops_producer_and_lets_in_flight_finish() {
    let dir = TempDir::new().unwrap();
    for i in 0..40 {
        fs::create_dir(dir.path().join(format!("dir{:02}", i))).unwrap();
        fs::write(dir.path().join(format!("file{:02}.txt", i)), b"x").unwrap();
    }
    let cancel = CancellationToken::new();
    let handler = Arc::new(CancellingHandler::new(cancel.clone()));

    let summary = Coordinator::new(
        Enumerator::new(dir.path()),
        Arc::clone(&handler),
        WorkerConfig::with_workers(1),
        cancel,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(handler.started_after_cancel.load(Ordering::SeqCst), 0);

    // the in-flight task completed normally
    assert_eq!(summary.directories_created, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.cancelled);
    assert_eq!(summary.exit_code(), 1);

    // dequeued leftovers are reported, the rest was never enqueued
    assert!(summary.skipped >= 1);
    assert_eq!(summary.skipped, summary.total() - 1);
    assert!(summary.total() < 40, "producer kept going: {}", summary.total());
    assert!(summary
        .failures
        .iter()
        .all(|f| f.category == "cancelled" && f.kind == TaskKind::Directory));
    assert_eq!(summary.files_uploaded, 0);
}

#[tokio::test]
async fn test_empty_tree() {
    let dir = TempDir::new().unwrap();
    let handler = Arc::new(TimelineHandler::default());

    let summary = coordinator(dir.path(), handler, 5, CancellationToken::new())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total(), 0);
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let handler = Arc::new(TimelineHandler::default());

    let result = coordinator(
        &dir.path().join("missing"),
        handler,
        2,
        CancellationToken::new(),
    )
    .run()
    .await;

    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.category(), "enumeration");
}

#[tokio::test]
async fn test_events_follow_phases() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("a")).unwrap();
    fs::write(dir.path().join("a/x.txt"), "hello").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler = Arc::new(TimelineHandler::default());
    coordinator(dir.path(), handler, 1, CancellationToken::new())
        .with_events(EventSink::new(tx))
        .run()
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events.first(),
        Some(&TransferEvent::PhaseStarted {
            phase: Phase::Directories { depth: 1 },
            tasks: Some(1),
        })
    );
    assert!(events.contains(&TransferEvent::PhaseStarted {
        phase: Phase::Files,
        tasks: None,
    }));
    assert_eq!(events.last(), Some(&TransferEvent::Finished));
    assert_eq!(events.len(), 5);
}

#[test]
fn test_failed_ancestor_picks_nearest() {
    let failed: HashSet<String> = ["a", "a/b"].iter().map(|s| s.to_string()).collect();
    let task = Task::file("a/b/c/x.txt");
    assert_eq!(failed_ancestor(&task, &failed), Some("a/b"));
    assert_eq!(failed_ancestor(&Task::file("z.txt"), &failed), None);
}

#[test]
fn test_group_by_depth() {
    let levels = group_by_depth(vec![
        Task::directory("a"),
        Task::directory("a/b"),
        Task::directory("c"),
    ]);
    assert_eq!(levels.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(levels[&1].len(), 2);
}
