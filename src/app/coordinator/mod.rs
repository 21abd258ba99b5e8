//! Transfer orchestration
//!
//! The coordinator drives the enumerator, queue and worker pool through a
//! sequence of phases. Each phase gets a fresh queue and pool, and the next
//! phase starts only after every worker of the previous one has joined:
//!
//! 1. one phase per directory depth, shallowest first, so a collection's
//!    MKCOL has completed before any MKCOL beneath it is sent
//! 2. a final phase for every regular file
//!
//! Tasks beneath a directory whose MKCOL failed are never dispatched; they
//! are reported as [`TransferError::ParentFailed`].
//!
//! # Architecture
//!
//! - [`progress`] - Events for the terminal progress display
//! - [`signals`] - CTRL-C / SIGTERM to cancellation token
//! - [`stats`] - The run summary and exit code
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use webdav_bulk::app::{Coordinator, Dispatcher, Enumerator, WorkerConfig};
//!
//! # async fn example(dispatcher: Dispatcher) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(
//!     Enumerator::new("/srv/export"),
//!     Arc::new(dispatcher),
//!     WorkerConfig::with_workers(8),
//!     CancellationToken::new(),
//! );
//!
//! let summary = coordinator.run().await?;
//! println!("{}", summary.render_text());
//! # Ok(())
//! # }
//! ```

pub mod progress;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::models::{Task, TaskReport};
use crate::app::queue::{task_queue, TaskSender};
use crate::app::walker::Enumerator;
use crate::app::worker::{TaskHandler, WorkerConfig, WorkerPool};
use crate::errors::{AppError, QueueError, Result, TransferError, WalkError, WalkResult};

pub use progress::{EventSink, Phase, TransferEvent};
pub use signals::SignalHandler;
pub use stats::{FailedTask, TransferSummary};

/// Runs one complete transfer
pub struct Coordinator<H> {
    enumerator: Enumerator,
    handler: Arc<H>,
    config: WorkerConfig,
    cancel: CancellationToken,
    events: EventSink,
}

impl<H: TaskHandler> Coordinator<H> {
    pub fn new(
        enumerator: Enumerator,
        handler: Arc<H>,
        config: WorkerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            enumerator,
            handler,
            config,
            cancel,
            events: EventSink::disabled(),
        }
    }

    /// Send progress events to `events`
    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Run every phase and return the summary
    ///
    /// # Errors
    ///
    /// Returns `AppError` for whole-run failures only: an enumeration error,
    /// or a worker that panicked. Individual task failures land in the summary.
    pub async fn run(&self) -> Result<TransferSummary> {
        let started = Instant::now();
        let mut summary = TransferSummary::new(Utc::now());
        let mut failed_dirs = HashSet::new();

        info!(
            "Starting transfer from {} with {} workers",
            self.enumerator.root().display(),
            self.config.worker_count
        );

        let levels = self.collect_directory_levels().await?;
        debug!("{} directory levels", levels.len());

        for (depth, tasks) in levels {
            if self.cancel.is_cancelled() {
                break;
            }
            let count = tasks.len();
            self.run_phase(
                Phase::Directories { depth },
                Some(count),
                tasks.into_iter().map(Ok),
                &mut summary,
                &mut failed_dirs,
            )
            .await?;
        }

        if !self.cancel.is_cancelled() {
            self.run_phase(
                Phase::Files,
                None,
                self.enumerator.files(),
                &mut summary,
                &mut failed_dirs,
            )
            .await?;
        }

        summary.cancelled = self.cancel.is_cancelled();
        summary.duration = started.elapsed();
        self.events.emit(TransferEvent::Finished);

        if summary.cancelled {
            warn!("Transfer cancelled after {} tasks", summary.total());
        }
        info!(
            "Transfer finished in {:.2?}: {} succeeded, {} failed, {} skipped",
            summary.duration,
            summary.succeeded(),
            summary.failed,
            summary.skipped
        );

        Ok(summary)
    }

    /// Pass 1 of the walk, grouped by depth
    async fn collect_directory_levels(&self) -> Result<BTreeMap<usize, Vec<Task>>> {
        let enumerator = self.enumerator.clone();
        let directories = tokio::task::spawn_blocking(move || {
            enumerator.directories().collect::<WalkResult<Vec<Task>>>()
        })
        .await
        .map_err(|_| WalkError::WalkerTerminated)??;

        info!("Found {} directories", directories.len());
        Ok(group_by_depth(directories))
    }

    /// One barrier-delimited phase: fill a fresh queue, drain it, join
    async fn run_phase<I>(
        &self,
        phase: Phase,
        expected: Option<usize>,
        tasks: I,
        summary: &mut TransferSummary,
        failed_dirs: &mut HashSet<String>,
    ) -> Result<()>
    where
        I: Iterator<Item = WalkResult<Task>> + Send + 'static,
    {
        info!("Phase: {}", phase);
        self.events.emit(TransferEvent::PhaseStarted {
            phase,
            tasks: expected,
        });

        let (sender, receiver) = task_queue(self.config.queue_capacity());
        let (reports_tx, mut reports_rx) = mpsc::channel(self.config.report_buffer_size);

        let pool = WorkerPool::start(
            &self.config,
            receiver,
            Arc::clone(&self.handler),
            reports_tx.clone(),
            self.cancel.clone(),
        );

        let failed_snapshot = Arc::new(failed_dirs.clone());
        let cancel = self.cancel.clone();
        let producer = tokio::task::spawn_blocking(move || {
            produce(tasks, sender, reports_tx, &failed_snapshot, &cancel)
        });

        let collect = async {
            while let Some(report) = reports_rx.recv().await {
                if report.task.is_directory() && !report.succeeded() {
                    failed_dirs.insert(report.task.path().to_string());
                }
                self.events.emit(TransferEvent::from_report(&report));
                summary.record(&report);
            }
        };

        let drive = async {
            let produced = match producer.await {
                Ok(Ok(count)) => Ok(count),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(WalkError::WalkerTerminated.into()),
            };
            if produced.is_err() {
                // queued tasks must not be sent after a fatal walk error
                self.cancel.cancel();
            }

            let joined = pool.join().await;
            let produced = produced?;
            let handled = joined?;
            debug!("Phase {}: {} enqueued, {} handled", phase, produced, handled);
            Ok(())
        };

        let ((), result) = tokio::join!(collect, drive);
        result
    }
}

/// Feed the queue from a blocking thread
///
/// Tasks under a failed directory are reported straight away instead of
/// being enqueued. Stops early once the run is cancelled.
fn produce<I>(
    tasks: I,
    sender: TaskSender,
    reports: mpsc::Sender<TaskReport>,
    failed_dirs: &HashSet<String>,
    cancel: &CancellationToken,
) -> Result<usize>
where
    I: Iterator<Item = WalkResult<Task>>,
{
    let mut produced = 0;

    for task in tasks {
        if cancel.is_cancelled() {
            debug!("Producer stopping: run cancelled");
            break;
        }
        let task = task?;

        if let Some(parent) = failed_ancestor(&task, failed_dirs) {
            let parent = parent.to_string();
            debug!("Not dispatching {}: parent {} failed", task, parent);
            reports
                .blocking_send(TaskReport::not_dispatched(
                    task,
                    TransferError::ParentFailed { parent },
                ))
                .map_err(|_| AppError::from(QueueError::Closed))?;
            continue;
        }

        sender.blocking_send(task)?;
        produced += 1;
    }

    sender.close();
    Ok(produced)
}

/// Nearest ancestor of `task` recorded as failed
fn failed_ancestor<'a>(task: &'a Task, failed_dirs: &HashSet<String>) -> Option<&'a str> {
    task.ancestors()
        .into_iter()
        .rev()
        .find(|ancestor| failed_dirs.contains(*ancestor))
}

fn group_by_depth(directories: Vec<Task>) -> BTreeMap<usize, Vec<Task>> {
    let mut levels: BTreeMap<usize, Vec<Task>> = BTreeMap::new();
    for task in directories {
        levels.entry(task.depth()).or_default().push(task);
    }
    levels
}
