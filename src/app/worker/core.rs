//! Single worker loop
//!
//! A worker takes one task at a time off the shared queue, hands it to the
//! [`TaskHandler`] and forwards the resulting [`TaskReport`]. Once the run is
//! cancelled it stops dispatching and reports whatever it still dequeues as
//! cancelled, so the queue always drains.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Dispatched, TaskHandler};
use crate::app::models::TaskReport;
use crate::app::queue::TaskReceiver;
use crate::errors::TransferError;

/// One consumer of the task queue
pub struct Worker<H> {
    id: usize,
    receiver: TaskReceiver,
    handler: Arc<H>,
    reports: mpsc::Sender<TaskReport>,
    cancel: CancellationToken,
}

impl<H: TaskHandler> Worker<H> {
    pub fn new(
        id: usize,
        receiver: TaskReceiver,
        handler: Arc<H>,
        reports: mpsc::Sender<TaskReport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            receiver,
            handler,
            reports,
            cancel,
        }
    }

    /// Drain the queue until it is closed; returns the number of tasks taken
    pub async fn run(self) -> usize {
        debug!("Worker {} started", self.id);
        let mut handled = 0;

        while let Some(task) = self.receiver.recv().await {
            handled += 1;

            let report = if self.cancel.is_cancelled() {
                TaskReport::not_dispatched(task, TransferError::Cancelled)
            } else {
                debug!("Worker {} starting {} {}", self.id, task.kind(), task);
                let started = Instant::now();
                let Dispatched { outcome, attempts } = self.handler.handle(&task).await;
                TaskReport {
                    task,
                    outcome,
                    attempts,
                    elapsed: started.elapsed(),
                }
            };

            log_report(self.id, &report);

            if self.reports.send(report).await.is_err() {
                warn!("Worker {} lost its report channel, stopping", self.id);
                break;
            }
        }

        debug!("Worker {} finished after {} tasks", self.id, handled);
        handled
    }
}

fn log_report(worker_id: usize, report: &TaskReport) {
    match &report.outcome {
        Ok(success) => info!(
            "Worker {}: {} {} done ({:?}, {} attempt(s), {:.2?})",
            worker_id,
            report.task.kind(),
            report.task,
            success,
            report.attempts,
            report.elapsed
        ),
        Err(TransferError::Cancelled) => {
            debug!("Worker {}: {} cancelled", worker_id, report.task)
        }
        Err(e) => warn!(
            "Worker {}: {} {} failed after {} attempt(s): {}",
            worker_id,
            report.task.kind(),
            report.task,
            report.attempts,
            e
        ),
    }
}
