//! Worker pool management
//!
//! The pool spawns a fixed number of workers on one shared receiver and
//! joins all of them. The caller closes the queue; joining the pool is the
//! barrier that says every task taken has been reported.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::config::WorkerConfig;
use super::core::Worker;
use super::TaskHandler;
use crate::app::models::TaskReport;
use crate::app::queue::TaskReceiver;
use crate::errors::{QueueError, QueueResult};

/// A running set of workers
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<usize>>,
}

impl WorkerPool {
    /// Spawn `config.worker_count` workers
    pub fn start<H: TaskHandler>(
        config: &WorkerConfig,
        receiver: TaskReceiver,
        handler: Arc<H>,
        reports: mpsc::Sender<TaskReport>,
        cancel: CancellationToken,
    ) -> Self {
        debug!("Starting {} workers", config.worker_count);

        let handles = (0..config.worker_count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    receiver.clone(),
                    Arc::clone(&handler),
                    reports.clone(),
                    cancel.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit; returns the total tasks taken
    pub async fn join(self) -> QueueResult<usize> {
        let mut handled = 0;
        let mut failed = 0;

        for handle in self.handles {
            match handle.await {
                Ok(count) => handled += count,
                Err(e) => {
                    error!("Worker terminated abnormally: {}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(QueueError::WorkerPanic { count: failed });
        }
        Ok(handled)
    }
}
