//! Bounded task channel with exclusive hand-off
//!
//! The queue is a tokio `mpsc` channel. Workers share the receiving end
//! behind an async mutex, so each task is handed to exactly one worker.
//! Dropping or closing the last sender is the termination signal: workers
//! drain what is left and then see `None`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::app::models::Task;
use crate::errors::{QueueError, QueueResult};

/// Enqueue/dequeue counters shared by both ends
#[derive(Debug, Default)]
pub struct QueueCounters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

impl QueueCounters {
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

/// Create a queue holding at most `capacity` tasks
///
/// A zero capacity is raised to one; tokio channels cannot be unbuffered.
pub fn task_queue(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let counters = Arc::new(QueueCounters::default());

    (
        TaskSender {
            inner: tx,
            counters: Arc::clone(&counters),
        },
        TaskReceiver {
            inner: Arc::new(Mutex::new(rx)),
            counters,
        },
    )
}

/// Producer end; blocks when the queue is full
#[derive(Debug)]
pub struct TaskSender {
    inner: mpsc::Sender<Task>,
    counters: Arc<QueueCounters>,
}

impl TaskSender {
    /// Enqueue from async code, waiting for a free slot
    pub async fn send(&self, task: Task) -> QueueResult<()> {
        self.inner.send(task).await.map_err(|_| QueueError::Closed)?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Enqueue from a blocking thread, parking it for a free slot
    ///
    /// Must not be called from inside the async runtime.
    pub fn blocking_send(&self, task: Task) -> QueueResult<()> {
        self.inner
            .blocking_send(task)
            .map_err(|_| QueueError::Closed)?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the queue; workers drain the remaining tasks and exit
    pub fn close(self) {
        drop(self);
    }

    pub fn capacity(&self) -> usize {
        self.inner.max_capacity()
    }

    pub fn counters(&self) -> &QueueCounters {
        &self.counters
    }
}

/// Consumer end, cloned into every worker
#[derive(Debug, Clone)]
pub struct TaskReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Task>>>,
    counters: Arc<QueueCounters>,
}

impl TaskReceiver {
    /// Next task, or `None` once the queue is closed and empty
    pub async fn recv(&self) -> Option<Task> {
        let task = self.inner.lock().await.recv().await;
        if task.is_some() {
            self.counters.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        task
    }

    pub fn counters(&self) -> &QueueCounters {
        &self.counters
    }
}
