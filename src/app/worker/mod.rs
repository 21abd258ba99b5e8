//! Concurrent workers draining the task queue
//!
//! The pool knows nothing about HTTP. It calls a [`TaskHandler`] for every
//! task; in production that is the request dispatcher, in tests a mock.
//!
//! # Module Organization
//!
//! - [`config`] - Worker count and report buffer settings
//! - [`core`] - The per-worker receive/dispatch/report loop
//! - [`pool`] - Spawning and joining the workers
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use webdav_bulk::app::models::{Task, TaskSuccess};
//! use webdav_bulk::app::queue::task_queue;
//! use webdav_bulk::app::worker::{Dispatched, TaskHandler, WorkerConfig, WorkerPool};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl TaskHandler for Noop {
//!     async fn handle(&self, _task: &Task) -> Dispatched {
//!         Dispatched { outcome: Ok(TaskSuccess::Created), attempts: 1 }
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WorkerConfig::default();
//! let (sender, receiver) = task_queue(config.queue_capacity());
//! let (reports_tx, mut reports_rx) = mpsc::channel(16);
//! let pool = WorkerPool::start(&config, receiver, Arc::new(Noop), reports_tx, CancellationToken::new());
//!
//! sender.send(Task::directory("a")).await?;
//! sender.close();
//!
//! let collector = tokio::spawn(async move {
//!     while let Some(report) = reports_rx.recv().await {
//!         println!("{} -> {:?}", report.task, report.outcome);
//!     }
//! });
//! pool.join().await?;
//! collector.await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::app::models::{Task, TaskSuccess};
use crate::errors::TransferResult;

pub mod config;
pub mod core;
pub mod pool;


pub use self::config::WorkerConfig;
pub use self::core::Worker;
pub use self::pool::WorkerPool;

/// Outcome of handing one task to a handler
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: TransferResult<TaskSuccess>,
    /// Requests issued, retries included
    pub attempts: u32,
}

/// Executes one task; implemented by the request dispatcher
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: &Task) -> Dispatched;
}
