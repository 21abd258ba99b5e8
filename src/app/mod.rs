//! Core application logic for the WebDAV bulk uploader
//!
//! This module contains the transfer pipeline: the local tree enumerator,
//! the task queue and worker pool, the request dispatcher and the coordinator
//! that sequences them into barrier-separated phases.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use webdav_bulk::app::{
//!     parse_target, ClientConfig, Coordinator, Enumerator, RetryConfig, WebDavClient, WorkerConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let base_url = parse_target("https://dav.example.com/backup")?;
//! let client = WebDavClient::connect(&ClientConfig::default(), base_url, None, false).await?;
//! let dispatcher = client.into_dispatcher("/srv/export", RetryConfig::default())?;
//!
//! let coordinator = Coordinator::new(
//!     Enumerator::new("/srv/export"),
//!     Arc::new(dispatcher),
//!     WorkerConfig::default(),
//!     CancellationToken::new(),
//! );
//! let summary = coordinator.run().await?;
//! std::process::exit(summary.exit_code());
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod models;
pub mod queue;
pub mod session;
pub mod walker;
pub mod worker;

// Re-export main public API
pub use client::{ClientConfig, Dispatcher, RetryConfig, WebDavClient};
pub use coordinator::{
    Coordinator, EventSink, FailedTask, Phase, SignalHandler, TransferEvent, TransferSummary,
};
pub use models::{Direction, Task, TaskKind, TaskReport, TaskSuccess};
pub use queue::{task_queue, TaskReceiver, TaskSender};
pub use session::{looks_like_url, parse_target, Session};
pub use walker::Enumerator;
pub use worker::{Dispatched, TaskHandler, WorkerConfig, WorkerPool};
