//! Task queue between the enumerator and the worker pool
//!
//! A bounded FIFO sized `workers + 10`. The producer blocks when it is full,
//! which keeps the directory walk from racing ahead of the uploads.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use webdav_bulk::app::models::Task;
//! use webdav_bulk::app::queue::task_queue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (sender, receiver) = task_queue(15);
//! sender.send(Task::directory("a")).await?;
//! sender.close();
//!
//! while let Some(task) = receiver.recv().await {
//!     println!("{}", task);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;

#[cfg(test)]
mod tests;

pub use self::core::{task_queue, QueueCounters, TaskReceiver, TaskSender};
