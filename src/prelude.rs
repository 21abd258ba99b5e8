//! Prelude module for the WebDAV bulk uploader library
//!
//! Re-exports the items needed to drive a transfer with a single
//! `use webdav_bulk::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use webdav_bulk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let base_url = parse_target("https://dav.example.com/backup")?;
//!     let client = WebDavClient::connect(&ClientConfig::default(), base_url, None, false).await?;
//!     let dispatcher = client.into_dispatcher("/srv/export", RetryConfig::default())?;
//!     let summary = Coordinator::new(
//!         Enumerator::new("/srv/export"),
//!         Arc::new(dispatcher),
//!         WorkerConfig::default(),
//!         CancellationToken::new(),
//!     )
//!     .run()
//!     .await?;
//!     println!("{}", summary.render_text());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline components
pub use crate::app::{
    parse_target, ClientConfig, Coordinator, Dispatcher, Enumerator, RetryConfig, Task,
    TaskHandler, TransferSummary, WebDavClient, WorkerConfig,
};

// Authentication
pub use crate::auth::{resolve_credentials, CredentialSources, Credentials};

// Standard library and runtime re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;
pub use tokio;
pub use tokio_util::sync::CancellationToken;
