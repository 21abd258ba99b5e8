//! WebDAV Bulk Uploader Library
//!
//! Mirrors a local directory tree onto a WebDAV server with MKCOL and PUT,
//! using a pool of concurrent workers and optional HTTP Digest authentication.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
