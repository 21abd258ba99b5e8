//! Application constants for the WebDAV bulk transfer tool
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for credentials
pub mod env {
    /// Environment variable name for the WebDAV username
    pub const USERNAME: &str = "WEBDAV_USERNAME";

    /// Environment variable name for the WebDAV password
    pub const PASSWORD: &str = "WEBDAV_PASSWORD";
}

/// HTTP Digest authentication constants
pub mod digest {
    /// Authentication scheme name in challenges and credentials
    pub const SCHEME: &str = "Digest";

    /// The only quality of protection this client offers
    pub const QOP_AUTH: &str = "auth";

    /// Number of random bytes in a client nonce (hex encoded on the wire)
    pub const CNONCE_BYTES: usize = 8;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("webdav-bulk/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout (uploads can be large)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// WebDAV method for collection creation
    pub const METHOD_MKCOL: &[u8] = b"MKCOL";
}

/// Retry configuration for transient failures
pub mod limits {
    use super::Duration;

    /// Maximum retry attempts for a task after its first attempt
    pub const MAX_RETRIES: u32 = 3;

    /// Initial backoff delay
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

    /// Upper bound for a single backoff delay
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
}

/// Worker pool and queue constants
pub mod workers {
    /// Default number of concurrent workers
    pub const DEFAULT_WORKER_COUNT: usize = 5;

    /// Maximum allowed worker count
    pub const MAX_WORKER_COUNT: usize = 256;

    /// Extra queue slots beyond one per worker
    pub const QUEUE_SLACK: usize = 10;

    /// Buffer size for worker event channels
    pub const EVENT_BUFFER_SIZE: usize = 256;
}

/// Configuration file discovery
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE: &str = "webdav-bulk.toml";

    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "webdav-bulk";

    /// File name inside the user's config dir
    pub const FILE_NAME: &str = "config.toml";
}

/// Process exit codes
pub mod exit {
    /// Every task succeeded
    pub const SUCCESS: i32 = 0;

    /// The run completed but at least one task failed
    pub const TASKS_FAILED: i32 = 1;

    /// Configuration, authentication or enumeration aborted the run
    pub const FATAL: i32 = 2;
}

/// Re-export commonly used constants at module level
pub use env::{PASSWORD as ENV_PASSWORD, USERNAME as ENV_USERNAME};
pub use http::USER_AGENT;
pub use workers::DEFAULT_WORKER_COUNT;
