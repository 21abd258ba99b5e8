//! Error types for the WebDAV bulk transfer tool
//!
//! Errors are split by how far they reach. Configuration, authentication and
//! enumeration errors abort the whole run. Transfer errors belong to a single
//! task: they are recorded in the run summary and the remaining tasks carry on.

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration errors (bad URL, bad flags, unreadable config file)
#[derive(Error, Debug)]
pub enum ConfigError {
    /// URL could not be parsed
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL scheme other than http or https
    #[error("Unsupported URL scheme '{scheme}'. Only http and https are supported")]
    UnsupportedScheme { scheme: String },

    /// Arguments were given in URL DIRECTORY order
    #[error("Downloading from a WebDAV server is not supported yet. Usage: SOURCE_DIRECTORY WEBDAV_URL")]
    DownloadUnsupported,

    /// Local root is missing or not a directory
    #[error("Local directory not found or not a directory: {path}")]
    LocalRootInvalid { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this tool
    #[error("Invalid configuration file format")]
    InvalidFormat(#[from] toml::de::Error),

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Authentication errors, fatal for the whole run
#[derive(Error, Debug)]
pub enum AuthError {
    /// `WWW-Authenticate` header missing required fields or unparsable
    #[error("Malformed Digest challenge: {reason}")]
    MalformedChallenge { reason: String },

    /// Server asked for a scheme other than Digest
    #[error("Server requested unsupported authentication scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// Challenge named a hash algorithm this client does not implement
    #[error("Unsupported Digest algorithm '{algorithm}'")]
    UnsupportedAlgorithm { algorithm: String },

    /// Challenge offered no quality of protection this client implements
    #[error("Unsupported Digest qop '{qop}'. Only 'auth' is supported")]
    UnsupportedQop { qop: String },

    /// Server answered 401 without a challenge to solve
    #[error("Server returned 401 Unauthorized without a WWW-Authenticate challenge")]
    MissingChallenge,

    /// Server demands authentication but no username was supplied
    #[error("Server requires authentication. Supply -u/-p, URL credentials or WEBDAV_USERNAME/WEBDAV_PASSWORD")]
    MissingCredentials,

    /// Server rejected the computed Digest credentials
    #[error("Login failed with status {status}")]
    CredentialsRejected { status: u16 },

    /// Credentials contain characters that cannot travel in a header
    #[error("Credentials cannot be encoded in an Authorization header")]
    InvalidHeader,

    /// Password prompt failed
    #[error("Failed to read password")]
    Prompt(#[source] std::io::Error),

    /// HTTP request failed during the authentication probe
    #[error("HTTP request failed during authentication")]
    Http(#[from] reqwest::Error),

    /// Initial connectivity probe returned a non-success status
    #[error("Connection failed with status {status}")]
    ProbeFailed { status: u16 },
}

/// Local tree traversal errors, fatal for the whole run
#[derive(Error, Debug)]
pub enum WalkError {
    /// Traversal failed at some entry
    #[error("Failed to walk {path}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Entry path could not be expressed relative to the root
    #[error("Entry {path} is outside the root directory")]
    OutsideRoot { path: PathBuf },

    /// Entry name is not valid UTF-8 and cannot be mapped to a URL
    #[error("Entry name is not valid UTF-8: {path}")]
    NonUtf8Name { path: PathBuf },

    /// The blocking walker task panicked or was aborted
    #[error("Directory walker terminated unexpectedly")]
    WalkerTerminated,
}

/// Errors isolated to a single transfer task
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local file missing or unreadable
    #[error("Local I/O error on {path}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connection failure, timeout or broken body stream
    #[error("Transport error")]
    Transport(#[from] reqwest::Error),

    /// Server answered with an unexpected status
    #[error("Server responded with HTTP {status}")]
    Protocol { status: u16 },

    /// Server reported the Digest nonce as stale
    #[error("Server reported a stale Digest nonce")]
    StaleNonce,

    /// Stamping the request or renewing a stale nonce failed
    #[error("Digest authorization failed")]
    Auth(#[source] AuthError),

    /// A parent collection failed, so this task was never dispatched
    #[error("Parent collection '{parent}' was not created")]
    ParentFailed { parent: String },

    /// Run cancelled before the task was dispatched or retried
    #[error("Cancelled by shutdown request")]
    Cancelled,

    /// Task direction not implemented
    #[error("Unsupported transfer direction")]
    Unsupported,

    /// Task URL could not be derived from the base URL
    #[error("Cannot build URL for {path}")]
    InvalidTarget { path: String },
}

impl TransferError {
    /// Whether a retry with backoff could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Transport(e) => !e.is_builder() && !e.is_redirect(),
            TransferError::Protocol { status } => matches!(status, 429 | 502 | 503 | 504),
            TransferError::StaleNonce => true,
            _ => false,
        }
    }

    /// Short category label for summaries and logs
    pub fn category(&self) -> &'static str {
        match self {
            TransferError::LocalIo { .. } => "local-io",
            TransferError::Transport(_) => "transport",
            TransferError::Protocol { .. } => "protocol",
            TransferError::StaleNonce | TransferError::Auth(_) => "authentication",
            TransferError::ParentFailed { .. } => "parent-failed",
            TransferError::Cancelled => "cancelled",
            TransferError::Unsupported | TransferError::InvalidTarget { .. } => "unsupported",
        }
    }
}

/// Task queue and worker pool errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Every worker exited while tasks were still being produced
    #[error("Task queue closed: no workers left to receive tasks")]
    Closed,

    /// Worker panic or unexpected termination
    #[error("{count} worker(s) panicked or terminated unexpectedly")]
    WorkerPanic { count: usize },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Enumeration error
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// Queue or worker pool error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Transfer error that escaped task isolation
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the error ends the whole run rather than a single task
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::Transfer(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Auth(_) => "authentication",
            AppError::Walk(_) => "enumeration",
            AppError::Queue(_) => "queue",
            AppError::Transfer(e) => e.category(),
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Enumeration result type alias
pub type WalkResult<T> = std::result::Result<T, WalkError>;

/// Queue result type alias
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;
