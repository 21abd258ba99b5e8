//! Authentication for WebDAV requests
//!
//! - [`digest`] implements the HTTP Digest challenge-response engine
//! - [`credentials`] resolves the username and password to answer it with
//!
//! # Examples
//!
//! ```rust,no_run
//! use webdav_bulk::auth::{CredentialSources, resolve_credentials};
//! use url::Url;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://user@dav.example.com/backup")?;
//! let sources = CredentialSources::gather(None, None, &url);
//! if let Some(credentials) = resolve_credentials(sources)? {
//!     println!("Logging in as {}", credentials.username);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod digest;

// Re-export main public API
pub use credentials::{resolve_credentials, strip_userinfo, CredentialSources, Credentials};
pub use digest::{Algorithm, Authorization, Challenge, DigestAuth, NonceCounter};
