//! HTTP client for the WebDAV server
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client and retry configuration
//! - `auth`: HEAD probe and Digest login
//! - `dispatch`: MKCOL/PUT execution and outcome classification

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::app::session::Session;
use crate::auth::{Credentials, DigestAuth};
use crate::errors::Result;

pub mod auth;
pub mod config;
pub mod dispatch;

pub use auth::AuthHandler;
pub use config::{ClientConfig, RetryConfig};
pub use dispatch::Dispatcher;

/// Authenticated connection to one WebDAV base URL
#[derive(Debug)]
pub struct WebDavClient {
    http: Client,
    base_url: Url,
    digest: Option<DigestAuth>,
}

impl WebDavClient {
    /// Build the HTTP client and run the authentication probe
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be built and
    /// `AppError::Auth` if the probe or the Digest login fails.
    pub async fn connect(
        config: &ClientConfig,
        base_url: Url,
        credentials: Option<&Credentials>,
        expect_digest: bool,
    ) -> Result<Self> {
        let http = config.build_http_client()?;
        let digest = AuthHandler::authenticate(&http, &base_url, credentials, expect_digest).await?;

        if digest.is_none() {
            info!("Server accepted unauthenticated requests");
        }

        Ok(Self {
            http,
            base_url,
            digest,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.digest.is_some()
    }

    /// Turn the connection into a dispatcher for tasks rooted at `local_root`
    pub fn into_dispatcher(
        self,
        local_root: impl Into<PathBuf>,
        retry: RetryConfig,
    ) -> Result<Dispatcher> {
        let session = Arc::new(Session::new(local_root, self.base_url, self.digest));
        Ok(Dispatcher::new(self.http, session, retry)?)
    }
}
