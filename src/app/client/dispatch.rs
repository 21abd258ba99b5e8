//! Request dispatch: one task becomes one MKCOL or PUT
//!
//! Retryable failures (transport errors, 429/502/503/504, stale nonces) are
//! retried with exponential backoff up to the configured attempt limit. The
//! local file is re-opened for every attempt, so each PUT streams from the
//! start. Once the run is cancelled no further attempt is made; a request
//! already on the wire is allowed to finish.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, Method, Request, Response, StatusCode};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::app::client::auth::AuthHandler;
use crate::app::client::config::RetryConfig;
use crate::app::models::{Direction, Task, TaskKind, TaskSuccess};
use crate::app::session::Session;
use crate::app::worker::{Dispatched, TaskHandler};
use crate::constants::http;
use crate::errors::{ConfigError, ConfigResult, TransferError, TransferResult};

/// Executes tasks against the WebDAV server
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: Client,
    session: Arc<Session>,
    retry: RetryConfig,
    mkcol: Method,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(http: Client, session: Arc<Session>, retry: RetryConfig) -> ConfigResult<Self> {
        let mkcol = Method::from_bytes(http::METHOD_MKCOL).map_err(|e| {
            ConfigError::InvalidValue {
                field: "method".to_string(),
                value: String::from_utf8_lossy(http::METHOD_MKCOL).into_owned(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            http,
            session,
            retry,
            mkcol,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop retrying once `cancel` fires
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a task to completion, retrying where the error allows
    pub async fn execute(&self, task: &Task) -> Dispatched {
        if task.direction() == Direction::Download {
            return Dispatched {
                outcome: Err(TransferError::Unsupported),
                attempts: 0,
            };
        }

        let url = match self.session.task_url(task) {
            Ok(url) => url,
            Err(e) => {
                return Dispatched {
                    outcome: Err(e),
                    attempts: 0,
                }
            }
        };

        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts();

        let url = &url;
        let counter = &attempts;
        let cancel = &self.cancel;
        let operation = move || async move {
            if counter.load(Ordering::SeqCst) > 0 && cancel.is_cancelled() {
                debug!("Not retrying {}: run cancelled", task);
                return Err(backoff::Error::permanent(TransferError::Cancelled));
            }
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            match self.attempt(task, url).await {
                Ok(success) => Ok(success),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        };

        let notify = |err: TransferError, delay: Duration| {
            warn!(
                "{} {} failed: {}. Retrying in {}ms",
                task.kind(),
                task,
                err,
                delay.as_millis()
            );
        };

        let outcome = backoff::future::retry_notify(self.retry.backoff(), operation, notify).await;

        Dispatched {
            outcome,
            attempts: attempts.load(Ordering::SeqCst),
        }
    }

    /// One request, stamped and classified
    async fn attempt(&self, task: &Task, url: &Url) -> TransferResult<TaskSuccess> {
        let (mut request, bytes) = match task.kind() {
            TaskKind::Directory => (
                self.http.request(self.mkcol.clone(), url.clone()).build()?,
                None,
            ),
            TaskKind::File => {
                let (body, len) = self.open_body(task).await?;
                let request = self
                    .http
                    .put(url.clone())
                    .header(CONTENT_LENGTH, len)
                    .body(body)
                    .build()?;
                (request, Some(len))
            }
        };

        if let Some(nc) = self
            .session
            .stamp(&mut request)
            .map_err(TransferError::Auth)?
        {
            debug!("{} {} nc={:08x}", request.method(), url.path(), nc);
        }

        let response = self.send(request).await?;
        self.classify(task, response, bytes)
    }

    async fn send(&self, request: Request) -> TransferResult<Response> {
        Ok(self.http.execute(request).await?)
    }

    /// Stream the local file without reading it into memory
    async fn open_body(&self, task: &Task) -> TransferResult<(Body, u64)> {
        let path = task.local_path(self.session.local_root());
        let local_io = |source| TransferError::LocalIo {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).await.map_err(local_io)?;
        let len = file.metadata().await.map_err(local_io)?.len();
        Ok((Body::wrap_stream(ReaderStream::new(file)), len))
    }

    fn classify(
        &self,
        task: &Task,
        response: Response,
        bytes: Option<u64>,
    ) -> TransferResult<TaskSuccess> {
        let status = response.status();

        if status.is_success() {
            return Ok(match bytes {
                Some(bytes) => TaskSuccess::Uploaded { bytes },
                None => TaskSuccess::Created,
            });
        }

        if task.is_directory() && status == StatusCode::METHOD_NOT_ALLOWED {
            debug!("Collection {} already exists", task);
            return Ok(TaskSuccess::AlreadyExists);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(digest) = self.session.digest() {
                match AuthHandler::extract_challenge(&response) {
                    Ok(challenge) if challenge.stale => {
                        digest.renew(challenge).map_err(TransferError::Auth)?;
                        return Err(TransferError::StaleNonce);
                    }
                    Ok(_) => debug!("Server rejected credentials for {}", task),
                    Err(e) => debug!("Unusable challenge on 401 for {}: {}", task, e),
                }
            }
        }

        Err(TransferError::Protocol {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl TaskHandler for Dispatcher {
    async fn handle(&self, task: &Task) -> Dispatched {
        self.execute(task).await
    }
}
