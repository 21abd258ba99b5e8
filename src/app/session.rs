//! Per-run session context
//!
//! The session is built once after authentication and shared read-only by
//! every worker. The only mutable state it reaches is the nonce counter inside
//! [`DigestAuth`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::app::models::Task;
use crate::auth::DigestAuth;
use crate::errors::{AuthResult, ConfigError, ConfigResult, TransferError, TransferResult};

/// Immutable run context: where files come from and where they go
#[derive(Debug)]
pub struct Session {
    local_root: PathBuf,
    base_url: Url,
    digest: Option<Arc<DigestAuth>>,
}

impl Session {
    pub fn new(local_root: impl Into<PathBuf>, base_url: Url, digest: Option<DigestAuth>) -> Self {
        Self {
            local_root: local_root.into(),
            base_url,
            digest: digest.map(Arc::new),
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Active Digest state, if the server challenged us
    pub fn digest(&self) -> Option<&DigestAuth> {
        self.digest.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.digest.is_some()
    }

    /// Remote URL for a task: base URL plus each path segment, percent-encoded
    pub fn task_url(&self, task: &Task) -> TransferResult<Url> {
        join_segments(&self.base_url, task.segments()).ok_or_else(|| {
            TransferError::InvalidTarget {
                path: task.path().to_string(),
            }
        })
    }

    /// Stamp a request when Digest is active; returns the nonce count used
    pub fn stamp(&self, request: &mut reqwest::Request) -> AuthResult<Option<u64>> {
        match &self.digest {
            Some(digest) => digest.stamp(request).map(Some),
            None => Ok(None),
        }
    }
}

fn join_segments<'a>(base: &Url, segments: impl Iterator<Item = &'a str>) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

/// Parse and validate the remote base URL
///
/// Only `http` and `https` are accepted. A trailing slash is dropped so task
/// paths join as `base/path`.
pub fn parse_target(raw: &str) -> ConfigResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ConfigError::UnsupportedScheme {
                scheme: scheme.to_string(),
            })
        }
    }

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }

    if url.path().len() > 1 && url.path().ends_with('/') {
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

/// Whether a positional argument names a remote location rather than a path
pub fn looks_like_url(raw: &str) -> bool {
    matches!(Url::parse(raw), Ok(url) if !url.cannot_be_a_base() && url.has_host())
}
