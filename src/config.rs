//! Configuration file support
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command-line flags. The file is searched in the working directory and in
//! the user's config directory unless one is named explicitly.
//!
//! ```toml
//! [client]
//! request_timeout = "10m"
//! connect_timeout = "30s"
//!
//! [retry]
//! max_retries = 3
//! base_delay = "500ms"
//!
//! [workers]
//! worker_count = 8
//!
//! [auth]
//! username = "backup"
//! digest = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, RetryConfig, WorkerConfig};
use crate::constants::config as config_constants;
use crate::errors::{ConfigError, ConfigResult};

/// Credentials-related settings; passwords never live in the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Default username when none is given on the command line or URL
    pub username: Option<String>,
    /// Expect the server to demand Digest authentication
    pub digest: bool,
}

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub retry: RetryConfig,
    pub workers: WorkerConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration with precedence defaults < file
    ///
    /// An explicitly named file must exist; the default locations are optional.
    /// Values are validated by the caller once command-line flags are applied.
    pub async fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find a configuration file in the standard locations
    fn find_config_file() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| {
            let found = path.is_file();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(config_constants::LOCAL_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(
                dir.join(config_constants::APP_DIR)
                    .join(config_constants::FILE_NAME),
            );
        }
        paths
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}
