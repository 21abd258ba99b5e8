//! Credential resolution for WebDAV authentication
//!
//! Credentials may come from command-line flags, the URL userinfo component
//! or the environment (a `.env` file is loaded at startup). Flags win over the
//! URL, which wins over the environment.

use std::env;
use std::fmt;

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use url::Url;

use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

/// Username and password for the WebDAV server
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Every place a credential can come from, before precedence is applied
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub flag_username: Option<String>,
    pub flag_password: Option<String>,
    pub url_username: Option<String>,
    pub url_password: Option<String>,
    pub env_username: Option<String>,
    pub env_password: Option<String>,
}

impl CredentialSources {
    /// Collect sources from flags, the URL userinfo and the environment
    pub fn gather(flag_username: Option<String>, flag_password: Option<String>, url: &Url) -> Self {
        let url_username = Some(decode_userinfo(url.username())).filter(|u| !u.is_empty());
        let url_password = url.password().map(decode_userinfo);

        Self {
            flag_username,
            flag_password,
            url_username,
            url_password,
            env_username: env::var(env_constants::USERNAME).ok(),
            env_password: env::var(env_constants::PASSWORD).ok(),
        }
    }

    /// Apply precedence; the password is `None` when no source supplied one
    pub fn resolve(self) -> Option<(String, Option<String>)> {
        let username = self
            .flag_username
            .or(self.url_username)
            .or(self.env_username)
            .filter(|u| !u.is_empty())?;
        let password = self
            .flag_password
            .or(self.url_password)
            .or(self.env_password);
        Some((username, password))
    }
}

/// Resolve credentials, prompting for a missing password on a terminal
///
/// Returns `Ok(None)` when no username is known at all.
pub fn resolve_credentials(sources: CredentialSources) -> AuthResult<Option<Credentials>> {
    let Some((username, password)) = sources.resolve() else {
        debug!("No WebDAV credentials supplied");
        return Ok(None);
    };

    let password = match password {
        Some(password) => password,
        None if atty::is(atty::Stream::Stdin) => {
            rpassword::prompt_password(format!("Password for {}: ", username))
                .map_err(AuthError::Prompt)?
        }
        None => {
            warn!("No password supplied for {}, using an empty password", username);
            String::new()
        }
    };

    Ok(Some(Credentials { username, password }))
}

/// Copy of `url` without userinfo, so credentials never reach logs or requests
pub fn strip_userinfo(url: &Url) -> Url {
    let mut stripped = url.clone();
    // Only fails for cannot-be-a-base URLs, which never carry userinfo
    let _ = stripped.set_username("");
    let _ = stripped.set_password(None);
    stripped
}

fn decode_userinfo(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}
