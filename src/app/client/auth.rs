//! Session authentication against the WebDAV server
//!
//! The base URL is probed once with `HEAD`. A `401` carrying a Digest
//! challenge is solved with the resolved credentials and re-probed with the
//! computed header; only a `2xx` on that second probe opens the session.

use reqwest::header::WWW_AUTHENTICATE;
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::digest::request_target;
use crate::auth::{Authorization, Challenge, Credentials, DigestAuth};
use crate::errors::{AuthError, AuthResult};

/// Handles the connectivity probe and Digest login
pub struct AuthHandler;

impl AuthHandler {
    /// Probe the server and authenticate if it challenges
    ///
    /// Returns `None` when the server accepted the unauthenticated probe.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - The probe request fails or answers with a non-2xx, non-401 status
    /// - A 401 carries no challenge, or a challenge this client cannot solve
    /// - The server challenges but no credentials were supplied
    /// - The re-probe with the computed Digest header is not a 2xx
    pub async fn authenticate(
        client: &Client,
        base_url: &Url,
        credentials: Option<&Credentials>,
        expect_digest: bool,
    ) -> AuthResult<Option<DigestAuth>> {
        info!("Probing {}", base_url);
        let response = client.head(base_url.clone()).send().await?;
        let status = response.status();
        debug!("Probe response status: {}", status);

        if status.is_success() {
            if expect_digest {
                warn!("Digest authentication requested but the server did not challenge");
            }
            return Ok(None);
        }

        if status != StatusCode::UNAUTHORIZED {
            return Err(AuthError::ProbeFailed {
                status: status.as_u16(),
            });
        }

        let challenge = Self::extract_challenge(&response)?;
        let credentials = credentials.ok_or(AuthError::MissingCredentials)?;
        info!(
            "Server requested Digest authentication for realm \"{}\"",
            challenge.realm
        );

        let authorization = Authorization::solve(
            &credentials.username,
            &credentials.password,
            challenge,
            request_target(base_url),
        )?;
        let digest = DigestAuth::new(authorization);

        Self::verify_authentication(client, base_url, &digest).await?;
        info!("Authenticated as {}", credentials.username);

        Ok(Some(digest))
    }

    /// Parse the Digest challenge out of every `WWW-Authenticate` header
    pub fn extract_challenge(response: &Response) -> AuthResult<Challenge> {
        let headers = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok());
        Challenge::select(headers)
    }

    /// Re-probe with the computed header; the first request against the nonce
    async fn verify_authentication(
        client: &Client,
        base_url: &Url,
        digest: &DigestAuth,
    ) -> AuthResult<()> {
        let mut request = client.request(Method::HEAD, base_url.clone()).build()?;
        let nc = digest.stamp(&mut request)?;
        debug!("Re-probing with nc={:08x}", nc);

        let response = client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthError::CredentialsRejected {
                status: status.as_u16(),
            })
        }
    }
}
