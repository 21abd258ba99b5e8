//! HTTP Digest access authentication (RFC 2617 / RFC 7616)
//!
//! The engine is split into pure pieces and one piece of shared state:
//!
//! - [`Challenge::parse`] reads a `WWW-Authenticate: Digest ...` header
//! - [`Authorization::solve`] merges credentials into a parsed challenge
//! - [`compute_response`] is the keyed hash over the request
//! - [`apply`] stamps an outgoing request with an `Authorization` header
//! - [`DigestAuth`] is the per-run state shared by all workers: the current
//!   authorization plus the nonce counter that belongs to it
//!
//! # Examples
//!
//! ```rust
//! use webdav_bulk::auth::digest::{Authorization, Challenge, compute_response};
//!
//! let challenge = Challenge::parse(r#"Digest realm="test", nonce="abc123", qop="auth""#)?;
//! let auth = Authorization::solve("user", "pass", challenge, "/")?;
//! let response = compute_response("PUT", "/a/x.txt", &auth, 1, "0a4f");
//! assert_eq!(response.len(), 32);
//! # Ok::<(), webdav_bulk::errors::AuthError>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use reqwest::header::{HeaderValue, AUTHORIZATION};
use sha2::{Digest as _, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::constants::digest;
use crate::errors::{AuthError, AuthResult};

/// Hash algorithm named by the challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    /// Parse an `algorithm=` token, case-insensitively
    pub fn parse(token: &str) -> AuthResult<Self> {
        match token.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Algorithm::Md5),
            "MD5-SESS" => Ok(Algorithm::Md5Sess),
            "SHA-256" => Ok(Algorithm::Sha256),
            "SHA-256-SESS" => Ok(Algorithm::Sha256Sess),
            _ => Err(AuthError::UnsupportedAlgorithm {
                algorithm: token.to_string(),
            }),
        }
    }

    /// Wire name of the algorithm
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
            Algorithm::Sha256 => "SHA-256",
            Algorithm::Sha256Sess => "SHA-256-sess",
        }
    }

    /// Session variants fold the nonces into HA1
    pub fn is_session(&self) -> bool {
        matches!(self, Algorithm::Md5Sess | Algorithm::Sha256Sess)
    }

    /// Lowercase hex digest of `data`
    pub fn hash(&self, data: &str) -> String {
        match self {
            Algorithm::Md5 | Algorithm::Md5Sess => format!("{:x}", md5::compute(data.as_bytes())),
            Algorithm::Sha256 | Algorithm::Sha256Sess => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `WWW-Authenticate: Digest` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// Raw `qop` options offered by the server, `None` for RFC 2069 servers
    pub qop: Option<Vec<String>>,
    /// Algorithm as named by the server, `None` if the parameter was absent
    pub algorithm: Option<String>,
    pub stale: bool,
}

impl Challenge {
    /// Parse a single challenge header value
    ///
    /// Fails with [`AuthError::MalformedChallenge`] when `realm` or `nonce` is
    /// missing and with [`AuthError::UnsupportedScheme`] for non-Digest schemes.
    pub fn parse(header: &str) -> AuthResult<Self> {
        let header = header.trim();
        let (scheme, rest) = match header.find(char::is_whitespace) {
            Some(idx) => (&header[..idx], &header[idx..]),
            None => (header, ""),
        };

        if !scheme.eq_ignore_ascii_case(digest::SCHEME) {
            return Err(AuthError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }

        let mut params = parse_params(rest);

        let realm = params
            .remove("realm")
            .ok_or_else(|| AuthError::MalformedChallenge {
                reason: "missing realm".to_string(),
            })?;
        let nonce = params
            .remove("nonce")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AuthError::MalformedChallenge {
                reason: "missing nonce".to_string(),
            })?;

        let qop = params.remove("qop").map(|raw| {
            raw.split(',')
                .map(|q| q.trim().to_ascii_lowercase())
                .filter(|q| !q.is_empty())
                .collect()
        });

        Ok(Self {
            realm,
            nonce,
            opaque: params.remove("opaque"),
            qop,
            algorithm: params.remove("algorithm"),
            stale: params
                .remove("stale")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    /// Pick the Digest challenge out of one or more `WWW-Authenticate` values
    pub fn select<'a, I>(headers: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut first_scheme = None;
        for header in headers {
            match Challenge::parse(header) {
                Err(AuthError::UnsupportedScheme { scheme }) => {
                    first_scheme.get_or_insert(scheme);
                }
                other => return other,
            }
        }

        Err(match first_scheme {
            Some(scheme) => AuthError::UnsupportedScheme { scheme },
            None => AuthError::MissingChallenge,
        })
    }
}

/// Split `key=value, key="quoted, value"` pairs; keys are lowercased
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        let key = key.trim().to_ascii_lowercase();

        if chars.peek() != Some(&'=') {
            // bare token without a value
            continue;
        }
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        if !key.is_empty() {
            params.insert(key, value);
        }
    }

    params
}

/// Quality of protection selected for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    Auth,
}

impl Qop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => digest::QOP_AUTH,
        }
    }
}

/// Challenge parameters plus client credentials
///
/// Immutable once solved; shared read-only by every worker.
#[derive(Clone, PartialEq, Eq)]
pub struct Authorization {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `None` selects the legacy RFC 2069 response without nc/cnonce
    pub qop: Option<Qop>,
    pub algorithm: Algorithm,
    /// Echo `algorithm=` only when the server named one
    pub algorithm_named: bool,
    pub username: String,
    pub password: String,
    /// Request target the challenge was obtained for
    pub uri: String,
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("opaque", &self.opaque)
            .field("qop", &self.qop)
            .field("algorithm", &self.algorithm)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("uri", &self.uri)
            .finish()
    }
}

impl Authorization {
    /// Merge credentials into a parsed challenge
    pub fn solve(
        username: &str,
        password: &str,
        challenge: Challenge,
        uri: impl Into<String>,
    ) -> AuthResult<Self> {
        let algorithm = match challenge.algorithm.as_deref() {
            Some(name) => Algorithm::parse(name)?,
            None => Algorithm::default(),
        };

        let qop = match &challenge.qop {
            None => None,
            Some(options) if options.iter().any(|q| q == digest::QOP_AUTH) => Some(Qop::Auth),
            Some(options) => {
                return Err(AuthError::UnsupportedQop {
                    qop: options.join(","),
                })
            }
        };

        Ok(Self {
            realm: challenge.realm,
            nonce: challenge.nonce,
            opaque: challenge.opaque,
            qop,
            algorithm,
            algorithm_named: challenge.algorithm.is_some(),
            username: username.to_string(),
            password: password.to_string(),
            uri: uri.into(),
        })
    }
}

/// Compute the Digest `response` value
///
/// Pure: the same inputs always produce the same digest.
pub fn compute_response(
    method: &str,
    request_uri: &str,
    auth: &Authorization,
    nonce_count: u64,
    client_nonce: &str,
) -> String {
    let h = |data: &str| auth.algorithm.hash(data);

    let mut ha1 = h(&format!("{}:{}:{}", auth.username, auth.realm, auth.password));
    if auth.algorithm.is_session() {
        ha1 = h(&format!("{}:{}:{}", ha1, auth.nonce, client_nonce));
    }
    let ha2 = h(&format!("{}:{}", method, request_uri));

    match auth.qop {
        Some(qop) => h(&format!(
            "{}:{}:{}:{}:{}:{}",
            ha1,
            auth.nonce,
            format_nonce_count(nonce_count),
            client_nonce,
            qop.as_str(),
            ha2
        )),
        None => h(&format!("{}:{}:{}", ha1, auth.nonce, ha2)),
    }
}

/// `nc` wire format: eight lowercase hex digits
pub fn format_nonce_count(nonce_count: u64) -> String {
    format!("{:08x}", nonce_count)
}

/// Fresh random client nonce
pub fn generate_cnonce() -> String {
    let bytes: [u8; digest::CNONCE_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Build the full `Authorization` header value
pub fn authorization_header(
    method: &str,
    request_uri: &str,
    auth: &Authorization,
    nonce_count: u64,
    client_nonce: &str,
) -> String {
    let response = compute_response(method, request_uri, auth, nonce_count, client_nonce);

    let mut header = format!(
        r#"{} username="{}", realm="{}", nonce="{}", uri="{}""#,
        digest::SCHEME,
        quote(&auth.username),
        quote(&auth.realm),
        quote(&auth.nonce),
        quote(request_uri),
    );
    if auth.algorithm_named {
        header.push_str(&format!(", algorithm={}", auth.algorithm));
    }
    if let Some(qop) = auth.qop {
        header.push_str(&format!(
            r#", qop={}, nc={}, cnonce="{}""#,
            qop.as_str(),
            format_nonce_count(nonce_count),
            quote(client_nonce)
        ));
    }
    header.push_str(&format!(r#", response="{}""#, response));
    if let Some(opaque) = &auth.opaque {
        header.push_str(&format!(r#", opaque="{}""#, quote(opaque)));
    }
    header
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Request target (`path?query`) as it appears in the request line
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Stamp an outgoing request with a Digest `Authorization` header
pub fn apply(
    request: &mut reqwest::Request,
    auth: &Authorization,
    nonce_count: u64,
) -> AuthResult<()> {
    let uri = request_target(request.url());
    let cnonce = generate_cnonce();
    let value = authorization_header(request.method().as_str(), &uri, auth, nonce_count, &cnonce);
    let value = HeaderValue::from_str(&value).map_err(|_| AuthError::InvalidHeader)?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

/// Monotonic per-nonce request counter
#[derive(Debug, Default)]
pub struct NonceCounter(AtomicU64);

impl NonceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically increment and return the new value; the first call yields 1
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct NonceState {
    authorization: Authorization,
    counter: NonceCounter,
}

/// Digest state shared by every worker in a run
///
/// Holds the active authorization together with the counter for its nonce.
/// A stale-nonce renewal swaps both at once, so a counter is never carried
/// over to a different nonce.
#[derive(Debug)]
pub struct DigestAuth {
    state: RwLock<Arc<NonceState>>,
}

impl DigestAuth {
    pub fn new(authorization: Authorization) -> Self {
        Self {
            state: RwLock::new(Arc::new(NonceState {
                authorization,
                counter: NonceCounter::new(),
            })),
        }
    }

    fn current(&self) -> Arc<NonceState> {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Snapshot of the active authorization
    pub fn authorization(&self) -> Authorization {
        self.current().authorization.clone()
    }

    /// Last nonce count issued against the active nonce
    pub fn nonce_count(&self) -> u64 {
        self.current().counter.current()
    }

    /// Stamp a request, taking the next counter value for the active nonce
    pub fn stamp(&self, request: &mut reqwest::Request) -> AuthResult<u64> {
        let state = self.current();
        let nc = state.counter.next();
        apply(request, &state.authorization, nc)?;
        Ok(nc)
    }

    /// Re-solve a fresh challenge after the server flagged the nonce stale
    ///
    /// Returns `false` when another worker already installed this nonce.
    pub fn renew(&self, challenge: Challenge) -> AuthResult<bool> {
        let mut guard = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.authorization.nonce == challenge.nonce {
            return Ok(false);
        }

        let previous = &guard.authorization;
        let authorization = Authorization::solve(
            &previous.username,
            &previous.password,
            challenge,
            previous.uri.clone(),
        )?;

        debug!(
            "Replacing Digest nonce after {} requests",
            guard.counter.current()
        );
        *guard = Arc::new(NonceState {
            authorization,
            counter: NonceCounter::new(),
        });
        info!("Renewed Digest authorization after stale nonce");
        Ok(true)
    }
}
