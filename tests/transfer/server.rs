//! Minimal in-process WebDAV stand-in
//!
//! Accepts keep-alive HTTP/1.1 connections, records every request and answers
//! with whatever the test's responder returns. Bodies are read in full, both
//! length-delimited and chunked, before the reply is written.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

/// One request as the server saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Raw request target, still percent-encoded
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("authorization").map(String::as_str)
    }

    /// A single parameter of a Digest `Authorization` header
    pub fn digest_param(&self, name: &str) -> Option<String> {
        let header = self.authorization()?.strip_prefix("Digest ")?;
        digest_params(header).remove(name)
    }
}

/// Status line and challenge headers to send back
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub www_authenticate: Vec<String>,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            www_authenticate: Vec::new(),
        }
    }

    pub fn challenge(header: impl Into<String>) -> Self {
        Self {
            status: 401,
            www_authenticate: vec![header.into()],
        }
    }
}

type Responder = dyn Fn(&Recorded) -> Reply + Send + Sync;

pub struct StubServer {
    addr: SocketAddr,
    log: Arc<Mutex<Vec<Recorded>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let accept_log = Arc::clone(&log);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = Arc::clone(&accept_log);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    let _ = serve(stream, responder, log).await;
                });
            }
        });

        Self { addr, log, handle }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    stream: TcpStream,
    responder: Arc<Responder>,
    log: Arc<Mutex<Vec<Recorded>>>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let chunked = headers
            .get("transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
        let body = if chunked {
            read_chunked(&mut reader).await?
        } else {
            let length = headers
                .get("content-length")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut body = vec![0; length];
            reader.read_exact(&mut body).await?;
            body
        };

        let recorded = Recorded {
            method,
            path,
            headers,
            body,
        };
        let reply = responder(&recorded);
        log.lock().unwrap().push(recorded);

        let mut response = format!("HTTP/1.1 {} Stub\r\n", reply.status);
        for challenge in &reply.www_authenticate {
            response.push_str(&format!("WWW-Authenticate: {}\r\n", challenge));
        }
        response.push_str("Content-Length: 0\r\n\r\n");
        write.write_all(response.as_bytes()).await?;
        write.flush().await?;
    }
}

async fn read_chunked<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).await?;
        let size_hex = size_line.trim().split(';').next().unwrap_or("0");
        let size = usize::from_str_radix(size_hex, 16).unwrap_or(0);

        if size == 0 {
            // trailers end with an empty line
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await? == 0 || line.trim().is_empty() {
                    return Ok(body);
                }
            }
        }

        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..]).await?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf).await?;
    }
}

fn digest_params(header: &str) -> HashMap<String, String> {
    header
        .split(", ")
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

/// Check a qop=auth MD5 Digest answer the way a server would
pub fn digest_is_valid(request: &Recorded, username: &str, password: &str, realm: &str) -> bool {
    let param = |name: &str| request.digest_param(name).unwrap_or_default();
    if param("username") != username || param("realm") != realm || param("uri") != request.path {
        return false;
    }

    let ha1 = format!("{:x}", md5::compute(format!("{}:{}:{}", username, realm, password)));
    let ha2 = format!(
        "{:x}",
        md5::compute(format!("{}:{}", request.method, param("uri")))
    );
    let expected = format!(
        "{:x}",
        md5::compute(format!(
            "{}:{}:{}:{}:{}:{}",
            ha1,
            param("nonce"),
            param("nc"),
            param("cnonce"),
            param("qop"),
            ha2
        ))
    );
    param("response") == expected
}
