//! Shared utilities for connection and server tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wisecow::config::Config;
use wisecow::fortune::{ArtRenderer, BuiltinCow, FortunePage, TextSource};
use wisecow::server::Server;

/// Text source whose availability can be toggled, standing in for a
/// `fortune` binary that is removed and restored.
#[derive(Clone)]
pub struct SwitchableSource {
    pub available: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

impl SwitchableSource {
    pub fn new(available: bool) -> Self {
        Self {
            available: Arc::new(AtomicBool::new(available)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl TextSource for SwitchableSource {
    async fn next(&self) -> anyhow::Result<Vec<u8>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            anyhow::bail!("fortune: command not found");
        }
        Ok(format!("Fortune number {}", n).into_bytes())
    }
}

/// Renderer that always fails.
#[allow(dead_code)]
pub struct BrokenRenderer;

impl ArtRenderer for BrokenRenderer {
    async fn render(&self, _text: &[u8]) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("cowsay exited with status 1")
    }
}

#[allow(dead_code)]
pub fn cow_page(source: SwitchableSource) -> FortunePage<SwitchableSource, BuiltinCow> {
    FortunePage::new(source, BuiltinCow::default())
}

/// A response split into its parts.
#[allow(dead_code)]
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl RawResponse {
    pub fn parse(bytes: &[u8]) -> Self {
        let end = bytes
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has a header terminator");
        let head = std::str::from_utf8(&bytes[..end]).expect("headers are UTF-8");
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap().to_string();
        let headers = lines
            .map(|line| {
                let (k, v) = line.split_once(':').expect("header has a colon");
                (k.trim().to_string(), v.trim().to_string())
            })
            .collect();

        Self {
            status_line,
            headers,
            body: bytes[end + 4..].to_vec(),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).expect("body is UTF-8")
    }

    /// Checks the framing every served response must have.
    pub fn assert_well_formed(&self) {
        assert_eq!(self.status_line, "HTTP/1.1 200 OK");
        assert_eq!(self.header("Content-Type"), Some("text/html; charset=UTF-8"));
        assert_eq!(self.header("Connection"), Some("close"));
        let length: usize = self.header("Content-Length").unwrap().parse().unwrap();
        assert_eq!(length, self.body.len());
        assert!(self.body_str().starts_with("<pre>"));
        assert!(self.body_str().ends_with("</pre>"));
    }
}

/// Binds a server on an ephemeral port and serves in the background.
#[allow(dead_code)]
pub async fn start_server<T, R>(max_in_flight: usize, page: FortunePage<T, R>) -> SocketAddr
where
    T: TextSource + 'static,
    R: ArtRenderer + 'static,
{
    let mut cfg = Config::default();
    cfg.server.listen_addr = "127.0.0.1:0".to_string();
    cfg.server.max_in_flight = max_in_flight;
    cfg.timeouts.read_secs = 5;

    let server = Server::bind(&cfg, page).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Sends one request line and reads until the server closes.
#[allow(dead_code)]
pub async fn fetch(addr: SocketAddr) -> std::io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}
