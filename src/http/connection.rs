use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::config::Config;
use crate::fortune::{ArtRenderer, FortunePage, TextSource};
use crate::http::reader::read_request_line;
use crate::http::request::RequestLine;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Per-connection limits.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_request_line: usize,
    pub read_timeout: Duration,
    pub generate_timeout: Duration,
    pub write_timeout: Duration,
    /// How long to keep draining input after the write side is shut down.
    pub linger: Duration,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_request_line: cfg.server.max_request_line,
            read_timeout: cfg.timeouts.read(),
            generate_timeout: cfg.timeouts.generate(),
            write_timeout: cfg.timeouts.write(),
            linger: cfg.timeouts.linger(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub enum ConnectionState {
    Reading,
    Generating(RequestLine),
    Writing {
        writer: ResponseWriter,
        status: StatusCode,
        content_length: usize,
    },
    Closed,
}

/// How a connection ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// A full response was written: `bytes` on the wire, of which
    /// `content_length` are body.
    Served {
        status: StatusCode,
        content_length: usize,
        bytes: usize,
    },
    /// The peer closed before sending anything.
    NoRequest,
}

/// Serves exactly one request on one stream.
pub struct Connection<S, T, R> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    page: Arc<FortunePage<T, R>>,
    settings: ConnectionSettings,
}

impl<S, T, R> Connection<S, T, R>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: TextSource,
    R: ArtRenderer,
{
    pub fn new(stream: S, page: Arc<FortunePage<T, R>>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(1024),
            state: ConnectionState::Reading,
            page,
            settings,
        }
    }

    /// Runs the connection to completion and closes it.
    ///
    /// On error nothing, or only part of an already framed response, has been
    /// written. A response is never started before its body exists.
    pub async fn run(mut self) -> anyhow::Result<ConnectionOutcome> {
        let result = self.drive().await;
        self.close().await;
        result
    }

    async fn drive(&mut self) -> anyhow::Result<ConnectionOutcome> {
        let mut outcome = ConnectionOutcome::NoRequest;

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    let line = timeout(
                        self.settings.read_timeout,
                        read_request_line(
                            &mut self.stream,
                            &mut self.buffer,
                            self.settings.max_request_line,
                        ),
                    )
                    .await
                    .context("timed out waiting for request line")??;

                    if let Some(line) = line {
                        tracing::debug!(
                            method = ?line.method,
                            path = ?line.path,
                            raw = %line.raw,
                            "Request line received"
                        );
                        self.state = ConnectionState::Generating(line);
                    }
                }

                ConnectionState::Generating(_line) => {
                    let body = timeout(self.settings.generate_timeout, self.page.body())
                        .await
                        .context("timed out generating fortune")??;

                    let response = Response::html(body);
                    self.state = ConnectionState::Writing {
                        writer: ResponseWriter::new(&response),
                        status: response.status,
                        content_length: response.content_length(),
                    };
                }

                ConnectionState::Writing {
                    mut writer,
                    status,
                    content_length,
                } => {
                    timeout(
                        self.settings.write_timeout,
                        writer.write_to_stream(&mut self.stream),
                    )
                    .await
                    .context("timed out writing response")??;

                    outcome = ConnectionOutcome::Served {
                        status,
                        content_length,
                        bytes: writer.written(),
                    };
                }

                ConnectionState::Closed => return Ok(outcome),
            }
        }
    }

    /// Shuts down the write side, then discards input until the peer closes
    /// or the linger period ends. Unread input at close turns the FIN into a RST.
    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;

        if self.settings.linger.is_zero() {
            return;
        }

        let stream = &mut self.stream;
        let _ = timeout(self.settings.linger, async {
            let mut sink = [0u8; 1024];
            loop {
                match stream.read(&mut sink).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
    }
}
