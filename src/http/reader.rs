use anyhow::bail;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::request::RequestLine;

const READ_CHUNK: usize = 1024;

/// Reads the first line from `stream`.
///
/// Returns `Ok(None)` when the peer closes before sending a single byte. Bytes
/// that arrive before EOF without a newline still count as a line. Lines longer
/// than `max_len` are rejected.
pub async fn read_request_line<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    max_len: usize,
) -> anyhow::Result<Option<RequestLine>>
where
    S: AsyncRead + Unpin,
{
    loop {
        if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            if pos > max_len {
                bail!("request line exceeds {} bytes", max_len);
            }
            let line = buffer.split_to(pos + 1);
            return Ok(Some(decode_line(&line)));
        }

        if buffer.len() > max_len {
            bail!("request line exceeds {} bytes", max_len);
        }

        buffer.reserve(READ_CHUNK);
        let n = stream.read_buf(buffer).await?;

        if n == 0 {
            // Client closed connection
            if buffer.is_empty() {
                return Ok(None);
            }
            let line = buffer.split();
            return Ok(Some(decode_line(&line)));
        }
    }
}

fn decode_line(bytes: &[u8]) -> RequestLine {
    let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    RequestLine::new(String::from_utf8_lossy(line))
}
