//! `Content-Length` header framing used by the RSP server.
//!
//! Each message is a header block terminated by an empty line, followed by
//! exactly `Content-Length` bytes of UTF-8 JSON:
//!
//! ```text
//! Content-Length: 52\r\n
//! \r\n
//! {"jsonrpc":"2.0","method":"client/serverAdded",...}
//! ```
use crate::error::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const CONTENT_LENGTH: &str = "content-length";

/// Upper bound for a single frame body.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Prefix a message body with its header block.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Read one frame body.
///
/// Returns `Ok(None)` on a clean end of stream between frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            if saw_header {
                return Err(Error::Transport(
                    "Connection closed inside a frame header".to_string(),
                ));
            }
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            if saw_header {
                break;
            }
            // stray blank line between frames
            continue;
        }
        saw_header = true;

        if let Some((name, value)) = trimmed.split_once(':') {
            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
                let length = value.trim().parse::<usize>().map_err(|e| {
                    Error::Transport(format!("Invalid Content-Length '{}': {}", value.trim(), e))
                })?;
                content_length = Some(length);
            }
        } else {
            return Err(Error::Transport(format!("Malformed header line '{}'", trimmed)));
        }
    }

    let length = content_length
        .ok_or_else(|| Error::Transport("Frame without Content-Length header".to_string()))?;
    if length > MAX_FRAME_LEN {
        return Err(Error::Transport(format!(
            "Frame of {} bytes exceeds the {} byte limit",
            length, MAX_FRAME_LEN
        )));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_reads_consecutive_frames() {
        let mut bytes = encode_frame(br#"{"a":1}"#);
        bytes.extend(encode_frame(br#"{"b":2}"#));
        let mut reader = BufReader::new(bytes.as_slice());

        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), br#"{"a":1}"#);
        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), br#"{"b":2}"#);
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extra_headers_are_ignored() {
        let raw = b"Content-Type: application/vscode-jsonrpc; charset=utf-8\r\ncontent-length: 2\r\n\r\n{}";
        let mut reader = BufReader::new(&raw[..]);
        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_missing_length_is_an_error() {
        let raw = b"Content-Type: text/plain\r\n\r\n{}";
        let mut reader = BufReader::new(&raw[..]);
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        let raw = b"Content-Length: 10\r\n\r\n{}";
        let mut reader = BufReader::new(&raw[..]);
        assert!(read_frame(&mut reader).await.is_err());
    }
}
