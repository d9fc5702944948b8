//! Frame codec for length-prefixed JSON messages.
//!
//! Socket streams have no message boundaries, so we use a simple framing
//! format:
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────┐
//! │  4 bytes (BE)    │          N bytes                          │
//! │  Frame Length    │          JSON Payload                     │
//! └──────────────────┴───────────────────────────────────────────┘
//! ```

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace};

/// Maximum frame size (64 KiB). Queries and replies are tiny; anything
/// larger is a protocol violation.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Read a length-prefixed JSON frame from the stream.
///
/// Returns `Ok(Some(message))` on success, `Ok(None)` if the stream is
/// closed at a frame boundary, or `Err` on error.
pub async fn read_frame<R, M>(reader: &mut R) -> Result<Option<M>>
where
    R: AsyncReadExt + Unpin,
    M: DeserializeOwned,
{
    // Read the 4-byte length prefix
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            // Stream closed
            return Ok(None);
        }
        Err(e) => {
            return Err(e).context("Failed to read frame length");
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    trace!(length = len, "Reading frame payload");

    if len > MAX_FRAME_SIZE {
        return Err(anyhow!(
            "Frame too large: {} bytes (max {})",
            len,
            MAX_FRAME_SIZE
        ));
    }

    // Read the payload
    let mut payload_buf = vec![0u8; len];
    reader
        .read_exact(&mut payload_buf)
        .await
        .context("Failed to read frame payload")?;

    let message = serde_json::from_slice(&payload_buf).context("Failed to decode frame")?;

    debug!(length = len, "Frame received and decoded");
    Ok(Some(message))
}

/// Write a length-prefixed JSON frame to the stream.
pub async fn write_frame<W, M>(writer: &mut W, message: &M) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    M: Serialize,
{
    let payload = serde_json::to_vec(message).context("Failed to encode frame")?;
    let len = payload.len();

    trace!(length = len, "Writing frame");

    if len > MAX_FRAME_SIZE {
        return Err(anyhow!(
            "Frame too large: {} bytes (max {})",
            len,
            MAX_FRAME_SIZE
        ));
    }

    // Write the length prefix
    let len_bytes = (len as u32).to_be_bytes();
    writer
        .write_all(&len_bytes)
        .await
        .context("Failed to write frame length")?;

    // Write the payload
    writer
        .write_all(&payload)
        .await
        .context("Failed to write frame payload")?;

    // Flush to ensure delivery
    writer.flush().await.context("Failed to flush frame")?;

    debug!(length = len, "Frame written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memvitals_proto::{ErrorPayload, MethodCall, Reply, METHOD_GET_MEMORY_USAGE};
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_roundtrip() {
        let original = MethodCall::new("test-123", METHOD_GET_MEMORY_USAGE);

        // Write to buffer
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &original).await.unwrap();

        // Read back
        let mut reader = BufReader::new(Cursor::new(buffer));
        let decoded: MethodCall = read_frame(&mut reader).await.unwrap().unwrap();

        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn test_reply_roundtrip() {
        let original = Reply::error("q-7", ErrorPayload::memory("counters unavailable"));

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &original).await.unwrap();

        let mut reader = BufReader::new(Cursor::new(buffer));
        let decoded: Reply = read_frame(&mut reader).await.unwrap().unwrap();

        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let buffer: Vec<u8> = Vec::new();
        let mut reader = BufReader::new(Cursor::new(buffer));
        let result: Option<MethodCall> = read_frame(&mut reader).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&((MAX_FRAME_SIZE as u32) + 1).to_be_bytes());

        let mut reader = BufReader::new(Cursor::new(buffer));
        let result: Result<Option<MethodCall>> = read_frame(&mut reader).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_error() {
        // Length prefix promises 100 bytes but only 3 follow.
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&100u32.to_be_bytes());
        buffer.extend_from_slice(b"abc");

        let mut reader = BufReader::new(Cursor::new(buffer));
        let result: Result<Option<MethodCall>> = read_frame(&mut reader).await;
        assert!(result.is_err());
    }
}
