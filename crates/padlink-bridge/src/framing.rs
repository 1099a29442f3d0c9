//! Newline-delimited JSON over a byte stream.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Decode one inbound line. Lines that are not JSON objects are not frames
/// at all and yield `None`.
pub fn decode_frame<T: DeserializeOwned>(line: &str) -> Option<serde_json::Result<T>> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    Some(serde_json::from_str(line))
}

pub async fn write_json<T, W>(writer: &mut W, value: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let mut frame = serde_json::to_vec(value).context("serialize JSON failed")?;
    frame.push(b'\n');
    writer.write_all(&frame).await.context("write failed")?;
    writer.flush().await.context("flush failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{FeedbackMessage, PadMessage};

    #[test]
    fn non_object_lines_are_not_frames() {
        assert!(decode_frame::<PadMessage>("ping").is_none());
        assert!(decode_frame::<PadMessage>("").is_none());
        assert!(decode_frame::<PadMessage>("[1,2]").is_none());
    }

    #[test]
    fn malformed_object_is_an_error() {
        assert!(matches!(decode_frame::<PadMessage>("{\"lx\":"), Some(Err(_))));
        assert!(matches!(decode_frame::<PadMessage>("{\"lx\":\"left\"}"), Some(Err(_))));
    }

    #[test]
    fn object_decodes() {
        let msg = decode_frame::<PadMessage>("  {\"lx\":0.5}\r").unwrap().unwrap();
        assert_eq!(msg.lx, 0.5);
    }

    #[tokio::test]
    async fn write_appends_newline() {
        let mut out = Vec::new();
        write_json(&mut out, &FeedbackMessage { lm: 1, sm: 2, led: 3 }).await.unwrap();
        assert_eq!(out, b"{\"lm\":1,\"sm\":2,\"led\":3}\n");
    }
}
