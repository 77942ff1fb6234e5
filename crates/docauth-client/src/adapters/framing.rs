//! Length-prefixed JSON framing over any byte stream.
//!
//! Each frame is a 4-byte big-endian body length followed by a JSON body.

use crate::ports::TransportError;
use docauth_types::EngineFrame;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame body size. Results with processed images can be large.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024; // 64 MiB

/// Serialize `value` and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(value).map_err(|e| TransportError::Codec(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let len_bytes = (body.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// Returns `Ok(None)` when the stream ends cleanly before a new frame.
/// A body that fails to decode is consumed entirely and reported as
/// [`TransportError::Codec`], leaving the stream at the next frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let Some(body) = read_body(reader).await? else {
        return Ok(None);
    };
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| TransportError::Codec(e.to_string()))
}

/// Read one engine frame.
///
/// Like [`read_frame`], except that a `completed` or `failed` body which
/// names a request but does not decode is reported as
/// [`TransportError::InvalidResponse`] so the request can be failed.
pub async fn read_engine_frame<R>(reader: &mut R) -> Result<Option<EngineFrame>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let Some(body) = read_body(reader).await? else {
        return Ok(None);
    };
    decode_engine_frame(&body).map(Some)
}

fn decode_engine_frame(body: &[u8]) -> Result<EngineFrame, TransportError> {
    serde_json::from_slice(body).map_err(|e| {
        let answered = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|raw| EngineFrame::answered_request(&raw));
        match answered {
            Some(request_id) => TransportError::InvalidResponse {
                request_id,
                reason: e.to_string(),
            },
            None => TransportError::Codec(e.to_string()),
        }
    })
}

async fn read_body<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let body_len = u32::from_be_bytes(len_buf) as usize;
    if body_len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: body_len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
