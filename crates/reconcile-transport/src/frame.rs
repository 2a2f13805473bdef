//! Length-prefixed message framing over any `AsyncRead + AsyncWrite`
//! stream: a `u32` little-endian length header followed by that many
//! payload bytes. Every `Send`/`Receive` call in the original protocol
//! (`genSync.Connection`) round-trips exactly one frame.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {0} bytes exceeds the maximum of {1}")]
    TooLarge(u32, u32),
}

/// Frames larger than this are rejected outright rather than allocating
/// an attacker- or bug-controlled buffer.
pub const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

/// Write one length-prefixed frame. Returns the number of bytes written
/// to the wire, including the 4-byte header.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<usize, FrameError> {
    let len = payload.len() as u32;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len, MAX_FRAME_LEN));
    }
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    Ok(4 + payload.len())
}

/// Read one length-prefixed frame. Returns the payload and the number of
/// bytes read from the wire, including the 4-byte header.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(Vec<u8>, usize), FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len, MAX_FRAME_LEN));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok((payload, 4 + len as usize))
}
