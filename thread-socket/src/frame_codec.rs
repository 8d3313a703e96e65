// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_sort_core::mailbox::Frame;
use chunk_sort_core::{Rank, Result, SortError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Write one frame as a big-endian u32 length followed by its JSON body
pub async fn write_frame<W>(rank: Rank, stream: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let serialized = serde_json::to_vec(frame)
        .map_err(|e| SortError::transport_with_source(rank, "cannot encode frame", e))?;
    let len = u32::try_from(serialized.len()).map_err(|_| {
        SortError::transport(rank, format!("frame of {} bytes is too large", serialized.len()))
    })?;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| SortError::transport_with_source(rank, "cannot write frame length", e))?;
    stream
        .write_all(&serialized)
        .await
        .map_err(|e| SortError::transport_with_source(rank, "cannot write frame body", e))?;
    stream
        .flush()
        .await
        .map_err(|e| SortError::transport_with_source(rank, "cannot flush frame", e))
}

/// Upper bound on the encoded size of a frame carrying `payload_elements`
/// numbers: at most 11 characters plus a separator per element, and room for
/// the envelope fields.
pub fn frame_limit(payload_elements: usize) -> usize {
    payload_elements.saturating_mul(12).saturating_add(128)
}

/// Read the next frame. Returns `None` when the peer closed the stream
/// cleanly between frames. A length prefix above `max_len` bytes is refused
/// before anything is allocated.
pub async fn read_frame<R>(rank: Rank, stream: &mut R, max_len: usize) -> Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        let read = stream
            .read(&mut len_bytes[filled..])
            .await
            .map_err(|e| SortError::transport_with_source(rank, "cannot read frame length", e))?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(SortError::transport(
                rank,
                format!("stream closed after {} of 4 length bytes", filled),
            ));
        }
        filled += read;
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_len {
        return Err(SortError::protocol(
            rank,
            format!("frame of {} bytes exceeds the {} byte limit", len, max_len),
        ));
    }

    let mut buffer = vec![0u8; len];
    stream
        .read_exact(&mut buffer)
        .await
        .map_err(|e| SortError::transport_with_source(rank, "truncated frame", e))?;

    serde_json::from_slice(&buffer)
        .map(Some)
        .map_err(|e| SortError::protocol(rank, format!("malformed frame: {}", e)))
}
