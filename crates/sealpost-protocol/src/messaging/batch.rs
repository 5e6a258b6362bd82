//! Batch stream codec: `(u64 BE length | payload)*`, used when the relay
//! returns several envelopes in one response.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

pub const LENGTH_PREFIX_LEN: usize = 8;

pub fn join<F: AsRef<[u8]>>(frames: &[F]) -> Vec<u8> {
    let total = frames
        .iter()
        .map(|f| LENGTH_PREFIX_LEN + f.as_ref().len())
        .sum();
    let mut out = Vec::with_capacity(total);
    for frame in frames {
        let frame = frame.as_ref();
        out.put_u64(frame.len() as u64);
        out.put_slice(frame);
    }
    out
}

pub fn split(data: &[u8]) -> Result<Vec<Vec<u8>>, ProtocolError> {
    split_limited(data, u64::MAX)
}

/// [`split`], rejecting any frame whose declared length exceeds `max_frame_len`.
pub fn split_limited(mut data: &[u8], max_frame_len: u64) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let mut frames = Vec::new();
    while data.has_remaining() {
        if data.remaining() < LENGTH_PREFIX_LEN {
            return Err(ProtocolError::TruncatedFrame {
                declared: LENGTH_PREFIX_LEN as u64,
                remaining: data.remaining(),
            });
        }
        let declared = data.get_u64();
        let remaining = data.remaining();
        if declared > max_frame_len || declared > remaining as u64 {
            return Err(ProtocolError::TruncatedFrame {
                declared,
                remaining,
            });
        }
        // Bounded by `remaining` above.
        let len = declared as usize;
        tracing::trace!(len, "batch frame");
        frames.push(data[..len].to_vec());
        data.advance(len);
    }
    Ok(frames)
}
