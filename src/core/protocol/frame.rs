// src/core/protocol/frame.rs

//! Implements the length-prefixed framing used by the protobuf input protocol,
//! as a `tokio_util` codec and as a push-style reassembler.
//!
//! Every frame on the wire is a 4-byte big-endian payload length followed by
//! exactly that many payload bytes.

use crate::core::ProtoServerError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The size of the big-endian length prefix in front of every payload.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default cap on a single payload. A 4K RGB image is just under 25 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Upper bound on how much buffer space a frame header alone can reserve.
/// Larger payloads grow the buffer as their bytes actually arrive.
const MAX_RESERVE_AHEAD: usize = 64 * 1024;

/// A `tokio_util::codec` implementation that splits a byte stream into
/// length-prefixed payloads and prefixes outgoing payloads with their length.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtoServerError;

    /// Removes one complete frame from the front of `src`, leaving any trailing
    /// partial frame in place.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_LEN]);
        let len = u32::from_be_bytes(prefix) as usize;

        // Reject before buffering anything further for this frame.
        if len > self.max_frame_size {
            return Err(ProtoServerError::FrameTooLarge {
                len,
                max: self.max_frame_size,
            });
        }

        let frame_len = LENGTH_PREFIX_LEN + len;
        if src.len() < frame_len {
            src.reserve((frame_len - src.len()).min(MAX_RESERVE_AHEAD));
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtoServerError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode_payload(&item, dst)
    }
}

impl FrameCodec {
    /// Appends one complete frame for `payload` to `dst`. Nothing is written
    /// when the payload is over the cap or does not fit the length prefix.
    fn encode_payload(&self, payload: &[u8], dst: &mut BytesMut) -> Result<(), ProtoServerError> {
        let len = match u32::try_from(payload.len()) {
            Ok(len) if payload.len() <= self.max_frame_size => len,
            _ => {
                return Err(ProtoServerError::FrameTooLarge {
                    len: payload.len(),
                    max: self.max_frame_size,
                });
            }
        };
        dst.reserve(LENGTH_PREFIX_LEN + payload.len());
        dst.put_u32(len);
        dst.extend_from_slice(payload);
        Ok(())
    }
}

/// Accumulates arbitrarily chunked socket reads and yields complete payloads
/// in arrival order.
///
/// The internal buffer holds at most one partial frame between calls to
/// [`FrameReassembler::feed`].
#[derive(Debug, Default)]
pub struct FrameReassembler {
    codec: FrameCodec,
    buffer: BytesMut,
}

impl FrameReassembler {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            codec: FrameCodec::new(max_frame_size),
            buffer: BytesMut::new(),
        }
    }

    /// Appends `chunk` and returns every payload that is now complete.
    ///
    /// A `FrameTooLarge` error is terminal: the buffer is left as it was and the
    /// caller is expected to drop the connection.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, ProtoServerError> {
        self.buffer.extend_from_slice(chunk);
        self.drain()
    }

    /// Splits every complete frame off the front of the buffer.
    fn drain(&mut self) -> Result<Vec<Bytes>, ProtoServerError> {
        let mut payloads = Vec::new();
        while let Some(payload) = self.codec.decode(&mut self.buffer)? {
            payloads.push(payload);
        }
        Ok(payloads)
    }

    /// The number of bytes of the trailing partial frame, if any.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Wraps `payload` in a length prefix, producing a complete wire frame.
/// Applies the same checks as [`FrameCodec`] with the default cap.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, ProtoServerError> {
    let mut dst = BytesMut::new();
    FrameCodec::default().encode_payload(payload, &mut dst)?;
    Ok(dst.freeze())
}
