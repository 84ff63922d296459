//! Record Data Structure
//!
//! A record is the unit of data in a loghouse log: an opaque byte payload
//! plus the absolute offset the log assigned to it at append time.
//!
//! ## Structure
//! - **offset**: Monotonically increasing, log-global, assigned by the log.
//!   The caller never chooses it; an offset supplied on the wire is
//!   overwritten at append time.
//! - **value**: The payload. The log never interprets it.
//!
//! ## On-disk frame
//!
//! On the store file a record occupies one frame:
//!
//! ```text
//! ┌──────────────────┬───────────────┐
//! │ Length           │ Payload       │
//! │ (8 bytes, BE)    │ (N bytes)     │
//! └──────────────────┴───────────────┘
//! ```
//!
//! [`encode_frame`] is the only place the length prefix is written;
//! `Store::read` is the only place it is read back.
//!
//! Uses `bytes::Bytes` for the payload so clones and slices are zero-copy.

use bytes::{BufMut, Bytes, BytesMut};

/// Width of the big-endian length prefix on every store frame.
pub const LEN_WIDTH: usize = 8;

/// A single record in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Absolute offset of this record in the log.
    pub offset: u64,

    /// Payload bytes.
    pub value: Bytes,
}

impl Record {
    pub fn new(offset: u64, value: Bytes) -> Self {
        Self { offset, value }
    }

    /// Size of this record's frame on the store.
    pub fn frame_len(&self) -> u64 {
        (LEN_WIDTH + self.value.len()) as u64
    }
}

/// Assemble the store frame for a payload: 8-byte big-endian length, then
/// the payload itself, in one contiguous buffer so the store can issue a
/// single write.
pub fn encode_frame(value: &[u8]) -> BytesMut {
    let mut frame = BytesMut::with_capacity(LEN_WIDTH + value.len());
    frame.put_u64(value.len() as u64);
    frame.put_slice(value);
    frame
}
