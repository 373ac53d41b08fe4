//! Record framing
//!
//! ```text
//! [stream_key_len: 7-bit varint][stream_key: UTF-8]
//! [payload_len: i32 LE][payload]
//! ```
//!
//! Frames are written back to back with no separators, padding or
//! checksums. The varint is little-endian base-128: seven value bits per
//! byte, high bit set on every byte but the last, at most five bytes.

use super::errors::{MessageSetError, MessageSetResult};

/// Longest valid varint encoding of a 32-bit length.
pub const MAX_VARINT_LEN: usize = 5;

/// Bytes needed to encode `value` as a varint.
pub fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

/// Appends `value` as a varint.
pub fn write_varint(buffer: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buffer.push((value as u8) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

fn checked_len(len: usize, what: &str) -> MessageSetResult<u32> {
    if len > i32::MAX as usize {
        return Err(MessageSetError::invalid(format!(
            "{} length {} exceeds {}",
            what,
            len,
            i32::MAX
        )));
    }
    Ok(len as u32)
}

/// Exact encoded size of one record.
pub fn encoded_len(stream_key: &str, payload_len: usize) -> MessageSetResult<usize> {
    let key_len = checked_len(stream_key.len(), "stream key")?;
    checked_len(payload_len, "payload")?;
    Ok(varint_len(key_len) + stream_key.len() + 4 + payload_len)
}

/// Appends one framed record to `buffer`.
pub fn encode(buffer: &mut Vec<u8>, stream_key: &str, payload: &[u8]) -> MessageSetResult<()> {
    let key_len = checked_len(stream_key.len(), "stream key")?;
    let payload_len = checked_len(payload.len(), "payload")?;

    write_varint(buffer, key_len);
    buffer.extend_from_slice(stream_key.as_bytes());
    buffer.extend_from_slice(&(payload_len as i32).to_le_bytes());
    buffer.extend_from_slice(payload);
    Ok(())
}

/// Incremental varint decoder.
///
/// Feed bytes one at a time; yields the value once the terminating byte
/// arrives.
#[derive(Debug, Default)]
pub struct VarintDecoder {
    value: u32,
    consumed: usize,
}

/// Result of feeding one byte into a [`VarintDecoder`].
#[derive(Debug, PartialEq, Eq)]
pub enum VarintStep {
    NeedMore,
    Done(u32),
    Overlong,
}

impl VarintDecoder {
    pub fn push(&mut self, byte: u8) -> VarintStep {
        if self.consumed == MAX_VARINT_LEN {
            return VarintStep::Overlong;
        }
        let shift = 7 * self.consumed as u32;
        // The fifth byte carries only the top four bits of a u32.
        if self.consumed == MAX_VARINT_LEN - 1 && byte > 0x0f {
            return VarintStep::Overlong;
        }
        self.value |= ((byte & 0x7f) as u32) << shift;
        self.consumed += 1;
        if byte & 0x80 == 0 {
            VarintStep::Done(self.value)
        } else if self.consumed == MAX_VARINT_LEN {
            VarintStep::Overlong
        } else {
            VarintStep::NeedMore
        }
    }
}
