//! Record Framing
//!
//! Wire format shared with the monitor:
//!
//! ```text
//! offset 0            8             16
//!        ┌────────────┬─────────────┬──────────────────┐
//!        │ sender u64 │ length u64  │ payload[length]  │
//!        └────────────┴─────────────┴──────────────────┘
//! ```
//!
//! Both fields are little-endian and read byte-wise; records are packed
//! back to back with no padding, so no alignment is ever assumed.

use log::warn;

use super::Identity;
use crate::config::{HEADER_SIZE, IDENTITY_FIELD};

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Originator of the record.
    pub sender: Identity,
    /// Payload bytes following the header.
    pub len: usize,
}

impl RecordHeader {
    /// Decode a header from the start of `bytes`.
    ///
    /// Returns `None` if fewer than `HEADER_SIZE` bytes are available or
    /// the length does not fit in `usize`.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_SIZE)?;
        let (sender, len) = header.split_at(IDENTITY_FIELD);
        let sender = u64::from_le_bytes(sender.try_into().ok()?);
        let len = u64::from_le_bytes(len.try_into().ok()?);
        Some(Self {
            sender: Identity::new(sender),
            len: usize::try_from(len).ok()?,
        })
    }

    /// Encode into the first `HEADER_SIZE` bytes of `out`.
    ///
    /// # Panics
    /// Panics if `out` is shorter than `HEADER_SIZE`.
    pub fn encode(&self, out: &mut [u8]) {
        out[..IDENTITY_FIELD].copy_from_slice(&self.sender.as_u64().to_le_bytes());
        out[IDENTITY_FIELD..HEADER_SIZE].copy_from_slice(&(self.len as u64).to_le_bytes());
    }

    /// Header plus payload.
    #[inline]
    pub const fn framed_len(&self) -> usize {
        HEADER_SIZE + self.len
    }
}

/// Frame `payload` from `sender` into the front of `out`.
///
/// Returns the framed length, or `None` if `out` is too small.
pub fn encode_record(out: &mut [u8], sender: Identity, payload: &[u8]) -> Option<usize> {
    let header = RecordHeader {
        sender,
        len: payload.len(),
    };
    let framed = header.framed_len();
    let slot = out.get_mut(..framed)?;
    header.encode(slot);
    slot[HEADER_SIZE..].copy_from_slice(payload);
    Some(framed)
}

/// A record located inside a byte region.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Offset of the header within the scanned region.
    pub offset: usize,
    /// Decoded header.
    pub header: RecordHeader,
    /// Payload bytes.
    pub payload: &'a [u8],
}

/// Iterator over the records packed in `bytes`.
///
/// Stops at the end of the region, or at the first header whose
/// declared payload would run past it.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    /// Scan the occupied part of a store.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        let rest = self.bytes.get(self.offset..)?;
        if rest.is_empty() {
            return None;
        }

        let Some(header) = RecordHeader::decode(rest) else {
            warn!("[MAILBOX] truncated header at offset {}", self.offset);
            self.offset = self.bytes.len();
            return None;
        };

        let Some(payload) = rest
            .get(HEADER_SIZE..)
            .and_then(|body| body.get(..header.len))
        else {
            warn!(
                "[MAILBOX] record at offset {} claims {} bytes past end",
                self.offset, header.len
            );
            self.offset = self.bytes.len();
            return None;
        };

        let record = Record {
            offset: self.offset,
            header,
            payload,
        };
        self.offset += header.framed_len();
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut out = [0u8; 18];
        let framed = encode_record(&mut out, Identity::new(7), b"hi").unwrap();
        assert_eq!(framed, 18);
        assert_eq!(&out[..8], &7u64.to_le_bytes());
        assert_eq!(&out[8..16], &2u64.to_le_bytes());
        assert_eq!(&out[16..], b"hi");
    }

    #[test]
    fn test_encode_too_small() {
        let mut out = [0u8; 17];
        assert!(encode_record(&mut out, Identity::new(1), b"hi").is_none());
    }

    #[test]
    fn test_decode_unaligned() {
        let mut buf = [0u8; 40];
        encode_record(&mut buf[3..], Identity::new(0xDEAD_BEEF), b"abc").unwrap();
        let header = RecordHeader::decode(&buf[3..]).unwrap();
        assert_eq!(header.sender, Identity::new(0xDEAD_BEEF));
        assert_eq!(header.len, 3);
    }

    #[test]
    fn test_records_walk_in_order() {
        let mut buf = [0u8; 64];
        let mut used = encode_record(&mut buf, Identity::new(3), b"one").unwrap();
        used += encode_record(&mut buf[used..], Identity::new(5), b"").unwrap();
        used += encode_record(&mut buf[used..], Identity::new(3), b"three").unwrap();

        let records: Vec<_> = Records::new(&buf[..used]).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].payload, b"one");
        assert_eq!(records[1].header.sender, Identity::new(5));
        assert!(records[1].payload.is_empty());
        assert_eq!(records[2].offset, 19 + 16);
        assert_eq!(records[2].payload, b"three");
    }

    #[test]
    fn test_records_stop_at_overlong_length() {
        let mut buf = [0u8; 32];
        RecordHeader {
            sender: Identity::new(1),
            len: 100,
        }
        .encode(&mut buf);
        assert_eq!(Records::new(&buf).count(), 0);
    }

    #[test]
    fn test_records_ignore_bytes_past_region() {
        let mut buf = [0xFFu8; 64];
        let used = encode_record(&mut buf, Identity::new(9), b"x").unwrap();
        assert_eq!(Records::new(&buf[..used]).count(), 1);
    }
}
