//! Incremental byte cursor over a chunk-delivered stream
//!
//! A resumable reader for one direction of a connection. Chunks arrive in
//! stream order but with arbitrary boundaries; every read is
//! all-or-nothing, leaving the residue untouched when fewer bytes are
//! buffered than requested. Consumed bytes are dropped immediately, so
//! the residue never outgrows the largest admissible frame.

use bytes::{Buf, Bytes, BytesMut};

use super::WireError;

/// Resumable cursor over an incrementally delivered byte stream.
#[derive(Debug)]
pub struct StreamCursor {
    buf: BytesMut,
    consumed: u64,
    max_frame_length: u32,
}

impl StreamCursor {
    /// Creates a cursor that refuses to buffer frames declared longer
    /// than `max_frame_length`.
    pub fn new(max_frame_length: u32) -> Self {
        Self {
            buf: BytesMut::new(),
            consumed: 0,
            max_frame_length,
        }
    }

    /// Appends a delivered chunk. Zero-length chunks are no-ops.
    pub fn extend(&mut self, chunk: &[u8]) {
        if !chunk.is_empty() {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Number of buffered, not yet consumed bytes.
    pub fn available(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes consumed from the stream so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Views the next `n` bytes without consuming, or `None` if fewer are
    /// buffered.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        self.buf.get(..n)
    }

    /// Consumes exactly `n` bytes, or `None` (residue untouched) if fewer
    /// are buffered.
    pub fn take(&mut self, n: usize) -> Option<Bytes> {
        if self.buf.len() < n {
            return None;
        }
        self.consumed += n as u64;
        Some(self.buf.split_to(n).freeze())
    }

    /// Consumes a single byte.
    pub fn take_u8(&mut self) -> Option<u8> {
        self.take(1).map(|bytes| bytes[0])
    }

    /// Consumes a 4-byte big-endian integer.
    pub fn take_u32_be(&mut self) -> Option<u32> {
        let mut bytes = self.take(4)?;
        Some(bytes.get_u32())
    }

    /// Consumes a frame body whose length was decoded from already
    /// consumed bytes.
    ///
    /// Returns `Ok(None)` while the body is still incomplete. A declared
    /// length above the configured maximum fails before any buffering
    /// decision, however many bytes actually follow.
    ///
    /// # Errors
    ///
    /// - `WireError::OversizedFrame` - Declared length exceeds the maximum
    pub fn take_frame(&mut self, declared: u32) -> Result<Option<Bytes>, WireError> {
        if declared > self.max_frame_length {
            return Err(WireError::OversizedFrame {
                declared,
                max: self.max_frame_length,
            });
        }
        Ok(self.take(declared as usize))
    }

    /// Drops all buffered bytes; used when a direction is abandoned.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_all_or_nothing() {
        let mut cursor = StreamCursor::new(1024);
        cursor.extend(b"abc");

        assert!(cursor.take(4).is_none());
        assert_eq!(cursor.available(), 3);

        cursor.extend(b"d");
        let taken = cursor.take(4).unwrap();
        assert_eq!(taken.as_ref(), b"abcd");
        assert_eq!(cursor.available(), 0);
        assert_eq!(cursor.bytes_consumed(), 4);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut cursor = StreamCursor::new(1024);
        cursor.extend(b"\x13Bit");
        assert_eq!(cursor.peek(1), Some(&b"\x13"[..]));
        assert_eq!(cursor.peek(4), Some(&b"\x13Bit"[..]));
        assert!(cursor.peek(5).is_none());
        assert_eq!(cursor.available(), 4);
        assert_eq!(cursor.bytes_consumed(), 0);
    }

    #[test]
    fn test_u32_across_chunk_boundaries() {
        let mut cursor = StreamCursor::new(1024);
        for byte in [0x00u8, 0x01, 0x02, 0x03] {
            assert!(cursor.take_u32_be().is_none() || cursor.available() >= 4);
            cursor.extend(&[byte]);
        }
        assert_eq!(cursor.take_u32_be(), Some(0x0001_0203));
    }

    #[test]
    fn test_zero_length_chunk_is_noop() {
        let mut cursor = StreamCursor::new(1024);
        cursor.extend(b"");
        assert_eq!(cursor.available(), 0);
        cursor.extend(b"x");
        cursor.extend(b"");
        assert_eq!(cursor.take_u8(), Some(b'x'));
    }

    #[test]
    fn test_take_frame_enforces_maximum() {
        let mut cursor = StreamCursor::new(16);
        cursor.extend(&[0u8; 8]);

        assert_eq!(cursor.take_frame(8).unwrap().unwrap().len(), 8);

        // Declared above the maximum fails even with no bytes buffered.
        let err = cursor.take_frame(17).unwrap_err();
        assert_eq!(
            err,
            WireError::OversizedFrame {
                declared: 17,
                max: 16
            }
        );

        // At the limit it waits for more bytes instead.
        assert!(cursor.take_frame(16).unwrap().is_none());
    }

    #[test]
    fn test_clear_drops_residue() {
        let mut cursor = StreamCursor::new(1024);
        cursor.extend(b"leftover");
        cursor.clear();
        assert_eq!(cursor.available(), 0);
        assert!(cursor.take_u8().is_none());
    }
}
