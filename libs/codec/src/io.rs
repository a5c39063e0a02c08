//! Compact binary primitives
//!
//! QTP encodes integers in a variable-length signed form that spends one
//! byte on values in `-64..64` and at most five bytes on any `i32`:
//!
//! ```text
//! 0xxxxxxx                                   7-bit  signed
//! 10xxxxxx xxxxxxxx                          14-bit signed
//! 110xxxxx xxxxxxxx xxxxxxxx                 21-bit signed
//! 1110xxxx xxxxxxxx xxxxxxxx xxxxxxxx        28-bit signed
//! 11110xxx + 4 bytes big-endian              full 32-bit
//! ```
//!
//! Strings are a compact byte length followed by UTF-8 bytes; length `-1`
//! marks an absent string.

use crate::{ProtocolError, ProtocolResult};
use bytes::{BufMut, Bytes, BytesMut};

/// Number of bytes `write_compact_int` will use for `value`
pub fn compact_int_size(value: i32) -> usize {
    match value {
        -0x40..=0x3f => 1,
        -0x2000..=0x1fff => 2,
        -0x10_0000..=0x0f_ffff => 3,
        -0x0800_0000..=0x07ff_ffff => 4,
        _ => 5,
    }
}

/// Growable output buffer for composing QTP messages
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    buf: BytesMut,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop everything written after `len`, used to roll back a partial message
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    /// Take everything written so far, leaving the buffer empty
    pub fn split(&mut self) -> BytesMut {
        self.buf.split()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_compact_int(&mut self, value: i32) {
        // Masking to u8/u16 keeps the low bits; the prefix bits are or-ed in.
        match compact_int_size(value) {
            1 => self.buf.put_u8((value & 0x7f) as u8),
            2 => self.buf.put_u16(0x8000 | (value & 0x3fff) as u16),
            3 => {
                self.buf.put_u8(0xc0 | ((value >> 16) & 0x1f) as u8);
                self.buf.put_u16(value as u16);
            }
            4 => self.buf.put_u32(0xe000_0000 | (value as u32 & 0x0fff_ffff)),
            _ => {
                self.buf.put_u8(0xf0);
                self.buf.put_i32(value);
            }
        }
    }

    /// Writes a compact length prefix followed by the UTF-8 bytes
    pub fn write_utf_string(&mut self, value: &str) {
        self.write_compact_int(value.len() as i32);
        self.buf.put_slice(value.as_bytes());
    }

    /// Writes the absent-string marker
    pub fn write_null_string(&mut self) {
        self.write_compact_int(-1);
    }
}

/// Cursor over received bytes with offset-aware error reporting
#[derive(Debug, Clone)]
pub struct BufferedInput<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufferedInput<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn has_available(&self) -> bool {
        self.pos < self.data.len()
    }

    fn take(&mut self, n: usize, context: &str) -> ProtocolResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::truncated(n, self.remaining(), self.pos, context));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        Ok(self.take(1, "byte")?[0])
    }

    pub fn read_bytes(&mut self, n: usize) -> ProtocolResult<&'a [u8]> {
        self.take(n, "byte block")
    }

    pub fn read_i32(&mut self) -> ProtocolResult<i32> {
        let b = self.take(4, "int")?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> ProtocolResult<i64> {
        let b = self.take(8, "long")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_compact_int(&mut self) -> ProtocolResult<i32> {
        let start = self.pos;
        let n = self.take(1, "compact int prefix")?[0] as i32;
        if n < 0x80 {
            return Ok((n << 25) >> 25);
        }
        if n < 0xc0 {
            let b = self.take(1, "compact int")?;
            return Ok(((n << 26) >> 18) | b[0] as i32);
        }
        if n < 0xe0 {
            let b = self.take(2, "compact int")?;
            return Ok(((n << 27) >> 11) | (b[0] as i32) << 8 | b[1] as i32);
        }
        if n < 0xf0 {
            let b = self.take(3, "compact int")?;
            return Ok(((n << 28) >> 4) | (b[0] as i32) << 16 | (b[1] as i32) << 8 | b[2] as i32);
        }
        if n < 0xf8 {
            return self.read_i32();
        }
        self.pos = start;
        Err(ProtocolError::malformed_compact_int(start, n as u8))
    }

    /// Reads a string written by [`BufferedOutput::write_utf_string`]; `None` for the absent marker
    pub fn read_utf_string(&mut self) -> ProtocolResult<Option<String>> {
        let offset = self.pos;
        let len = self.read_compact_int()?;
        if len == -1 {
            return Ok(None);
        }
        if len < 0 {
            return Err(ProtocolError::invalid_size(len as i64, offset, "utf string length"));
        }
        let body_offset = self.pos;
        let bytes = self.take(len as usize, "utf string body")?;
        std::str::from_utf8(bytes)
            .map(|s| Some(s.to_owned()))
            .map_err(|e| ProtocolError::InvalidUtf8 {
                offset: body_offset,
                reason: e.to_string(),
            })
    }

    /// Reads a non-negative compact count, rejecting corrupt sizes
    pub fn read_size(&mut self, context: &str) -> ProtocolResult<usize> {
        let offset = self.pos;
        let size = self.read_compact_int()?;
        if size < 0 || size as usize > self.data.len() {
            return Err(ProtocolError::invalid_size(size as i64, offset, context));
        }
        Ok(size as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: i32) -> Vec<u8> {
        let mut out = BufferedOutput::new();
        out.write_compact_int(value);
        out.as_slice().to_vec()
    }

    fn decode(bytes: &[u8]) -> ProtocolResult<i32> {
        BufferedInput::new(bytes).read_compact_int()
    }

    #[test]
    fn test_compact_int_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(-1), vec![0x7f]);
        assert_eq!(encode(63), vec![0x3f]);
        assert_eq!(encode(64), vec![0x80, 0x40]);
        assert_eq!(encode(-64), vec![0x40]);
        assert_eq!(encode(-65), vec![0xbf, 0xbf]);
        assert_eq!(encode(i32::MAX), vec![0xf0, 0x7f, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_compact_int_boundaries() {
        let boundaries = [
            0x3f, 0x40, -0x40, -0x41, 0x1fff, 0x2000, -0x2000, -0x2001, 0x0f_ffff, 0x10_0000,
            -0x10_0000, -0x10_0001, 0x07ff_ffff, 0x0800_0000, -0x0800_0000, -0x0800_0001,
            i32::MIN, i32::MAX,
        ];
        for value in boundaries {
            let bytes = encode(value);
            assert_eq!(bytes.len(), compact_int_size(value), "size of {value}");
            assert_eq!(decode(&bytes).unwrap(), value, "value {value}");
        }
    }

    #[test]
    fn test_truncated_compact_int() {
        let err = decode(&[0x80]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { need: 1, got: 0, .. }));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_compact_long_prefix_rejected() {
        let err = decode(&[0xf8, 0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedCompactInt { prefix: 0xf8, .. }));
    }

    #[test]
    fn test_utf_strings() {
        let mut out = BufferedOutput::new();
        out.write_utf_string("TICKER_DATA");
        out.write_utf_string("");
        out.write_null_string();
        out.write_utf_string("Цена");

        let mut input = BufferedInput::new(out.as_slice());
        assert_eq!(input.read_utf_string().unwrap().as_deref(), Some("TICKER_DATA"));
        assert_eq!(input.read_utf_string().unwrap().as_deref(), Some(""));
        assert_eq!(input.read_utf_string().unwrap(), None);
        assert_eq!(input.read_utf_string().unwrap().as_deref(), Some("Цена"));
        assert!(!input.has_available());
    }

    #[test]
    fn test_truncated_string_body() {
        let mut out = BufferedOutput::new();
        out.write_utf_string("version");
        let bytes = &out.as_slice()[..4];
        let err = BufferedInput::new(bytes).read_utf_string().unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { need: 7, got: 3, .. }));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = BufferedInput::new(&[0x02, 0xc3, 0x28]).read_utf_string().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8 { offset: 1, .. }));
    }

    #[test]
    fn test_negative_size_rejected() {
        let err = BufferedInput::new(&[0x7e]).read_size("property count").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidSize { size: -2, .. }));
    }
}
