//! Cursor over the immutable blob buffer.
//!
//! Every read advances the cursor by exactly the bytes it consumed. Fixed
//! width fields are little-endian: `int` is 4 bytes, `double` is 8 bytes.
//! Magnitudes and counts use unsigned LEB128 ("varint") encoding.
//!
//! Reads are bounds checked; running off the end reports
//! [`BlobError::UnexpectedEof`] with the absolute offset into the payload.

use crate::error::{BlobError, BlobResult};

/// Moving read position over a byte slice.
///
/// `base` is the offset of `data[0]` inside the blob payload so errors and
/// raw-data spans can report payload-relative positions.
#[derive(Debug, Clone)]
pub struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> BlobReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Creates a reader whose offsets are reported relative to `base`.
    #[must_use]
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Bytes consumed so far.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Payload-relative offset of the next unread byte.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn eof(&self) -> BlobError {
        BlobError::UnexpectedEof { offset: self.offset() }
    }

    /// Returns the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_u8(&mut self) -> BlobResult<u8> {
        let byte = self.peek_u8().ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(byte)
    }

    /// Consumes exactly `len` bytes and returns them.
    pub fn read_bytes(&mut self, len: usize) -> BlobResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.eof());
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> BlobResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u16(&mut self) -> BlobResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> BlobResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a signed native `int` field (4 bytes).
    pub fn read_i32(&mut self) -> BlobResult<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads a `double` field bit for bit, NaN payload and sign included.
    pub fn read_f64(&mut self) -> BlobResult<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Reads an unsigned LEB128 value; the caller supplies the sign.
    pub fn read_varint(&mut self) -> BlobResult<u64> {
        let start = self.offset();
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_u8()?;
            let payload = u64::from(byte & 0x7F);
            if shift >= 64 || (shift == 63 && payload > 1) {
                return Err(BlobError::VarintOverflow { offset: start });
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Reads a varint that is used as a length or element count.
    pub fn read_len(&mut self) -> BlobResult<usize> {
        let start = self.offset();
        let value = self.read_varint()?;
        usize::try_from(value).map_err(|_| BlobError::VarintOverflow { offset: start })
    }

    /// Reads a NUL-terminated string, leaving the cursor just past the terminator.
    ///
    /// The returned slice excludes the terminator.
    pub fn read_cstr(&mut self) -> BlobResult<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let len = rest.iter().position(|&b| b == 0).ok_or_else(|| BlobError::UnexpectedEof {
            offset: self.base + self.data.len(),
        })?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }
}
