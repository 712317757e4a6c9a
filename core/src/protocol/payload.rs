//! Bounds-checked cursors for encoding and decoding control payloads.
//!
//! [`PayloadView`] is a borrowed read window over an existing buffer: every
//! primitive advances the cursor and fails with
//! [`Error::TruncatedPayload`] instead of reading past the window.
//! [`PayloadBuilder`] is its owned, append-only counterpart.
//!
//! Wire conventions shared by every structure in this crate:
//! - multi-byte integers are little-endian,
//! - records are packed, with no inter-field padding,
//! - string fields travel as NUL-terminated bytes whose recorded length
//!   includes the terminator; the terminator byte is verified on read rather
//!   than trusted from the declared length.

use crate::error::Error;
use crate::Result;

/// Borrowed, non-owning read cursor over a contiguous byte buffer.
#[derive(Debug)]
pub struct PayloadView<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> PayloadView<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left in the window.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(Error::TruncatedPayload {
                needed: n,
                remaining,
            });
        }
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Reads a NUL-terminated string field of `len` bytes, terminator
    /// included.
    ///
    /// The final byte must actually be NUL and the content must be UTF-8;
    /// a declared length is never trusted on its own. `field` names the
    /// field in errors.
    pub fn read_cstring(&mut self, len: usize, field: &'static str) -> Result<String> {
        let raw = self.take(len)?;
        match raw.split_last() {
            Some((0, content)) => std::str::from_utf8(content)
                .map(str::to_owned)
                .map_err(|_| Error::InvalidString { field }),
            _ => Err(Error::MissingTerminator { field }),
        }
    }
}

/// Owned, append-only buffer for building wire payloads.
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    buf: Vec<u8>,
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
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

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends the string's bytes plus a NUL terminator; the matching length
    /// field is the content length plus one.
    pub fn write_cstring(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }
}
