//! Primitive wire encoding helpers.
//!
//! SFTP transmits all integers in network byte order and all strings as a
//! `u32` byte length followed by the raw bytes, with no terminator. String
//! contents are opaque: the protocol does not guarantee UTF-8 for filenames,
//! so they stay byte vectors all the way through the codec. These helpers
//! keep the per-message codec in [`super::message`] free of manual index
//! arithmetic.

use bytes::{BufMut, Bytes, BytesMut};
use fxp_platform::{FxpError, FxpResult};

/// Bounds-checked reader over a packet payload.
pub(crate) struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, what: &str) -> FxpResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(FxpError::Protocol(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u32(&mut self, what: &str) -> FxpResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self, what: &str) -> FxpResult<u64> {
        let b = self.take(8, what)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Length-prefixed byte string, contents untouched.
    pub(crate) fn bytes(&mut self, what: &str) -> FxpResult<Vec<u8>> {
        let len = self.u32(what)? as usize;
        Ok(self.take(len, what)?.to_vec())
    }
}

/// Append-only writer for a packet payload.
pub(crate) struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub(crate) fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(64),
        }
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub(crate) fn u64(&mut self, v: u64) {
        self.buf.put_u64(v);
    }

    pub(crate) fn bytes(&mut self, v: &[u8]) {
        self.buf.put_u32(v.len() as u32);
        self.buf.put_slice(v);
    }

    pub(crate) fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
