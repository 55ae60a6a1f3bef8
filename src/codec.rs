//! Byte codec utilities.
//!
//! All multi-byte integers on the wire are big-endian. Strings are
//! NUL-terminated byte sequences with no length prefix. These extension
//! traits give the message builders/decoders a vocabulary for that
//! encoding over [`bytes::BufMut`] / [`bytes::Buf`] / [`bytes::Bytes`]
//! without repeating the NUL-scan or big-endian calls at every call site.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::common::ByteStr;

/// Wire-size integers disagree with Rust's `usize` about signedness and
/// width; these conversions panic on overflow rather than silently
/// wrapping, since an overflow here means a message too large for the
/// protocol to frame at all -- a programmer error, not a recoverable one.
pub trait UsizeExt {
    fn to_u32(self) -> u32;
    fn to_u16(self) -> u16;
}

impl UsizeExt for usize {
    fn to_u32(self) -> u32 {
        u32::try_from(self).expect("message size too large for the postgres wire protocol")
    }

    fn to_u16(self) -> u16 {
        u16::try_from(self).expect("message size too large for the postgres wire protocol")
    }
}

/// Length of a NUL-terminated encoding of `self`, including the NUL.
pub trait StrExt {
    fn nul_string_len(&self) -> u32;
}

impl StrExt for str {
    fn nul_string_len(&self) -> u32 {
        self.len().to_u32() + 1
    }
}

/// Write NUL-terminated strings into a [`BufMut`].
pub trait BufMutExt {
    fn put_nul_string(&mut self, string: &str);
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

/// Read NUL-terminated byte sequences out of a [`Bytes`]/[`BytesMut`].
pub trait BytesExt: Sized {
    /// Splits off everything up to (not including) the next NUL byte,
    /// and advances past the NUL itself.
    ///
    /// Returns `None` if no NUL byte remains in the buffer.
    fn get_nul_bytes(&mut self) -> Option<Self>;

    /// As [`BytesExt::get_nul_bytes`], checked as UTF-8 and wrapped in a
    /// [`ByteStr`].
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, NulStringError>;
}

/// Failure decoding a NUL-terminated wire string.
#[derive(Debug, thiserror::Error)]
pub enum NulStringError {
    #[error("postgres string was not NUL-terminated")]
    Unterminated,
    #[error("postgres string was not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl BytesExt for Bytes {
    fn get_nul_bytes(&mut self) -> Option<Self> {
        let end = self.iter().position(|&b| b == b'\0')?;
        let out = self.split_to(end);
        Buf::advance(self, 1);
        Some(out)
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, NulStringError> {
        let raw = self.get_nul_bytes().ok_or(NulStringError::Unterminated)?;
        Ok(ByteStr::from_utf8(raw)?)
    }
}

impl BytesExt for BytesMut {
    fn get_nul_bytes(&mut self) -> Option<Self> {
        let end = self.iter().position(|&b| b == b'\0')?;
        let out = self.split_to(end);
        Buf::advance(self, 1);
        Some(out)
    }

    fn get_nul_bytestr(&mut self) -> Result<ByteStr, NulStringError> {
        let raw = self.get_nul_bytes().ok_or(NulStringError::Unterminated)?;
        Ok(ByteStr::from_utf8(raw.freeze())?)
    }
}
