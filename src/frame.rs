//! Incoming frame parser (§4.3 Frame boundary detection).
//!
//! The embedder owns the socket; this module only knows how to find the
//! next complete `(type byte, body)` frame inside whatever bytes have
//! accumulated so far, and how much more it needs when the tail is
//! incomplete. No frame is ever decoded into a concrete message type
//! here -- that is [`crate::message::backend::Backend::decode`]'s job.
//!
//! Grounded on `qs/src/ext/mod.rs`'s use of `BytesMut::split_to` to
//! consume a buffer prefix without a memmove (the same idiom this module
//! uses to advance past a decoded frame), generalized from a one-shot
//! NUL-string cut to a length-prefixed message cut.

use bytes::{Buf, Bytes, BytesMut};

/// Number of header bytes needed before the declared length can even be
/// read: one type byte plus a four-byte length.
const HEADER_LEN: usize = 5;

/// One complete backend frame: its type byte and its body, with the type
/// byte and length prefix already stripped.
#[derive(Debug, Clone)]
pub struct Frame {
    pub msgtype: u8,
    pub body: Bytes,
}

/// Accumulates bytes read from the backend and yields complete frames.
///
/// Owns a single growable buffer and advances an implicit cursor by
/// splitting consumed bytes off the front (§9 re-architecture guidance:
/// an index-advancing cursor over an owned buffer, not in-place
/// truncation of a borrowed slice).
#[derive(Debug, Default)]
pub struct RecvBuffer {
    buf: BytesMut,
}

impl RecvBuffer {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Appends newly-read bytes from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Peeks the first 5 bytes and returns the length declared by the
    /// frame header, or `None` if fewer than 5 bytes have accumulated to
    /// even read it (§4.3). The declared value already excludes the type
    /// byte but includes itself, so for a typed frame it equals
    /// `frame.length - 1`; for the untyped first frame it equals
    /// `frame.length` exactly (§8 testable property).
    ///
    /// This does not mean the frame has fully arrived -- only that its
    /// header has. Compare against [`RecvBuffer::pending`] (or call
    /// [`RecvBuffer::next_frame`] directly) to know whether the body is
    /// complete yet.
    pub fn message_length(&self) -> Option<usize> {
        if self.buf.len() < HEADER_LEN {
            return None;
        }
        Some(u32::from_be_bytes(self.buf[1..5].try_into().unwrap()) as usize)
    }

    /// Bytes still needed before the next frame is complete: the
    /// shortfall to the 5-byte header if it hasn't fully arrived yet,
    /// otherwise the shortfall to the declared frame length. Zero once a
    /// full frame is ready for [`RecvBuffer::next_frame`].
    pub fn bytes_needed(&self) -> usize {
        if self.buf.len() < HEADER_LEN {
            return HEADER_LEN - self.buf.len();
        }
        let declared = u32::from_be_bytes(self.buf[1..5].try_into().unwrap()) as usize;
        let total = 1 + declared;
        total.saturating_sub(self.buf.len())
    }

    /// Pulls the next complete frame off the front of the buffer, if one
    /// has fully arrived. Returns `None` on a partial tail -- call
    /// [`RecvBuffer::message_length`] to learn how many more bytes to
    /// read before calling this again.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.buf.len() < HEADER_LEN {
            return None;
        }
        let declared = u32::from_be_bytes(self.buf[1..5].try_into().unwrap()) as usize;
        let total = 1 + declared;
        if self.buf.len() < total {
            return None;
        }

        let mut frame = self.buf.split_to(total);
        let msgtype = frame.get_u8();
        frame.advance(4); // the length field itself
        Some(Frame { msgtype, body: frame.freeze() })
    }

    /// Bytes currently buffered but not yet forming a complete frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_length_is_none_on_empty_buffer() {
        let recv = RecvBuffer::new();
        assert_eq!(recv.message_length(), None);
        assert_eq!(recv.bytes_needed(), HEADER_LEN);
    }

    #[test]
    fn message_length_is_declared_value_once_header_known() {
        let mut recv = RecvBuffer::new();
        recv.extend(&[b'Z', 0x00, 0x00, 0x00, 0x05]);
        // declared length 5 = itself, no body left beyond the header
        assert_eq!(recv.message_length(), Some(5));
        assert_eq!(recv.bytes_needed(), 0);
    }

    #[test]
    fn message_length_holds_even_on_partial_body() {
        // §8: message_length(frame) == frame.length - 1 for a typed frame,
        // independent of how much of the body has actually arrived.
        let mut recv = RecvBuffer::new();
        recv.extend(&[b'Q', 0x00, 0x00, 0x00, 0x0d, b's', b'e', b'l']);
        assert!(recv.next_frame().is_none());
        assert_eq!(recv.message_length(), Some(0x0d));
        assert_eq!(recv.bytes_needed(), 0x0d - 1 - 3);
    }

    #[test]
    fn yields_frame_once_complete_and_advances_cursor() {
        let mut recv = RecvBuffer::new();
        recv.extend(&[
            b'Q', 0x00, 0x00, 0x00, 0x0d, b's', b'e', b'l', b'e', b'c', b't', b' ', b'1', 0x00,
        ]);
        let frame = recv.next_frame().unwrap();
        assert_eq!(frame.msgtype, b'Q');
        assert_eq!(&frame.body[..], b"select 1\0");
        assert_eq!(recv.pending(), 0);
        assert!(recv.next_frame().is_none());
    }

    #[test]
    fn yields_successive_frames_from_one_extend() {
        let mut recv = RecvBuffer::new();
        recv.extend(&[b'S', 0x00, 0x00, 0x00, 0x04]);
        recv.extend(&[b'S', 0x00, 0x00, 0x00, 0x04]);
        let first = recv.next_frame().unwrap();
        let second = recv.next_frame().unwrap();
        assert_eq!(first.msgtype, b'S');
        assert_eq!(second.msgtype, b'S');
        assert!(recv.next_frame().is_none());
    }
}
