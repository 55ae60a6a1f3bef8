//! Frontend (client-to-server) message builders.
//!
//! Each type here encodes exactly one outgoing message. All but
//! [`Startup`] share the [`FrontendMessage`] trait and are written through
//! [`write_frame`], which prefixes the message-type byte and the
//! self-inclusive big-endian length (§4.2).
//!
//! Adapted from the two-pass `size_hint`-then-`encode` builders in the
//! teacher crate (`qs/src/postgres/frontend.rs`) to a single-pass encode
//! into a scratch buffer with the length patched in afterwards --
//! `Startup::write`'s own approach in that file -- since a sans-I/O
//! embedder holds one shared outgoing `BytesMut` rather than wanting a
//! size pre-computation per call.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{BufMutExt, StrExt, UsizeExt};

/// A type that can be encoded as a frontend wire message.
pub trait FrontendMessage {
    /// The message-type byte (§3 Message frame).
    const MSGTYPE: u8;

    /// Writes the message body (excluding type byte and length prefix).
    fn encode(&self, buf: &mut BytesMut);
}

/// Writes `msg` as a complete framed message into `buf`: type byte, then
/// big-endian `u32` length (counting itself and the body, not the type
/// byte), then the body.
pub fn write_frame<M: FrontendMessage>(msg: &M, buf: &mut BytesMut) {
    let start = buf.len();
    buf.put_u8(M::MSGTYPE);
    buf.put_u32(0); // patched below
    let body_start = buf.len();
    msg.encode(buf);
    let body_len = (buf.len() - body_start).to_u32();
    (&mut buf[start + 1..start + 5]).put_u32(4 + body_len);
}

/// The startup message (§3: the one untyped frame). Has no type byte, so
/// it does not implement [`FrontendMessage`] and is written through
/// [`Startup::write`] instead.
#[derive(Debug)]
pub struct Startup<'a> {
    /// The database user name to connect as. Required; no default.
    pub user: &'a str,
    /// The database to connect to. Defaults to the user name.
    pub database: Option<&'a str>,
    /// Command-line-style run-time parameters for the backend.
    pub options: Option<&'a str>,
    /// Streaming replication mode: `"true"`, `"false"`, or `"database"`.
    pub replication: Option<&'a str>,
}

impl Startup<'_> {
    pub fn write(&self, buf: &mut BytesMut) {
        let start = buf.len();
        buf.put_u32(0); // patched below

        // Int32(196608): major version 3, minor version 0.
        buf.put_u32(0x0003_0000);

        buf.put_nul_string("user");
        buf.put_nul_string(self.user);

        if let Some(database) = self.database {
            buf.put_nul_string("database");
            buf.put_nul_string(database);
        }

        if let Some(options) = self.options {
            buf.put_nul_string("options");
            buf.put_nul_string(options);
        }

        if let Some(replication) = self.replication {
            buf.put_nul_string("replication");
            buf.put_nul_string(replication);
        }

        buf.put_u8(b'\0');

        let total = (buf.len() - start).to_u32();
        (&mut buf[start..start + 4]).put_u32(total);
    }
}

/// `Query`: a simple-query-protocol SQL string.
pub struct Query<'a> {
    pub sql: &'a str,
}

impl FrontendMessage for Query<'_> {
    const MSGTYPE: u8 = b'Q';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.sql);
    }
}

/// `Parse`: creates a prepared statement from a SQL string.
///
/// The parameter-type count is always sent as zero -- the server infers
/// parameter types (§4.2).
pub struct Parse<'a> {
    /// Empty string selects the unnamed prepared statement.
    pub statement_name: &'a str,
    pub sql: &'a str,
}

impl FrontendMessage for Parse<'_> {
    const MSGTYPE: u8 = b'P';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.statement_name);
        buf.put_nul_string(self.sql);
        buf.put_u16(0);
    }
}

/// A single bound parameter value: `None` encodes SQL NULL.
pub type BindParam<'a> = Option<&'a [u8]>;

/// `Bind`: creates a portal from a prepared statement and parameter
/// values. All parameters and all result columns use the default text
/// format (format-code counts of zero), per §4.2.
pub struct Bind<'a> {
    /// Empty string selects the unnamed portal.
    pub portal_name: &'a str,
    /// Empty string selects the unnamed prepared statement.
    pub statement_name: &'a str,
    pub params: &'a [BindParam<'a>],
}

impl FrontendMessage for Bind<'_> {
    const MSGTYPE: u8 = b'B';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_nul_string(self.statement_name);

        // Parameter format codes: 0 = "all default (text)".
        buf.put_u16(0);

        buf.put_u16(self.params.len().to_u16());
        for param in self.params {
            match param {
                None => buf.put_i32(-1),
                Some(bytes) => {
                    buf.put_u32(bytes.len().to_u32());
                    buf.put_slice(bytes);
                }
            }
        }

        // Result-column format codes: 0 = "all default (text)".
        buf.put_u16(0);
    }
}

/// `Execute`: runs a portal, optionally capped at `max_rows` rows.
pub struct Execute<'a> {
    /// Empty string selects the unnamed portal.
    pub portal_name: &'a str,
    /// Zero means "no limit".
    pub max_rows: u32,
}

impl FrontendMessage for Execute<'_> {
    const MSGTYPE: u8 = b'E';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.portal_name);
        buf.put_u32(self.max_rows);
    }
}

/// `Describe`: requests a `ParameterDescription`/`RowDescription` for a
/// named prepared statement or portal.
pub struct Describe<'a> {
    /// `'S'` to describe a prepared statement, `'P'` to describe a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendMessage for Describe<'_> {
    const MSGTYPE: u8 = b'D';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind);
        buf.put_nul_string(self.name);
    }
}

/// `Close`: closes a prepared statement or portal.
pub struct Close<'a> {
    /// `'S'` to close a prepared statement, `'P'` to close a portal.
    pub kind: u8,
    pub name: &'a str,
}

impl FrontendMessage for Close<'_> {
    const MSGTYPE: u8 = b'C';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind);
        buf.put_nul_string(self.name);
    }
}

/// `PasswordMessage`: the frontend's response to an authentication
/// request, either the cleartext password or the md5-salted digest
/// computed by [`crate::auth::md5_password`].
pub struct PasswordMessage<'a> {
    pub password: &'a str,
}

impl FrontendMessage for PasswordMessage<'_> {
    const MSGTYPE: u8 = b'p';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.password);
    }
}

/// `CopyData`: one chunk of COPY payload, carried with no inner framing
/// beyond the outer message frame.
pub struct CopyData {
    pub data: Bytes,
}

impl FrontendMessage for CopyData {
    const MSGTYPE: u8 = b'd';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.data);
    }
}

/// `CopyDone`: signals the end of a COPY-in operation.
pub struct CopyDone;

impl FrontendMessage for CopyDone {
    const MSGTYPE: u8 = b'c';

    fn encode(&self, _buf: &mut BytesMut) {}
}

/// `CopyFail`: aborts a COPY-in operation with an error message.
pub struct CopyFail<'a> {
    pub message: &'a str,
}

impl FrontendMessage for CopyFail<'_> {
    const MSGTYPE: u8 = b'f';

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_nul_string(self.message);
    }
}

/// `Sync`: ends an extended-query message series.
pub struct Sync;

impl FrontendMessage for Sync {
    const MSGTYPE: u8 = b'S';

    fn encode(&self, _buf: &mut BytesMut) {}
}

/// `Flush`: forces the backend to deliver any pending results without
/// ending the message series.
pub struct Flush;

impl FrontendMessage for Flush {
    const MSGTYPE: u8 = b'H';

    fn encode(&self, _buf: &mut BytesMut) {}
}

/// `Terminate`: politely closes the connection.
pub struct Terminate;

impl FrontendMessage for Terminate {
    const MSGTYPE: u8 = b'X';

    fn encode(&self, _buf: &mut BytesMut) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of<M: FrontendMessage>(msg: &M) -> BytesMut {
        let mut buf = BytesMut::new();
        write_frame(msg, &mut buf);
        buf
    }

    #[test]
    fn query_frame_matches_known_vector() {
        // §8 scenario 2: simple_query("select 1")
        let frame = frame_of(&Query { sql: "select 1" });
        assert_eq!(
            &frame[..],
            &[
                b'Q', 0x00, 0x00, 0x00, 0x0d, b's', b'e', b'l', b'e', b'c', b't', b' ', b'1', 0x00
            ]
        );
    }

    #[test]
    fn frame_length_excludes_type_byte() {
        let frame = frame_of(&Query { sql: "x" });
        let declared = u32::from_be_bytes(frame[1..5].try_into().unwrap());
        assert_eq!(declared as usize, frame.len() - 1);
    }

    #[test]
    fn startup_message_is_untyped_and_self_inclusive() {
        let mut buf = BytesMut::new();
        Startup { user: "alice", database: Some("db"), options: None, replication: None }
            .write(&mut buf);
        let declared = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        assert_eq!(declared as usize, buf.len());
        assert_eq!(&buf[4..8], &0x0003_0000u32.to_be_bytes());
    }

    #[test]
    fn bind_encodes_null_and_present_params() {
        let frame = frame_of(&Bind {
            portal_name: "",
            statement_name: "",
            params: &[Some(b"hi".as_slice()), None],
        });
        // portal NUL, stmt NUL, format count(0), param count(2),
        // len=2 "hi", len=-1 (null), result format count(0)
        let expected_body: &[u8] = &[
            0x00, 0x00, // portal, stmt
            0x00, 0x00, // param format count
            0x00, 0x02, // param count
            0x00, 0x00, 0x00, 0x02, b'h', b'i',
            0xff, 0xff, 0xff, 0xff,
            0x00, 0x00, // result format count
        ];
        assert_eq!(&frame[5..], expected_body);
    }

    #[test]
    fn copy_data_round_trips_raw_payload() {
        let frame = frame_of(&CopyData { data: Bytes::from_static(b"\x01\x02\x03") });
        assert_eq!(&frame[5..], b"\x01\x02\x03");
    }

    #[test]
    fn parse_frame_matches_known_vector() {
        // §8: Parse round-trips the unnamed statement name and SQL text.
        let frame = frame_of(&Parse { statement_name: "", sql: "select 1" });
        let expected: &[u8] = &[
            b'P', 0x00, 0x00, 0x00, 0x10, // type + length(16)
            0x00, // statement_name: ""
            b's', b'e', b'l', b'e', b'c', b't', b' ', b'1', 0x00, // sql + NUL
            0x00, 0x00, // parameter-type count: 0
        ];
        assert_eq!(&frame[..], expected);
    }

    #[test]
    fn execute_frame_encodes_portal_and_max_rows() {
        // §8: Execute round-trips the portal name and the row-count limit.
        let frame = frame_of(&Execute { portal_name: "", max_rows: 100 });
        let expected: &[u8] = &[
            b'E', 0x00, 0x00, 0x00, 0x09, // type + length(9)
            0x00, // portal_name: ""
            0x00, 0x00, 0x00, 0x64, // max_rows: 100
        ];
        assert_eq!(&frame[..], expected);
    }
}
