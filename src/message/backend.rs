//! Backend (server-to-client) message decoders.
//!
//! One type per message, one shared [`BackendMessage`] trait, dispatched
//! through the closed [`Backend`] enum. The type byte is resolved through
//! [`super::types::backend_name`]; an unrecognized byte is a fatal
//! protocol error (§4.4).
//!
//! Grounded on `qs/src/postgres/backend.rs` (the `BackendProtocol` trait,
//! the `BackendMessage` enum, and the `unit_msg!`/`match_backend!` macros
//! that generate the empty-bodied variants and the closed dispatch) and
//! `qs/src/message/backend.rs` (concrete field layouts for
//! `ParameterStatus`/`CommandComplete`).

use bytes::{Buf, Bytes};

use crate::codec::BytesExt;
use crate::common::ByteStr;
use crate::error::{DatabaseError, ProtocolError};
use crate::row_description::RowDescription;

/// A type that can be decoded from a backend message body.
///
/// `body` is only the payload -- the type byte and length prefix have
/// already been stripped by the frame parser.
pub trait BackendMessage: Sized {
    const MSGTYPE: u8;

    fn decode(body: Bytes) -> Result<Self, ProtocolError>;
}

macro_rules! unit_message {
    ($(#[$doc:meta])* struct $name:ident, $code:literal;) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl BackendMessage for $name {
            const MSGTYPE: u8 = $code;

            fn decode(_body: Bytes) -> Result<Self, ProtocolError> {
                Ok(Self)
            }
        }
    };
}

/// Authentication sub-codes (§4.4 AuthenticationRequest). The closed set
/// of variants this crate understands; everything else is surfaced as
/// `Unsupported` rather than decoded further (§1 Non-goals, §9
/// re-architecture guidance: unsupported auth is an explicit error, never
/// a silent no-op).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    Ok,
    CleartextPassword,
    Md5Password { salt: [u8; 4] },
    /// Kerberos V5 (2), SCM credential (6), GSSAPI (7/8), SSPI (9), or
    /// SASL (10/11/12) -- recognized but not implemented.
    Unsupported { sub_code: i32 },
}

impl BackendMessage for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(match body.get_i32() {
            0 => Self::Ok,
            3 => Self::CleartextPassword,
            5 => {
                let mut salt = [0u8; 4];
                body.copy_to_slice(&mut salt);
                Self::Md5Password { salt }
            }
            sub_code => Self::Unsupported { sub_code },
        })
    }
}

/// `BackendKeyData`: the values needed to issue a later `CancelRequest`.
#[derive(Debug, Clone, Copy)]
pub struct BackendKeyData {
    pub process_id: i32,
    pub secret_key: i32,
}

impl BackendMessage for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            process_id: body.get_i32(),
            secret_key: body.get_i32(),
        })
    }
}

/// `ParameterStatus`: a single run-time parameter name/value pair.
///
/// Decodes exactly one pair, per the wire protocol (§9 open question:
/// the described original source loops over several pairs, which the
/// protocol does not call for).
#[derive(Debug, Clone)]
pub struct ParameterStatus {
    pub name: ByteStr,
    pub value: ByteStr,
}

impl BackendMessage for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: body.get_nul_bytestr()?,
            value: body.get_nul_bytestr()?,
        })
    }
}

/// `NoticeResponse`: an informational notice. Never interrupts flow.
#[derive(Debug, Clone, Default)]
pub struct NoticeResponse {
    pub notice: DatabaseError,
}

impl BackendMessage for NoticeResponse {
    const MSGTYPE: u8 = b'N';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { notice: DatabaseError::decode(body)? })
    }
}

/// `ErrorResponse`: a backend-reported error (§7 kind 2, not fatal to the
/// library itself).
#[derive(Debug, Clone, Default)]
pub struct ErrorResponse {
    pub error: DatabaseError,
}

impl BackendMessage for ErrorResponse {
    const MSGTYPE: u8 = b'E';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { error: DatabaseError::decode(body)? })
    }
}

impl BackendMessage for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        RowDescription::decode(body)
    }
}

/// `DataRow`: the raw columns of one result row, decoded without
/// reference to the current row description -- the caller (session
/// event assembly, §4.4) cross-checks the column count.
#[derive(Debug, Clone)]
pub struct DataRow {
    pub columns: Vec<Option<Bytes>>,
}

impl BackendMessage for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16();
        let mut columns = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let len = body.get_i32();
            if len == -1 {
                columns.push(None);
            } else {
                columns.push(Some(body.split_to(len as usize)));
            }
        }
        Ok(Self { columns })
    }
}

/// `CommandComplete`: the command tag of a just-completed SQL command.
#[derive(Debug, Clone)]
pub struct CommandComplete {
    pub tag: ByteStr,
}

impl BackendMessage for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tag: body.get_nul_bytestr()? })
    }
}

/// `NotificationResponse`: an asynchronous `NOTIFY`.
///
/// Bound to message code `A` under the correct name (§9 open question:
/// the described original source misspells/miskeys this message).
#[derive(Debug, Clone)]
pub struct NotificationResponse {
    pub process_id: i32,
    pub channel: ByteStr,
    pub payload: ByteStr,
}

impl BackendMessage for NotificationResponse {
    const MSGTYPE: u8 = b'A';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            process_id: body.get_i32(),
            channel: body.get_nul_bytestr()?,
            payload: body.get_nul_bytestr()?,
        })
    }
}

/// `ReadyForQuery`: backend transaction status (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyForQuery {
    /// `'I'` idle, `'T'` in transaction, `'E'` failed transaction.
    pub tx_status: u8,
}

impl BackendMessage for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { tx_status: body.get_u8() })
    }
}

/// `CopyInResponse` / `CopyOutResponse` / `CopyBothResponse` share a body
/// layout: overall format byte, column count, per-column format codes.
#[derive(Debug, Clone)]
pub struct CopyResponse {
    /// `0` = text overall, `1` = binary overall.
    pub format: u8,
    pub column_formats: Vec<i16>,
}

impl CopyResponse {
    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let format = body.get_u8();
        let count = body.get_i16();
        let mut column_formats = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            column_formats.push(body.get_i16());
        }
        Ok(Self { format, column_formats })
    }
}

#[derive(Debug, Clone)]
pub struct CopyInResponse(pub CopyResponse);

impl BackendMessage for CopyInResponse {
    const MSGTYPE: u8 = b'G';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self(CopyResponse::decode(body)?))
    }
}

#[derive(Debug, Clone)]
pub struct CopyOutResponse(pub CopyResponse);

impl BackendMessage for CopyOutResponse {
    const MSGTYPE: u8 = b'H';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self(CopyResponse::decode(body)?))
    }
}

#[derive(Debug, Clone)]
pub struct CopyBothResponse(pub CopyResponse);

impl BackendMessage for CopyBothResponse {
    const MSGTYPE: u8 = b'W';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self(CopyResponse::decode(body)?))
    }
}

/// `CopyData` in the backend direction: one chunk of COPY-out payload.
#[derive(Debug, Clone)]
pub struct CopyDataBody {
    pub data: Bytes,
}

impl BackendMessage for CopyDataBody {
    const MSGTYPE: u8 = b'd';

    fn decode(body: Bytes) -> Result<Self, ProtocolError> {
        Ok(Self { data: body })
    }
}

/// `FunctionCallResponse`: the result of a `FunctionCall` (legacy
/// protocol; surfaced but not otherwise used by this crate).
#[derive(Debug, Clone)]
pub struct FunctionCallResponse {
    pub value: Option<Bytes>,
}

impl BackendMessage for FunctionCallResponse {
    const MSGTYPE: u8 = b'V';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let len = body.get_i32();
        Ok(Self {
            value: if len == -1 { None } else { Some(body.split_to(len as usize)) },
        })
    }
}

/// `ParameterDescription`: the inferred parameter type OIDs of a prepared
/// statement.
#[derive(Debug, Clone)]
pub struct ParameterDescription {
    pub type_oids: Vec<i32>,
}

impl BackendMessage for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let count = body.get_i16();
        let mut type_oids = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            type_oids.push(body.get_i32());
        }
        Ok(Self { type_oids })
    }
}

unit_message! {
    /// `BindComplete`.
    struct BindComplete, b'2';
}
unit_message! {
    /// `CloseComplete`.
    struct CloseComplete, b'3';
}
unit_message! {
    /// `EmptyQueryResponse`: substitutes for `CommandComplete` on an
    /// empty query string (§8 scenario 4).
    struct EmptyQueryResponse, b'I';
}
unit_message! {
    /// `NoData`: the `Describe`d statement/portal returns no rows.
    struct NoData, b'n';
}
unit_message! {
    /// `ParseComplete`.
    struct ParseComplete, b'1';
}
unit_message! {
    /// `PortalSuspended`: an `Execute` row-count limit was reached.
    struct PortalSuspended, b's';
}
unit_message! {
    /// `CopyDone` in the backend direction.
    struct CopyDoneBody, b'c';
}

/// The closed set of backend messages this crate decodes, dispatched by
/// the leading type byte.
///
/// Mirrors the teacher's `BackendMessage` enum / `match_backend!` macro
/// (`qs/src/postgres/backend.rs`), generalized to a plain `match` since
/// this crate dispatches on a type byte already separated from its body
/// by the frame parser rather than generating accessor methods too.
#[derive(Debug, Clone)]
pub enum Backend {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    CopyData(CopyDataBody),
    CopyDone(CopyDoneBody),
    CopyInResponse(CopyInResponse),
    CopyOutResponse(CopyOutResponse),
    CopyBothResponse(CopyBothResponse),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    FunctionCallResponse(FunctionCallResponse),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

impl Backend {
    /// Decodes one backend frame given its type byte and body.
    ///
    /// An unrecognized type byte is a fatal protocol error (§4.4).
    pub fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        Ok(match msgtype {
            Authentication::MSGTYPE => Self::Authentication(Authentication::decode(body)?),
            BackendKeyData::MSGTYPE => Self::BackendKeyData(BackendKeyData::decode(body)?),
            BindComplete::MSGTYPE => Self::BindComplete(BindComplete::decode(body)?),
            CloseComplete::MSGTYPE => Self::CloseComplete(CloseComplete::decode(body)?),
            CommandComplete::MSGTYPE => Self::CommandComplete(CommandComplete::decode(body)?),
            NotificationResponse::MSGTYPE => {
                Self::NotificationResponse(NotificationResponse::decode(body)?)
            }
            EmptyQueryResponse::MSGTYPE => {
                Self::EmptyQueryResponse(EmptyQueryResponse::decode(body)?)
            }
            FunctionCallResponse::MSGTYPE => {
                Self::FunctionCallResponse(FunctionCallResponse::decode(body)?)
            }
            NoData::MSGTYPE => Self::NoData(NoData::decode(body)?),
            ParameterDescription::MSGTYPE => {
                Self::ParameterDescription(ParameterDescription::decode(body)?)
            }
            ParseComplete::MSGTYPE => Self::ParseComplete(ParseComplete::decode(body)?),
            PortalSuspended::MSGTYPE => Self::PortalSuspended(PortalSuspended::decode(body)?),
            ReadyForQuery::MSGTYPE => Self::ReadyForQuery(ReadyForQuery::decode(body)?),
            RowDescription::MSGTYPE => Self::RowDescription(RowDescription::decode(body)?),
            DataRow::MSGTYPE => Self::DataRow(DataRow::decode(body)?),
            CopyInResponse::MSGTYPE => Self::CopyInResponse(CopyInResponse::decode(body)?),
            CopyOutResponse::MSGTYPE => Self::CopyOutResponse(CopyOutResponse::decode(body)?),
            CopyBothResponse::MSGTYPE => Self::CopyBothResponse(CopyBothResponse::decode(body)?),
            ErrorResponse::MSGTYPE => Self::ErrorResponse(ErrorResponse::decode(body)?),
            NoticeResponse::MSGTYPE => Self::NoticeResponse(NoticeResponse::decode(body)?),
            ParameterStatus::MSGTYPE => Self::ParameterStatus(ParameterStatus::decode(body)?),
            CopyDataBody::MSGTYPE => Self::CopyData(CopyDataBody::decode(body)?),
            CopyDoneBody::MSGTYPE => Self::CopyDone(CopyDoneBody::decode(body)?),
            unknown => return Err(ProtocolError::unknown(unknown)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_md5_authentication_request() {
        // §8 scenario 1
        let mut body = bytes::BytesMut::new();
        body.extend_from_slice(&5i32.to_be_bytes());
        body.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let auth = Authentication::decode(body.freeze()).unwrap();
        assert_eq!(auth, Authentication::Md5Password { salt: [0xde, 0xad, 0xbe, 0xef] });
    }

    #[test]
    fn decodes_empty_query_response() {
        let msg = Backend::decode(b'I', Bytes::new()).unwrap();
        assert!(matches!(msg, Backend::EmptyQueryResponse(_)));
    }

    #[test]
    fn decodes_ready_for_query_states() {
        for (byte, expect) in [(b'I', b'I'), (b'T', b'T'), (b'E', b'E')] {
            let rfq = ReadyForQuery::decode(Bytes::copy_from_slice(&[byte])).unwrap();
            assert_eq!(rfq.tx_status, expect);
        }
    }

    #[test]
    fn decodes_error_response_fields() {
        // §8 scenario 5
        let mut body = bytes::BytesMut::new();
        body.extend_from_slice(b"SERROR\0");
        body.extend_from_slice(b"C42P01\0");
        body.extend_from_slice(b"Mrelation \"x\" does not exist\0");
        body.extend_from_slice(b"\0");
        let err = ErrorResponse::decode(body.freeze()).unwrap();
        assert_eq!(err.error.severity.as_deref(), Some("ERROR"));
        assert_eq!(err.error.code.as_deref(), Some("42P01"));
        assert_eq!(err.error.message.as_deref(), Some("relation \"x\" does not exist"));
    }

    #[test]
    fn unknown_notice_tag_is_fatal() {
        let mut body = bytes::BytesMut::new();
        body.extend_from_slice(b"Zbogus\0");
        body.extend_from_slice(b"\0");
        let err = ErrorResponse::decode(body.freeze()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownNoticeTag(b'Z')));
    }

    #[test]
    fn unknown_message_type_is_fatal() {
        let err = Backend::decode(0xff, Bytes::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(0xff)));
    }

    #[test]
    fn data_row_decodes_null_and_present_columns() {
        let mut body = bytes::BytesMut::new();
        body.extend_from_slice(&2i16.to_be_bytes());
        body.extend_from_slice(&1i32.to_be_bytes());
        body.extend_from_slice(b"1");
        body.extend_from_slice(&(-1i32).to_be_bytes());
        let row = DataRow::decode(body.freeze()).unwrap();
        assert_eq!(row.columns.len(), 2);
        assert_eq!(row.columns[0].as_deref(), Some(&b"1"[..]));
        assert_eq!(row.columns[1], None);
    }
}
