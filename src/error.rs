//! Error layering.
//!
//! Three independent failure families, matching the three error kinds a
//! sans-I/O protocol state machine can produce: a fatal decode failure
//! ([`ProtocolError`]), a server-reported error ([`DatabaseError`]), and a
//! caller misuse ([`UsageError`]). They are unified behind one top-level
//! [`Error`] so the embedder has a single type to match on, while each
//! sub-error stays meaningful on its own (e.g. [`DatabaseError`] is handed
//! out directly in `error` events).

use bytes::Bytes;

use crate::codec::{BytesExt, NulStringError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error this crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fatal, unrecoverable decode failure. The session must not
    /// continue once this occurs.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The backend reported an error (`ErrorResponse`). Not fatal to the
    /// session -- the backend will follow with `ReadyForQuery('E')`.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// The embedder called an operation incorrectly (missing argument,
    /// write attempted while the backend transaction state is `error`).
    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Unrecoverable protocol decode failure.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown backend message type byte {0:#04x} ({0:?})")]
    UnknownMessageType(u8),

    #[error("expected message type {expected:#04x}, found {found:#04x}")]
    UnexpectedMessageType { expected: u8, found: u8 },

    #[error("authentication method {0} is not supported")]
    UnsupportedAuth(&'static str),

    #[error(
        "DataRow has {found} columns but the current RowDescription declares {expected}"
    )]
    RowColumnCountMismatch { expected: usize, found: usize },

    #[error("unknown notice/error field tag {0:#04x} ({0:?})")]
    UnknownNoticeTag(u8),

    #[error("startup message built after the first frontend message was already sent")]
    StartupNotFirst,

    #[error(transparent)]
    NulString(#[from] NulStringError),
}

impl ProtocolError {
    pub(crate) fn unknown(msgtype: u8) -> Self {
        Self::UnknownMessageType(msgtype)
    }

    pub(crate) fn unexpected(expected: u8, found: u8) -> Self {
        Self::UnexpectedMessageType { expected, found }
    }
}

/// A decoded `ErrorResponse`/`NoticeResponse` notice map.
///
/// Recognized tags (§3 of the specification): `S` severity, `C` code, `M`
/// message, `D` detail, `H` hint, `P` position, `p` internal_position,
/// `q` internal_query, `W` where, `F` file, `L` line, `R` routine.
#[derive(Debug, Clone, Default, thiserror::Error)]
#[error("{}", self.message().unwrap_or("postgres reported an error"))]
pub struct DatabaseError {
    pub severity: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<String>,
    pub internal_position: Option<String>,
    pub internal_query: Option<String>,
    pub where_: Option<String>,
    pub file: Option<String>,
    pub line: Option<String>,
    pub routine: Option<String>,
}

impl DatabaseError {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Decodes the repeated `(tag byte, NUL-terminated string)` notice
    /// fields, terminated by a zero tag byte. An unrecognized tag is a
    /// fatal protocol error (§3 Notice fields).
    pub(crate) fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        use bytes::Buf;

        let mut out = DatabaseError::default();
        loop {
            let tag = body.get_u8();
            if tag == 0 {
                break;
            }
            let value = body
                .get_nul_bytestr()
                .map_err(ProtocolError::from)?
                .to_string();
            match tag {
                b'S' => out.severity = Some(value),
                b'C' => out.code = Some(value),
                b'M' => out.message = Some(value),
                b'D' => out.detail = Some(value),
                b'H' => out.hint = Some(value),
                b'P' => out.position = Some(value),
                b'p' => out.internal_position = Some(value),
                b'q' => out.internal_query = Some(value),
                b'W' => out.where_ = Some(value),
                b'F' => out.file = Some(value),
                b'L' => out.line = Some(value),
                b'R' => out.routine = Some(value),
                unknown => return Err(ProtocolError::UnknownNoticeTag(unknown)),
            }
        }
        Ok(out)
    }
}

/// The embedder misused the public API.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("{what} requires {field} to be set")]
    MissingArgument {
        what: &'static str,
        field: &'static str,
    },

    #[error("cannot {attempted}: backend transaction state is error until cleared by Sync")]
    InvalidBackendState { attempted: &'static str },

    #[error("cannot {attempted}: session is not yet authenticated")]
    NotAuthenticated { attempted: &'static str },
}
