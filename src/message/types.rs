//! Message type tables.
//!
//! Static bidirectional maps between message-type names and their
//! single-byte wire codes, kept separate from the builders/decoders so the
//! set of known message types can be inspected or logged without pulling
//! in every message's field layout.
//!
//! Mirrors the generated-table role that the teacher crate's
//! `match_backend!` macro plays for the backend direction
//! (`qs/src/postgres/backend.rs`), generalized here to a plain static
//! table covering both directions.

/// `(name, wire code)` for every frontend (client-to-server) message type.
///
/// `Startup` has no entry: it is the one untyped frame (§3 Message frame)
/// and carries no type byte at all.
pub static FRONTEND_MESSAGES: &[(&str, u8)] = &[
    ("Bind", b'B'),
    ("Close", b'C'),
    ("CopyData", b'd'),
    ("CopyDone", b'c'),
    ("CopyFail", b'f'),
    ("Describe", b'D'),
    ("Execute", b'E'),
    ("Flush", b'H'),
    ("Parse", b'P'),
    ("PasswordMessage", b'p'),
    ("Query", b'Q'),
    ("Sync", b'S'),
    ("Terminate", b'X'),
];

/// `(name, wire code)` for every backend (server-to-client) message type
/// this crate knows how to decode.
pub static BACKEND_MESSAGES: &[(&str, u8)] = &[
    ("Authentication", b'R'),
    ("BackendKeyData", b'K'),
    ("BindComplete", b'2'),
    ("CloseComplete", b'3'),
    ("CommandComplete", b'C'),
    ("CopyData", b'd'),
    ("CopyDone", b'c'),
    ("CopyInResponse", b'G'),
    ("CopyOutResponse", b'H'),
    ("CopyBothResponse", b'W'),
    ("DataRow", b'D'),
    ("EmptyQueryResponse", b'I'),
    ("ErrorResponse", b'E'),
    ("FunctionCallResponse", b'V'),
    ("NoData", b'n'),
    ("NoticeResponse", b'N'),
    ("NotificationResponse", b'A'),
    ("ParameterDescription", b't'),
    ("ParameterStatus", b'S'),
    ("ParseComplete", b'1'),
    ("PortalSuspended", b's'),
    ("ReadyForQuery", b'Z'),
    ("RowDescription", b'T'),
];

/// Looks up the wire code for a named frontend message.
pub fn frontend_code(name: &str) -> Option<u8> {
    FRONTEND_MESSAGES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, code)| *code)
}

/// Looks up the logical name for a backend wire code.
///
/// Several backend codes are shared between message types that are never
/// ambiguous in context (`CopyData`/`CopyDone` also appear as frontend
/// codes; `'C'`/`'S'`/`'D'`/`'E'`/`'H'` are reused between the two
/// directions). This function only resolves the backend direction.
pub fn backend_name(code: u8) -> Option<&'static str> {
    BACKEND_MESSAGES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_table_round_trips() {
        assert_eq!(frontend_code("Query"), Some(b'Q'));
        assert_eq!(frontend_code("Bind"), Some(b'B'));
        assert_eq!(frontend_code("Nonexistent"), None);
    }

    #[test]
    fn backend_table_round_trips() {
        assert_eq!(backend_name(b'R'), Some("Authentication"));
        assert_eq!(backend_name(b'T'), Some("RowDescription"));
        assert_eq!(backend_name(b'A'), Some("NotificationResponse"));
    }
}
