//! Session state and state machine (§3 Session, §4.5, §6 external interfaces).
//!
//! [`Session`] is the whole public surface of this crate for a running
//! connection: it owns the outgoing scratch buffer, the receive buffer,
//! the authentication and backend-transaction state, the current row
//! description, and the event handler registry. It performs no I/O --
//! the embedder feeds it bytes read from the socket via
//! [`Session::handle_message`] and drains its outgoing buffer via
//! [`Session::take_outgoing`] (§5 concurrency model: synchronous,
//! single-threaded, no suspension points).
//!
//! Grounded on `qs/src/protocol.rs`'s `startup`/`simple_query`/
//! `extended_query` functions for the shape of the state progression
//! (startup loop, ready/busy cycle, extended-query message series),
//! restructured from async functions driving an `PostgresIo` trait into
//! a synchronous state machine driven by `handle_message`/explicit
//! `send_*` methods, per the re-architecture guidance that the core
//! perform no I/O and no blocking.

use bytes::{Bytes, BytesMut};

use crate::auth::md5_password;
use crate::error::{Error, ProtocolError, Result, UsageError};
use crate::events::{Event, EventHandlers, EventKind, Handler};
use crate::frame::RecvBuffer;
use crate::message::backend::{Authentication, Backend};
use crate::message::frontend::{
    CopyData, CopyDone, CopyFail, Flush, FrontendMessage, PasswordMessage, Query, Startup, Sync,
    Terminate, write_frame,
};
use crate::row_description::RowDescription;
use crate::startup::StartupOptions;

/// Top-level connection state (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshake,
    AuthPending,
    Authenticated,
    Ready,
    Busy,
    CopyIn,
    CopyOut,
    Terminated,
}

/// The authentication method negotiated with the backend, and whatever
/// extra data (the md5 salt) that method requires to build a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMode {
    Cleartext,
    Md5 { salt: [u8; 4] },
}

fn auth_sub_code_name(sub_code: i32) -> &'static str {
    match sub_code {
        2 => "KerberosV5",
        6 => "SCMCredential",
        7 => "GSS",
        8 => "GSSContinue",
        9 => "SSPI",
        10 => "SASL",
        11 => "SASLContinue",
        12 => "SASLFinal",
        _ => "unknown",
    }
}

/// A closed set of frontend messages with no dedicated strongly-typed
/// `Session` method of their own (§6: `send_message(type, params…)`
/// generic builder dispatch), generalized from the described
/// name-string dispatch to a closed enum per the re-architecture
/// guidance.
pub enum SendMessage<'a> {
    Query { sql: &'a str },
    Flush,
    Sync,
    Terminate,
    CopyData { data: Bytes },
    CopyDone,
    CopyFail { message: &'a str },
}

/// A running Postgres wire-protocol connection (§3).
pub struct Session {
    user: String,
    database: Option<String>,
    configured_password: Option<String>,
    state: SessionState,
    password_mode: Option<PasswordMode>,
    tx_status: u8,
    row_description: RowDescription,
    parameters: Vec<(String, String)>,
    backend_key_data: Option<crate::message::backend::BackendKeyData>,
    events: EventHandlers,
    recv: RecvBuffer,
    out: BytesMut,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            user: String::new(),
            database: None,
            configured_password: None,
            state: SessionState::Handshake,
            password_mode: None,
            tx_status: b'I',
            row_description: RowDescription::default(),
            parameters: Vec::new(),
            backend_key_data: None,
            events: EventHandlers::new(),
            recv: RecvBuffer::new(),
            out: BytesMut::new(),
        }
    }

    /// Emits the StartupMessage (§4.2). Must be the very first frame
    /// sent; fails otherwise.
    pub fn initial_request(&mut self, options: &StartupOptions<'_>) -> Result<()> {
        if self.state != SessionState::Handshake {
            return Err(ProtocolError::StartupNotFirst.into());
        }
        self.user = options.user().to_string();
        self.database = options.database().map(str::to_string);
        self.configured_password = options.password().map(str::to_string);
        Startup {
            user: options.user(),
            database: options.database(),
            options: None,
            replication: options.replication(),
        }
        .write(&mut self.out);
        self.events.fire(&Event::SendRequest { msgtype: None });
        self.state = SessionState::AuthPending;
        #[cfg(feature = "log")]
        log::info!("startup requested for user {:?}", options.user());
        Ok(())
    }

    /// The password passed to [`Session::initial_request`] via
    /// [`StartupOptions::set_password`], if any. Not sent automatically
    /// -- the embedder still calls [`Session::send_password`] once the
    /// backend's `password` event fires, but need not thread the
    /// password through separately to do so.
    pub fn configured_password(&self) -> Option<&str> {
        self.configured_password.as_deref()
    }

    /// Generic dispatch for frontend messages without a dedicated
    /// strongly-typed method (§6).
    pub fn send_message(&mut self, msg: SendMessage<'_>) -> Result<()> {
        match msg {
            SendMessage::Query { sql } => self.simple_query(sql)?,
            SendMessage::Flush => self.write_frame(&Flush),
            SendMessage::Sync => self.sync(),
            SendMessage::Terminate => {
                self.write_frame(&Terminate);
                self.state = SessionState::Terminated;
                #[cfg(feature = "log")]
                log::info!("session terminated");
            }
            SendMessage::CopyData { data } => self.copy_data(data),
            SendMessage::CopyDone => self.copy_done(),
            SendMessage::CopyFail { message } => self.copy_fail(message),
        }
        Ok(())
    }

    /// Runs `sql` through the simple query protocol. Refuses if the
    /// backend transaction state is `error` (§7 kind 3).
    pub fn simple_query(&mut self, sql: &str) -> Result<()> {
        self.check_writable("simple_query")?;
        self.write_frame(&Query { sql });
        self.state = SessionState::Busy;
        Ok(())
    }

    /// Sends a password in response to a pending authentication
    /// request, applying md5 salting if that is the negotiated method.
    pub fn send_password(&mut self, password: &str) -> Result<()> {
        let mode = self
            .password_mode
            .ok_or(UsageError::MissingArgument { what: "send_password", field: "password_mode" })?;
        let payload = match mode {
            PasswordMode::Cleartext => password.to_string(),
            PasswordMode::Md5 { salt } => md5_password(&self.user, password, salt),
        };
        self.write_frame(&PasswordMessage { password: &payload });
        Ok(())
    }

    /// Sends one chunk of raw COPY-in payload.
    pub fn copy_data(&mut self, data: Bytes) {
        self.write_frame(&CopyData { data });
    }

    /// Ends a COPY-in operation successfully.
    pub fn copy_done(&mut self) {
        self.write_frame(&CopyDone);
        if self.state == SessionState::CopyIn {
            self.state = SessionState::Busy;
        }
    }

    /// Aborts a COPY-in operation with an error message.
    pub fn copy_fail(&mut self, message: &str) {
        self.write_frame(&CopyFail { message });
        if self.state == SessionState::CopyIn {
            self.state = SessionState::Busy;
        }
    }

    /// Encodes `cells` as one COPY text-format row (§4.7) and sends it as
    /// a `CopyData` chunk.
    pub fn send_copy_data(&mut self, cells: &[Option<&str>]) {
        let row = crate::copy::encode_copy_row(cells);
        self.copy_data(Bytes::from(row.into_bytes()));
    }

    /// Ends an extended-query message series.
    pub fn sync(&mut self) {
        self.write_frame(&Sync);
    }

    /// Feeds raw bytes read from the transport and processes every
    /// complete frame they contain, firing events for each in wire order
    /// before returning (§5 ordering guarantee). Returns the events
    /// fired, in order, in addition to invoking any attached handlers.
    pub fn handle_message(&mut self, bytes: &[u8]) -> Result<Vec<Event>> {
        self.recv.extend(bytes);
        let mut fired = Vec::new();
        while let Some(frame) = self.recv.next_frame() {
            #[cfg(feature = "verbose")]
            tracing::trace!(
                msgtype = %(frame.msgtype as char),
                name = crate::message::types::backend_name(frame.msgtype).unwrap_or("?"),
                "decoding backend frame",
            );
            if let Err(err) = self.decode_and_apply(frame, &mut fired) {
                #[cfg(feature = "log")]
                log::error!("fatal protocol error, session cannot continue: {err}");
                self.state = SessionState::Terminated;
                return Err(err);
            }
        }
        Ok(fired)
    }

    fn decode_and_apply(&mut self, frame: crate::frame::Frame, fired: &mut Vec<Event>) -> Result<()> {
        let backend = Backend::decode(frame.msgtype, frame.body)?;
        self.apply(backend, fired)
    }

    /// The length declared by the next frame's header, or `None` if
    /// fewer than 5 bytes have accumulated to read it yet (§4.3).
    pub fn message_length(&self) -> Option<usize> {
        self.recv.message_length()
    }

    /// Bytes still needed before the next frame is complete and can be
    /// decoded -- a convenience beyond the core §4.3 definition, for an
    /// embedder sizing its next socket read.
    pub fn bytes_needed(&self) -> usize {
        self.recv.bytes_needed()
    }

    /// Registers `handler` to run whenever an event of `kind` fires.
    pub fn attach_event(&mut self, kind: EventKind, handler: Handler) {
        self.events.attach(kind, handler);
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated
                | SessionState::Ready
                | SessionState::Busy
                | SessionState::CopyIn
                | SessionState::CopyOut
        )
    }

    /// The backend's last-reported transaction status: `I` idle, `T` in
    /// transaction, `E` failed transaction.
    pub fn backend_state(&self) -> u8 {
        self.tx_status
    }

    pub fn row_description(&self) -> &RowDescription {
        &self.row_description
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Takes and clears the bytes queued for the transport.
    pub fn take_outgoing(&mut self) -> Bytes {
        std::mem::take(&mut self.out).freeze()
    }

    pub(crate) fn set_row_description(&mut self, description: RowDescription) {
        self.row_description = description;
    }

    pub(crate) fn write_frame<M: FrontendMessage>(&mut self, msg: &M) {
        write_frame(msg, &mut self.out);
        self.events.fire(&Event::SendRequest { msgtype: Some(M::MSGTYPE) });
    }

    fn check_writable(&self, attempted: &'static str) -> Result<()> {
        if self.tx_status == b'E' {
            return Err(UsageError::InvalidBackendState { attempted }.into());
        }
        Ok(())
    }

    fn apply(&mut self, backend: Backend, fired: &mut Vec<Event>) -> Result<()> {
        let event = match backend {
            Backend::Authentication(Authentication::Ok) => {
                self.state = SessionState::Authenticated;
                #[cfg(feature = "log")]
                log::info!("authentication succeeded for user {:?}", self.user);
                Event::Authenticated
            }
            Backend::Authentication(Authentication::CleartextPassword) => {
                self.password_mode = Some(PasswordMode::Cleartext);
                Event::Password
            }
            Backend::Authentication(Authentication::Md5Password { salt }) => {
                self.password_mode = Some(PasswordMode::Md5 { salt });
                Event::Password
            }
            Backend::Authentication(Authentication::Unsupported { sub_code }) => {
                return Err(ProtocolError::UnsupportedAuth(auth_sub_code_name(sub_code)).into());
            }
            Backend::BackendKeyData(data) => {
                self.backend_key_data = Some(data);
                Event::BackendKeyData(data)
            }
            Backend::ParameterStatus(status) => {
                let name = status.name.to_string();
                let value = status.value.to_string();
                self.parameters.retain(|(n, _)| n != &name);
                self.parameters.push((name.clone(), value.clone()));
                Event::ParameterStatus { name: status.name, value: status.value }
            }
            Backend::ParameterDescription(desc) => Event::ParameterDescription(desc),
            Backend::RowDescription(desc) => {
                self.row_description = desc.clone();
                Event::RowDescription(desc)
            }
            Backend::DataRow(row) => {
                if row.columns.len() != self.row_description.len() {
                    return Err(ProtocolError::RowColumnCountMismatch {
                        expected: self.row_description.len(),
                        found: row.columns.len(),
                    }
                    .into());
                }
                Event::DataRow { columns: row.columns }
            }
            Backend::CommandComplete(complete) => Event::CommandComplete { tag: complete.tag },
            Backend::EmptyQueryResponse(_) => Event::EmptyQuery,
            Backend::NoData(_) => Event::NoData,
            Backend::ParseComplete(_) => Event::ParseComplete,
            Backend::BindComplete(_) => Event::BindComplete,
            Backend::CloseComplete(_) => Event::CloseComplete,
            Backend::PortalSuspended(_) => Event::PortalSuspended,
            Backend::CopyInResponse(resp) => {
                self.state = SessionState::CopyIn;
                #[cfg(feature = "log")]
                log::debug!("session state: -> CopyIn");
                Event::CopyInResponse(resp.0)
            }
            Backend::CopyOutResponse(resp) => {
                self.state = SessionState::CopyOut;
                #[cfg(feature = "log")]
                log::debug!("session state: -> CopyOut");
                Event::CopyOutResponse(resp.0)
            }
            Backend::CopyBothResponse(resp) => Event::CopyBothResponse(resp.0),
            Backend::CopyData(data) => Event::CopyData { data: data.data },
            Backend::CopyDone(_) => {
                if matches!(self.state, SessionState::CopyIn | SessionState::CopyOut) {
                    self.state = SessionState::Busy;
                }
                Event::CopyDone
            }
            Backend::FunctionCallResponse(resp) => Event::FunctionCallResponse(resp),
            Backend::NotificationResponse(notif) => Event::Notification {
                process_id: notif.process_id,
                channel: notif.channel,
                payload: notif.payload,
            },
            Backend::NoticeResponse(notice) => {
                #[cfg(feature = "log")]
                log::warn!("{}", notice.notice);
                Event::Notice(notice.notice)
            }
            Backend::ErrorResponse(error) => {
                #[cfg(feature = "log")]
                log::error!("{}", error.error);
                Event::Error(error.error)
            }
            Backend::ReadyForQuery(rfq) => {
                self.tx_status = rfq.tx_status;
                let leaving_startup = self.state == SessionState::Authenticated;
                #[cfg(feature = "log")]
                log::debug!(
                    "session state: {:?} -> Ready (tx_status {:?})",
                    self.state,
                    rfq.tx_status as char
                );
                self.state = SessionState::Ready;
                if leaving_startup {
                    #[cfg(feature = "log")]
                    log::info!("session ready to accept queries");
                    fired.push(Event::RequestReady);
                    self.events.fire(&Event::RequestReady);
                }
                Event::ReadyForQuery { tx_status: rfq.tx_status }
            }
        };
        self.events.fire(&event);
        fired.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn startup_and_auth_ok(session: &mut Session) {
        session
            .initial_request(&StartupOptions::new("alice").set_database("db"))
            .unwrap();
        let mut ok = BytesMut::new();
        ok.extend_from_slice(&[b'R']);
        ok.extend_from_slice(&9u32.to_be_bytes());
        ok.extend_from_slice(&0i32.to_be_bytes());
        session.handle_message(&ok).unwrap();
    }

    #[test]
    fn startup_transitions_to_auth_pending() {
        let mut session = Session::new();
        session.initial_request(&StartupOptions::new("alice")).unwrap();
        assert_eq!(session.state(), SessionState::AuthPending);
        assert!(!session.take_outgoing().is_empty());
    }

    #[test]
    fn double_startup_is_rejected() {
        let mut session = Session::new();
        session.initial_request(&StartupOptions::new("alice")).unwrap();
        let err = session.initial_request(&StartupOptions::new("alice")).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::StartupNotFirst)));
    }

    #[test]
    fn configured_password_is_remembered_but_not_sent() {
        let mut session = Session::new();
        let before = session.take_outgoing().len();
        session
            .initial_request(&StartupOptions::new("alice").set_password("secret"))
            .unwrap();
        assert_eq!(session.configured_password(), Some("secret"));
        assert_eq!(before, 0);
    }

    #[test]
    fn full_startup_sequence_reaches_ready() {
        let mut session = Session::new();
        startup_and_auth_ok(&mut session);
        assert_eq!(session.state(), SessionState::Authenticated);

        let mut key_data = BytesMut::new();
        key_data.extend_from_slice(&[b'K']);
        key_data.extend_from_slice(&12u32.to_be_bytes());
        key_data.extend_from_slice(&1234i32.to_be_bytes());
        key_data.extend_from_slice(&5678i32.to_be_bytes());
        session.handle_message(&key_data).unwrap();

        let mut ready = BytesMut::new();
        ready.extend_from_slice(&[b'Z']);
        ready.extend_from_slice(&5u32.to_be_bytes());
        ready.extend_from_slice(&[b'I']);
        let events = session.handle_message(&ready).unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        assert!(events.iter().any(|e| matches!(e, Event::RequestReady)));
        assert!(events.iter().any(|e| matches!(e, Event::ReadyForQuery { .. })));
        assert!(session.is_authenticated());
    }

    #[test]
    fn simple_query_is_refused_in_error_state() {
        let mut session = Session::new();
        startup_and_auth_ok(&mut session);
        session.tx_status = b'E';
        session.state = SessionState::Ready;
        let err = session.simple_query("select 1").unwrap_err();
        assert!(matches!(
            err,
            Error::Usage(UsageError::InvalidBackendState { attempted: "simple_query" })
        ));
    }

    #[test]
    fn data_row_column_count_mismatch_is_fatal() {
        let mut session = Session::new();
        session.row_description = RowDescription { fields: vec![] };
        let mut row = BytesMut::new();
        row.extend_from_slice(&[b'D']);
        row.extend_from_slice(&8u32.to_be_bytes());
        row.extend_from_slice(&1i16.to_be_bytes());
        row.extend_from_slice(&(-1i32).to_be_bytes());
        let err = session.handle_message(&row).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::RowColumnCountMismatch { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn unsupported_authentication_is_fatal() {
        let mut session = Session::new();
        let mut body = BytesMut::new();
        body.extend_from_slice(&[b'R']);
        body.extend_from_slice(&8u32.to_be_bytes());
        body.extend_from_slice(&7i32.to_be_bytes());
        let err = session.handle_message(&body).unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::UnsupportedAuth("GSS"))));
    }

    #[test]
    fn md5_password_round_trip_matches_known_vector() {
        let mut session = Session::new();
        session.initial_request(&StartupOptions::new("alice")).unwrap();
        session.take_outgoing();

        let mut auth = BytesMut::new();
        auth.extend_from_slice(&[b'R']);
        auth.extend_from_slice(&12u32.to_be_bytes());
        auth.extend_from_slice(&5i32.to_be_bytes());
        auth.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        session.handle_message(&auth).unwrap();

        session.send_password("secret").unwrap();
        let out = session.take_outgoing();
        assert_eq!(out[0], b'p');
        let expected = md5_password("alice", "secret", [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&out[5..out.len() - 1], expected.as_bytes());
    }
}
