//! Event dispatch.
//!
//! The public contract is a closed set of named events, each carrying a
//! typed payload (§6 Events). [`Session::handle_message`][crate::session::Session::handle_message]
//! decodes one frame and fires exactly the event(s) that frame implies,
//! in wire order, before returning (§5 ordering guarantee).
//!
//! Dispatch is a plain `match` over [`EventKind`] rather than a
//! duck-typed method-name lookup (§9 re-architecture guidance), mirroring
//! the closed-enum dispatch the teacher crate already uses for backend
//! messages (`qs/src/postgres/backend.rs`'s `match_backend!`).

use crate::common::ByteStr;
use crate::error::DatabaseError;
use crate::message::backend::{
    BackendKeyData, CopyResponse, FunctionCallResponse, ParameterDescription,
};
use crate::row_description::RowDescription;

/// One of the named events an embedder can attach a handler to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SendRequest,
    Authenticated,
    Password,
    RequestReady,
    ReadyForQuery,
    BackendKeyData,
    ParameterStatus,
    ParameterDescription,
    RowDescription,
    DataRow,
    CommandComplete,
    EmptyQuery,
    NoData,
    ParseComplete,
    BindComplete,
    CloseComplete,
    PortalSuspended,
    CopyInResponse,
    CopyOutResponse,
    CopyBothResponse,
    CopyData,
    CopyDone,
    CopyFail,
    Notification,
    Notice,
    Error,
    FunctionCallResponse,
}

/// A fired event, carrying the typed payload named in §6.
#[derive(Debug, Clone)]
pub enum Event {
    /// A frontend frame is about to be written to the outgoing buffer.
    SendRequest { msgtype: Option<u8> },
    /// AuthenticationOk was received.
    Authenticated,
    /// A PasswordMessage was built in response to an authentication
    /// request.
    Password,
    /// The session reached `Ready` after the startup phase.
    RequestReady,
    ReadyForQuery { tx_status: u8 },
    BackendKeyData(BackendKeyData),
    ParameterStatus { name: ByteStr, value: ByteStr },
    ParameterDescription(ParameterDescription),
    RowDescription(RowDescription),
    DataRow { columns: Vec<Option<bytes::Bytes>> },
    CommandComplete { tag: ByteStr },
    EmptyQuery,
    NoData,
    ParseComplete,
    BindComplete,
    CloseComplete,
    PortalSuspended,
    CopyInResponse(CopyResponse),
    CopyOutResponse(CopyResponse),
    CopyBothResponse(CopyResponse),
    CopyData { data: bytes::Bytes },
    CopyDone,
    CopyFail { message: ByteStr },
    Notification { process_id: i32, channel: ByteStr, payload: ByteStr },
    Notice(DatabaseError),
    Error(DatabaseError),
    FunctionCallResponse(FunctionCallResponse),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SendRequest { .. } => EventKind::SendRequest,
            Event::Authenticated => EventKind::Authenticated,
            Event::Password => EventKind::Password,
            Event::RequestReady => EventKind::RequestReady,
            Event::ReadyForQuery { .. } => EventKind::ReadyForQuery,
            Event::BackendKeyData(_) => EventKind::BackendKeyData,
            Event::ParameterStatus { .. } => EventKind::ParameterStatus,
            Event::ParameterDescription(_) => EventKind::ParameterDescription,
            Event::RowDescription(_) => EventKind::RowDescription,
            Event::DataRow { .. } => EventKind::DataRow,
            Event::CommandComplete { .. } => EventKind::CommandComplete,
            Event::EmptyQuery => EventKind::EmptyQuery,
            Event::NoData => EventKind::NoData,
            Event::ParseComplete => EventKind::ParseComplete,
            Event::BindComplete => EventKind::BindComplete,
            Event::CloseComplete => EventKind::CloseComplete,
            Event::PortalSuspended => EventKind::PortalSuspended,
            Event::CopyInResponse(_) => EventKind::CopyInResponse,
            Event::CopyOutResponse(_) => EventKind::CopyOutResponse,
            Event::CopyBothResponse(_) => EventKind::CopyBothResponse,
            Event::CopyData { .. } => EventKind::CopyData,
            Event::CopyDone => EventKind::CopyDone,
            Event::CopyFail { .. } => EventKind::CopyFail,
            Event::Notification { .. } => EventKind::Notification,
            Event::Notice(_) => EventKind::Notice,
            Event::Error(_) => EventKind::Error,
            Event::FunctionCallResponse(_) => EventKind::FunctionCallResponse,
        }
    }
}

/// A registered event handler.
pub type Handler = Box<dyn FnMut(&Event) + Send>;

/// The handler registry a [`crate::session::Session`] owns: one optional
/// handler per event kind.
#[derive(Default)]
pub struct EventHandlers {
    handlers: Vec<(EventKind, Handler)>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Registers `handler` for `kind`, replacing any previous handler for
    /// that kind.
    pub fn attach(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.retain(|(k, _)| *k != kind);
        self.handlers.push((kind, handler));
    }

    /// Fires `event` against whichever handler is attached to its kind,
    /// if any.
    pub fn fire(&mut self, event: &Event) {
        let kind = event.kind();
        for (k, handler) in &mut self.handlers {
            if *k == kind {
                handler(event);
            }
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("attached", &self.handlers.len())
            .finish()
    }
}
