//! Sans-I/O codec and state machine for the Postgres wire protocol v3.
//!
//! This crate performs no socket I/O of its own. The embedder owns the
//! transport; it feeds received bytes into [`Session::handle_message`]
//! and writes whatever [`Session::take_outgoing`] returns to the socket.
//! Everything in between -- message framing, authentication, the
//! extended query protocol, COPY text encoding -- is a pure, synchronous
//! function over the session's state.
//!
//! ```no_run
//! use pgwire_machine::{Session, StartupOptions};
//!
//! let mut session = Session::new();
//! session.initial_request(&StartupOptions::new("alice").set_database("postgres"))?;
//! // write session.take_outgoing() to the socket, read a response into `buf`...
//! # let buf: &[u8] = &[];
//! let events = session.handle_message(buf)?;
//! for event in &events {
//!     println!("{event:?}");
//! }
//! # Ok::<(), pgwire_machine::Error>(())
//! ```

pub mod auth;
pub mod codec;
pub mod common;
pub mod copy;
pub mod error;
pub mod events;
pub mod frame;
pub mod message;
pub mod row_description;
pub mod session;
pub mod startup;
pub mod statement;

pub use error::{DatabaseError, Error, ProtocolError, Result, UsageError};
pub use events::{Event, EventKind};
pub use row_description::{FieldDescription, RowDescription};
pub use session::{PasswordMode, SendMessage, Session, SessionState};
pub use startup::StartupOptions;
pub use statement::PreparedStatement;
