//! Session construction options (§2a Configuration).
//!
//! An explicit, in-process options type rather than a parsed connection
//! URL or environment lookup -- URL/env parsing is a connection-
//! establishment concern the embedder owns (§1 Non-goals). The *shape*
//! of the type follows `qs/src/connection/startup.rs`'s `StartupConfig`:
//! a builder over `Cow<str>` fields so a caller can pass either a
//! borrowed `&str` or an owned `String` without forcing an allocation
//! on the borrowed path.

use std::borrow::Cow;

/// Options for [`crate::session::Session::initial_request`] (§4.2
/// StartupMessage, §8 MD5 scenario).
///
/// `user` is required; `database`, `password`, and `replication` are
/// optional and default to unset. `password` is never placed on the
/// wire by `initial_request` itself -- the startup message carries no
/// password field -- it is only remembered so the embedder can read it
/// back via [`StartupOptions::password`] when answering the backend's
/// `password` event, instead of having to thread it through separately.
pub struct StartupOptions<'a> {
    user: Cow<'a, str>,
    database: Option<Cow<'a, str>>,
    password: Option<Cow<'a, str>>,
    replication: Option<Cow<'a, str>>,
}

impl<'a> StartupOptions<'a> {
    /// Creates options for `user`, the database user name to connect as.
    pub fn new(user: impl Into<Cow<'a, str>>) -> Self {
        Self { user: user.into(), database: None, password: None, replication: None }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The database to connect to. Defaults to the user name.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// The database to connect to. Defaults to the user name.
    pub fn set_database(mut self, database: impl Into<Cow<'a, str>>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// The password to answer a pending authentication request with.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// The password to answer a pending authentication request with.
    pub fn set_password(mut self, password: impl Into<Cow<'a, str>>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Used to connect in streaming replication mode, where a small set
    /// of replication commands can be issued instead of SQL statements.
    ///
    /// Value can be `true`, `false`, or `database`; unset behaves as
    /// `false`. See the Postgres streaming replication protocol docs
    /// for details. Sent as the `replication` startup run-time
    /// parameter, same as `options`.
    pub fn replication(&self) -> Option<&str> {
        self.replication.as_deref()
    }

    pub fn set_replication(mut self, replication: impl Into<Cow<'a, str>>) -> Self {
        self.replication = Some(replication.into());
        self
    }
}
