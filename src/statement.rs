//! Prepared-statement façade (§3 Prepared statement, §4.6).
//!
//! A [`PreparedStatement`] is plain data: a statement name and whatever
//! row description the backend has described back to it. It carries no
//! reference to the session that created it -- every operation instead
//! takes the session explicitly, an application of the non-owning
//! back-reference / explicit-handle pattern the re-architecture guidance
//! calls for when a parent/child relationship would otherwise need
//! shared ownership.
//!
//! Grounded on `qs/src/statement.rs`'s `Statement<'a>` (plain borrowed
//! data, no connection handle), generalized from its fixed-size
//! `MAX_QUERY_BIND` array to an owned `Vec` since this crate carries no
//! such budget constraint.

use crate::message::frontend::{Bind, Close, Describe, Execute, Parse};
use crate::row_description::RowDescription;
use crate::session::Session;

/// A statement name: empty selects the unnamed prepared statement.
pub type StatementName = String;

/// A prepared statement handle (§3).
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    name: StatementName,
    row_description: Option<RowDescription>,
}

impl PreparedStatement {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The row description the backend last sent back for this
    /// statement, if any `Describe` has been issued and answered.
    pub fn row_description(&self) -> Option<&RowDescription> {
        self.row_description.as_ref()
    }

    /// Records a row description received in response to `Describe`.
    ///
    /// The session holds no collection of statements (§3: "the session
    /// owns no statements"), so it cannot associate an incoming
    /// `RowDescription` event back to the statement that requested it --
    /// that association is the embedder's responsibility, made here.
    pub fn set_row_description(&mut self, description: RowDescription) {
        self.row_description = Some(description);
    }
}

impl Session {
    /// Prepares `sql` under the unnamed statement, emitting `Parse`
    /// immediately (§4.6: a statement is always created with a live
    /// Parse already in flight).
    pub fn prepare(&mut self, sql: &str) -> crate::error::Result<PreparedStatement> {
        self.prepare_named(String::new(), sql)
    }

    /// As [`Session::prepare`], but under an explicit, persistent
    /// statement name (§3: a non-empty name persists until explicitly
    /// closed via [`Session::close_statement`]).
    pub fn prepare_named(
        &mut self,
        name: StatementName,
        sql: &str,
    ) -> crate::error::Result<PreparedStatement> {
        self.write_frame(&Parse { statement_name: &name, sql });
        Ok(PreparedStatement { name, row_description: None })
    }

    /// Binds `params` to a new portal over `statement`, emitting `Bind`.
    /// Portal and statement names default to unnamed.
    pub fn bind(&mut self, statement: &PreparedStatement, params: &[Option<&[u8]>]) {
        self.write_frame(&Bind {
            portal_name: "",
            statement_name: statement.name(),
            params,
        });
    }

    /// Requests a fresh row/parameter description for `statement`,
    /// emitting `Describe('S', name)`.
    pub fn describe_statement(&mut self, statement: &PreparedStatement) {
        self.write_frame(&Describe { kind: b'S', name: statement.name() });
    }

    /// Requests a fresh row description for the unnamed portal bound
    /// from `statement`, emitting `Describe('P', "")`.
    pub fn describe_portal(&mut self, _statement: &PreparedStatement) {
        self.write_frame(&Describe { kind: b'P', name: "" });
    }

    /// Runs the unnamed portal bound from `statement`, emitting
    /// `Execute`. Installs `statement`'s remembered row description as
    /// the session's current one, so `DataRow` events are shaped
    /// correctly even when several statements share this session (§4.6).
    pub fn execute(&mut self, statement: &PreparedStatement, max_rows: u32) {
        if let Some(description) = statement.row_description() {
            self.set_row_description(description.clone());
        }
        self.write_frame(&Execute { portal_name: "", max_rows });
    }

    /// Ends an extended-query message series for `statement`, emitting
    /// `Sync`.
    pub fn finish(&mut self, _statement: &PreparedStatement) {
        self.sync();
    }

    /// Closes a named prepared statement, emitting `Close('S', name)`.
    pub fn close_statement(&mut self, statement: &PreparedStatement) {
        self.write_frame(&Close { kind: b'S', name: statement.name() });
    }
}

/// A single bound parameter value, re-exported for callers that build
/// parameter lists without reaching into [`crate::message::frontend`].
pub type BindParam<'a> = Option<&'a [u8]>;
