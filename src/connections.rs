//! Transactional connection store.
//!
//! A registry of the connections opened during one logical unit of work,
//! each tagged XA or non-XA at registration. Connections are acquired deep
//! inside query execution; the store exists purely to guarantee that
//! whatever got opened is uniformly finalized exactly once, regardless of
//! how many nested operations touched the database.
//!
//! The commit/rollback/close operations are best-effort sweeps: a failure
//! on one connection is logged and must not prevent attempting the
//! remaining connections, since these sweeps run from finally-position
//! code where throwing would mask the original fault.

use std::fmt;

use tracing::warn;

/// Error raised by a single connection's commit/rollback/close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection error: {}", self.message)
    }
}

impl std::error::Error for ConnectionError {}

/// A database-like connection that can be committed, rolled back, and
/// closed as part of the store's grouped finalization.
pub trait TransactionalConnection: Send {
    fn commit(&mut self) -> Result<(), ConnectionError>;
    fn rollback(&mut self) -> Result<(), ConnectionError>;
    /// Return the connection to its pool / release native resources.
    fn close(&mut self) -> Result<(), ConnectionError>;
}

struct Registered {
    conn: Box<dyn TransactionalConnection>,
    xa: bool,
}

/// Registry of live connections for the current logical unit of work.
#[derive(Default)]
pub struct ConnectionStore {
    entries: Vec<Registered>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, tagging it XA-enrolled or plain.
    pub fn register(&mut self, conn: Box<dyn TransactionalConnection>, xa: bool) {
        self.entries.push(Registered { conn, xa });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commit every registered connection.
    pub fn commit_all(&mut self) {
        self.sweep("commit", true, |conn| conn.commit());
    }

    /// Roll back every registered connection.
    pub fn rollback_all(&mut self) {
        self.sweep("rollback", true, |conn| conn.rollback());
    }

    /// Commit only the connections not enrolled in a distributed
    /// transaction; XA-enrolled ones are the transaction manager's job.
    pub fn commit_non_xa(&mut self) {
        self.sweep("commit", false, |conn| conn.commit());
    }

    /// Roll back only the non-XA connections.
    pub fn rollback_non_xa(&mut self) {
        self.sweep("rollback", false, |conn| conn.rollback());
    }

    /// Close every registered connection, then empty the registry.
    /// Always the final step of a unit of work.
    pub fn close_all(&mut self) {
        self.sweep("close", true, |conn| conn.close());
        self.entries.clear();
    }

    fn sweep<F>(&mut self, action: &str, include_xa: bool, f: F)
    where
        F: Fn(&mut dyn TransactionalConnection) -> Result<(), ConnectionError>,
    {
        for entry in &mut self.entries {
            if !include_xa && entry.xa {
                continue;
            }
            if let Err(e) = f(entry.conn.as_mut()) {
                warn!(action = action, error = %e, "connection sweep failure");
            }
        }
    }
}
