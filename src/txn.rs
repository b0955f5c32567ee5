//! Distributed transaction collaborator.
//!
//! The engine consumes a `TransactionManager` as an opaque service. The
//! boxcar end path begins a transaction when none is already ours; the
//! shared finalize commits or rolls it back only when this engine
//! initiated it. XA-enrolled connections are the manager's responsibility;
//! the connection store's non-XA sweeps leave them alone.

use std::fmt;
use std::sync::Mutex;

/// Error from the transaction manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionError {
    message: String,
}

impl TransactionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction manager error: {}", self.message)
    }
}

impl std::error::Error for TransactionError {}

/// Begin/commit/rollback of a distributed transaction, plus whether the
/// active one was initiated by this engine.
pub trait TransactionManager {
    fn begin(&self) -> Result<(), TransactionError>;
    fn commit(&self) -> Result<(), TransactionError>;
    fn rollback(&self) -> Result<(), TransactionError>;
    fn is_dtx_initiated_by_us(&self) -> bool;
}

/// In-process transaction manager tracking a single active transaction.
#[derive(Default)]
pub struct LocalTransactionManager {
    active: Mutex<bool>,
}

impl LocalTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_active(&self, value: bool, op: &str) -> Result<(), TransactionError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| TransactionError::new("transaction state poisoned"))?;
        if value == *active {
            let state = if value { "already active" } else { "not active" };
            return Err(TransactionError::new(format!("cannot {}: {}", op, state)));
        }
        *active = value;
        Ok(())
    }
}

impl TransactionManager for LocalTransactionManager {
    fn begin(&self) -> Result<(), TransactionError> {
        self.set_active(true, "begin")
    }

    fn commit(&self) -> Result<(), TransactionError> {
        self.set_active(false, "commit")
    }

    fn rollback(&self) -> Result<(), TransactionError> {
        self.set_active(false, "rollback")
    }

    fn is_dtx_initiated_by_us(&self) -> bool {
        self.active.lock().map(|active| *active).unwrap_or(false)
    }
}
