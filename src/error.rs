//! Fault types for data-service dispatch.

use std::error::Error;
use std::fmt;

use crate::auth::AuthError;
use crate::txn::TransactionError;

/// Fault raised by request construction or execution.
///
/// Configuration faults (unknown operation, malformed request box) are
/// raised before any transactional work begins. Execution faults propagate
/// to the caller after the rollback finalize and participant cleanup have
/// run.
#[derive(Debug)]
pub enum DataServiceFault {
    /// The named operation is not registered on the service.
    OperationNotFound { operation: String, service: String },
    /// A request-box operation arrived with a null/absent payload.
    MalformedRequestBox { operation: String, service: String },
    /// The authorization provider failed to resolve the acting identity.
    Auth { service: String, message: String },
    /// An operation failed during execution.
    Execution { operation: String, message: String },
    /// The distributed transaction manager failed.
    Transaction { message: String },
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl DataServiceFault {
    /// Execution fault naming the failing operation.
    pub fn execution(operation: impl Into<String>, message: impl Into<String>) -> Self {
        DataServiceFault::Execution {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Map this fault to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DataServiceFault::OperationNotFound { .. } => 404,
            DataServiceFault::MalformedRequestBox { .. } => 400,
            DataServiceFault::Auth { .. } => 401,
            DataServiceFault::Execution { .. } => 500,
            DataServiceFault::Transaction { .. } => 500,
            DataServiceFault::Other(_) => 500,
        }
    }
}

impl fmt::Display for DataServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataServiceFault::OperationNotFound { operation, service } => {
                write!(
                    f,
                    "operation not found: {} (service {})",
                    operation, service
                )
            }
            DataServiceFault::MalformedRequestBox { operation, service } => {
                write!(
                    f,
                    "request box {} has no payload (service {})",
                    operation, service
                )
            }
            DataServiceFault::Auth { service, message } => {
                write!(f, "authorization failed for service {}: {}", service, message)
            }
            DataServiceFault::Execution { operation, message } => {
                write!(f, "operation {} failed: {}", operation, message)
            }
            DataServiceFault::Transaction { message } => {
                write!(f, "transaction error: {}", message)
            }
            DataServiceFault::Other(e) => write!(f, "dispatch error: {}", e),
        }
    }
}

impl Error for DataServiceFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataServiceFault::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<TransactionError> for DataServiceFault {
    fn from(err: TransactionError) -> Self {
        DataServiceFault::Transaction {
            message: err.to_string(),
        }
    }
}

impl From<AuthError> for DataServiceFault {
    fn from(err: AuthError) -> Self {
        DataServiceFault::Auth {
            service: String::new(),
            message: err.to_string(),
        }
    }
}
