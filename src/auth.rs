//! Authorization collaborator.
//!
//! The engine resolves the acting identity through an `AuthProvider` at
//! the start of every dispatch and publishes it on the request context.
//! The provider itself is opaque: it may consult a security realm, a
//! token, or nothing at all.

use std::fmt;

/// Error from the authorization provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "auth provider error: {}", self.message)
    }
}

impl std::error::Error for AuthError {}

/// Resolves the authenticated principal and its role set.
pub trait AuthProvider {
    fn username(&self) -> Result<Option<String>, AuthError>;
    fn user_roles(&self) -> Result<Vec<String>, AuthError>;
}

/// Anonymous access: no username, no roles.
impl AuthProvider for () {
    fn username(&self) -> Result<Option<String>, AuthError> {
        Ok(None)
    }

    fn user_roles(&self) -> Result<Vec<String>, AuthError> {
        Ok(Vec::new())
    }
}

/// A provider with a fixed identity, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    username: String,
    roles: Vec<String>,
}

impl StaticAuthProvider {
    pub fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn username(&self) -> Result<Option<String>, AuthError> {
        Ok(Some(self.username.clone()))
    }

    fn user_roles(&self) -> Result<Vec<String>, AuthError> {
        Ok(self.roles.clone())
    }
}
