//! Error taxonomy for todo commands and queries.
//!
//! # Design
//! `NotFound` and `Validation` are expected outcomes that callers map to
//! client errors. `Storage` wraps anything the backing store reports that
//! the handlers cannot act on; it is never retried. `Unregistered` only
//! surfaces when a message is dispatched to a dispatcher that was built
//! without a handler for it.

use thiserror::Error;

use crate::types::TodoId;

/// Errors produced while handling a command or query.
#[derive(Debug, Error)]
pub enum TodoError {
    /// No todo exists with the given identifier.
    #[error("todo {0} not found")]
    NotFound(TodoId),

    /// The command or query input is malformed.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The backing store failed unexpectedly.
    #[error("storage failure: {0}")]
    Storage(String),

    /// No handler is registered for the dispatched message type.
    #[error("no handler registered for {0}")]
    Unregistered(&'static str),
}

impl TodoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<sqlx::Error> for TodoError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Errors detected while building a dispatcher at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("more than one handler registered for {0}")]
    Duplicate(&'static str),

    #[error("no handler registered for {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_identifier() {
        let error = TodoError::NotFound(TodoId::new(7));
        assert_eq!(error.to_string(), "todo 7 not found");
    }

    #[test]
    fn sqlx_errors_become_storage_errors() {
        let error: TodoError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, TodoError::Storage(_)));
    }
}
