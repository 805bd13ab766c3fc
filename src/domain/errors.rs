//! Domain errors - Business logic errors

use thiserror::Error;

/// Domain-specific errors that represent business rule violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid choice index {index}, node has {available} choices")]
    InvalidChoiceIndex { index: usize, available: usize },

    #[error("Session {session} belongs to another user")]
    Unauthorized { session: String },

    #[error("Invalid session state: {reason}")]
    InvalidState { reason: String },

    #[error("Malformed story graph: {reason}")]
    ConfigurationFault { reason: String },

    #[error("Session {session} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        session: String,
        expected: u64,
        actual: u64,
    },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unauthorized(session: impl ToString) -> Self {
        Self::Unauthorized {
            session: session.to_string(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn configuration_fault(reason: impl Into<String>) -> Self {
        Self::ConfigurationFault {
            reason: reason.into(),
        }
    }
}
