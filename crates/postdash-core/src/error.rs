//! Error types for the core library.

use thiserror::Error;

use crate::query::QueryError;
use crate::session::{AuthError, CredentialError};
use crate::validation::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend call failed.
    #[error("{0}")]
    Api(#[from] postdash_api::Error),

    /// Cached read failed.
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Sign-in or session failure.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Form input rejected before any request was made.
    #[error("Invalid input: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(errors)
    }
}

impl Error {
    /// Returns true if the error means the session is no longer valid.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Api(e) => e.is_auth(),
            Self::Query(e) => e.is_auth(),
            Self::Auth(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
