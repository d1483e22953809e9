//! Error types for backend operations.

use serde::Deserialize;

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Backend error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api {
        /// Human-readable message from the body, or the status line.
        message: String,
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code, when the backend provides one.
        code: Option<String>,
    },

    /// The backend accepted the request but refused the credentials.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// Transport failure; no response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Error body returned by the backend on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

impl Error {
    /// Creates an API error from a status code and message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status,
            code: None,
        }
    }

    /// Builds an API error from a failed response.
    ///
    /// The message and code come from the JSON body when it parses, otherwise
    /// from the status line.
    #[must_use]
    pub fn from_response(status: reqwest::StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed.message.or(parsed.error).unwrap_or_else(|| {
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });

        Self::Api {
            message,
            status: status.as_u16(),
            code: parsed.code,
        }
    }

    /// Returns the HTTP status if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the error means the session is not (or no longer) valid.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRejected(_) | Self::Api { status: 401, .. })
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
