//! Common response envelope.

use serde::Deserialize;

/// `{status, message, data}` wrapper used by most backend responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Status flag (`true` or `"success"` on success).
    #[serde(default)]
    pub status: Option<EnvelopeStatus>,
    /// Optional human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Payload.
    pub data: T,
}

/// The backend reports status either as a boolean or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeStatus {
    /// Boolean flag.
    Flag(bool),
    /// Text status such as `"success"` or `"error"`.
    Text(String),
}

impl EnvelopeStatus {
    /// Returns true if the status denotes success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => text.eq_ignore_ascii_case("success"),
        }
    }
}

impl<T> Envelope<T> {
    /// Returns the payload, discarding status and message.
    pub fn into_data(self) -> T {
        self.data
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_status() {
        let env: Envelope<Vec<u32>> =
            serde_json::from_str(r#"{"status":true,"message":"ok","data":[1,2]}"#).unwrap();
        assert!(env.status.unwrap().is_success());
        assert_eq!(env.data, vec![1, 2]);
    }

    #[test]
    fn test_text_status_and_missing_message() {
        let env: Envelope<u32> = serde_json::from_str(r#"{"status":"error","data":0}"#).unwrap();
        assert!(!env.status.unwrap().is_success());
        assert!(env.message.is_none());
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let env: Result<Envelope<u32>, _> = serde_json::from_str(r#"{"status":true}"#);
        assert!(env.is_err());
    }
}
