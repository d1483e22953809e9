//! Authentication types.

use serde::{Deserialize, Serialize};

/// The signed-in operator as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User identifier.
    #[serde(deserialize_with = "super::flexible_id")]
    pub id: String,
    /// Email address.
    pub email: String,
    /// Name shown in the interface.
    #[serde(rename = "name", default)]
    pub display_name: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// Bearer token.
    pub token: String,
    /// Identity returned alongside the token, if any.
    pub identity: Option<Identity>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeResponse {
    pub user: Identity,
}
