//! Server connection types.

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a managed server connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ServerId(pub String);

impl<'de> Deserialize<'de> for ServerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        super::flexible_id(deserializer).map(Self)
    }
}

impl ServerId {
    /// Create a new server ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Operational status reported for a server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Collecting statistics.
    Active,
    /// Disabled by an operator.
    Inactive,
    /// Temporarily unavailable.
    Maintenance,
    /// Anything the backend reports that we do not recognise.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    /// Get display name for the status.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
            Self::Unknown => "unknown",
        }
    }
}

/// A managed mail server connection as returned by reads.
///
/// The password is write-only and never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnection {
    /// Unique identifier.
    pub id: ServerId,
    /// Display name.
    pub name: String,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database username.
    pub username: String,
    /// Current status.
    #[serde(default)]
    pub status: ServerStatus,
}

/// Payload for creating a server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDraft {
    /// Display name.
    pub name: String,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database username.
    pub username: String,
    /// Database password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether the connection starts active.
    pub is_active: bool,
}

/// Partial update for a server connection.
///
/// Fields left as `None` are not sent and stay unchanged; in particular a
/// missing password keeps the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerPatch {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Database host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Database username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New database password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConnectionTestResult {
    /// Whether the backend could reach the server's database.
    pub connection_successful: bool,
}
