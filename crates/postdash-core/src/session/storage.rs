//! Persistent storage for the session token.
//!
//! The desktop build keeps the token in the platform's native credential
//! store:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
pub const SERVICE_NAME: &str = "postdash";

/// Key the token is stored under.
pub const TOKEN_KEY: &str = "postalToken";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Somewhere the session token survives restarts.
pub trait TokenStorage: Send + Sync {
    /// Reads the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> CredentialResult<Option<String>>;

    /// Replaces the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&self, token: &str) -> CredentialResult<()>;

    /// Removes the stored token. Removing a missing token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn clear(&self) -> CredentialResult<()>;
}

/// Token storage backed by the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    service: String,
    key: String,
}

impl KeyringTokenStorage {
    /// Storage under the default service and key.
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(SERVICE_NAME, TOKEN_KEY)
    }

    /// Storage under a custom service and key.
    #[must_use]
    pub fn with_names(service: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            key: key.into(),
        }
    }

    fn entry(&self) -> CredentialResult<Entry> {
        Ok(Entry::new(&self.service, &self.key)?)
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> CredentialResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                debug!("No session token in keyring");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> CredentialResult<()> {
        self.entry()?.set_password(token)?;
        debug!("Stored session token");
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => debug!("Deleted session token"),
            Err(keyring::Error::NoEntry) => debug!("No session token to delete"),
            Err(e) => {
                warn!("Failed to delete session token: {e}");
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// In-process token storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage(Mutex<Option<String>>);

impl MemoryTokenStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self(Mutex::new(Some(token.into())))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> CredentialResult<Option<String>> {
        Ok(self.0.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> CredentialResult<()> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
