//! Session state machine.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use postdash_api::{Identity, SharedToken};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::storage::{CredentialError, TokenStorage};
use super::token;
use crate::query::{QueryError, QueryKey, Queries};

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No token.
    #[default]
    Anonymous,
    /// A stored, unexpired token was installed but the backend has not
    /// confirmed it yet.
    Restoring,
    /// The backend confirmed the token.
    Authenticated(Identity),
}

impl SessionState {
    /// Returns the signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Returns true once the backend has confirmed the session.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Sign-in and session errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend refused the email/password pair.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The token expired or the backend stopped accepting it.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// No token is installed.
    #[error("Not signed in")]
    NotSignedIn,

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(QueryError),

    /// The backend answered with an unexpected failure.
    #[error("{0}")]
    Api(QueryError),

    /// The token could not be persisted.
    #[error("Could not store session: {0}")]
    Storage(#[from] CredentialError),
}

impl AuthError {
    fn from_login(err: postdash_api::Error) -> Self {
        match err {
            postdash_api::Error::AuthRejected(message) => Self::InvalidCredentials(message),
            postdash_api::Error::Api {
                message,
                status: 401 | 403,
                ..
            } => Self::InvalidCredentials(message),
            other if other.is_transient() => Self::Network(Arc::new(other)),
            other => Self::Api(Arc::new(other)),
        }
    }

    fn from_confirm(err: QueryError) -> Self {
        if err.is_auth() {
            Self::SessionExpired
        } else if err.is_transient() {
            Self::Network(err)
        } else {
            Self::Api(err)
        }
    }
}

/// Owns the session token and publishes [`SessionState`] changes.
///
/// The token lives in the [`SharedToken`] of the API client, so every request
/// picks up transitions immediately.
#[derive(Clone)]
pub struct SessionStore {
    queries: Queries,
    storage: Arc<dyn TokenStorage>,
    state: Arc<watch::Sender<SessionState>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates an anonymous store. Call [`Self::restore`] to pick up a stored
    /// token.
    #[must_use]
    pub fn new(queries: Queries, storage: Arc<dyn TokenStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            queries,
            storage,
            state: Arc::new(state),
        }
    }

    fn token(&self) -> &SharedToken {
        self.queries.api().token()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Installs the stored token if it is present and unexpired.
    ///
    /// Makes no network call. An expired or unreadable token is removed from
    /// storage.
    pub fn restore(&self) -> SessionState {
        let stored = self.storage.load().unwrap_or_else(|e| {
            warn!("Could not read stored session token: {e}");
            None
        });

        let state = match stored {
            Some(stored) if !token::is_expired(&stored, Utc::now()) => {
                debug!("Restored session token");
                self.token().set(stored);
                SessionState::Restoring
            }
            Some(_) => {
                info!("Stored session token is expired or malformed");
                self.forget_token();
                SessionState::Anonymous
            }
            None => SessionState::Anonymous,
        };
        self.state.send_replace(state.clone());
        state
    }

    /// Asks the backend who the installed token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotSignedIn`] without a token. Any other failure
    /// signs the session out.
    pub async fn confirm(&self) -> Result<Identity, AuthError> {
        let Some(current) = self.token().get() else {
            return Err(AuthError::NotSignedIn);
        };
        if token::is_expired(&current, Utc::now()) {
            self.sign_out_locally();
            return Err(AuthError::SessionExpired);
        }

        match self.queries.current_user().await {
            Ok(identity) => {
                let identity = Identity::clone(&identity);
                info!("Signed in as {}", identity.email);
                self.state
                    .send_replace(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!("Could not confirm session: {e}");
                self.sign_out_locally();
                Err(AuthError::from_confirm(e))
            }
        }
    }

    /// Exchanges credentials for a token and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the backend refuses the
    /// credentials, [`AuthError::Network`] when it cannot be reached. Nothing
    /// is persisted on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let grant = match self.queries.api().login(email, password).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!("Login failed: {e}");
                self.sign_out_locally();
                return Err(AuthError::from_login(e));
            }
        };

        if let Err(e) = self.storage.save(&grant.token) {
            self.sign_out_locally();
            return Err(e.into());
        }
        self.token().set(grant.token);
        self.queries.cache().invalidate(&QueryKey::current_user());

        match grant.identity {
            Some(identity) => {
                info!("Signed in as {}", identity.email);
                self.state
                    .send_replace(SessionState::Authenticated(identity.clone()));
                Ok(identity)
            }
            None => self.confirm().await,
        }
    }

    /// Ends the session on the backend and signs out locally.
    ///
    /// Local sign-out happens even if the backend call fails.
    pub async fn logout(&self) {
        if self.token().is_set() {
            if let Err(e) = self.queries.api().logout().await {
                warn!("Logout request failed: {e}");
            }
        }
        self.sign_out_locally();
        info!("Signed out");
    }

    /// Returns the signed-in identity after re-checking token expiry.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        if !self.check_expiry() {
            return None;
        }
        self.state.borrow().identity().cloned()
    }

    /// Signs out if the installed token has expired.
    ///
    /// Returns true if a valid token remains installed.
    pub fn check_expiry(&self) -> bool {
        let Some(current) = self.token().get() else {
            return false;
        };
        if token::is_expired(&current, Utc::now()) {
            info!("Session token expired");
            self.sign_out_locally();
            return false;
        }
        true
    }

    /// Signs out if `err` means the backend no longer accepts the token.
    ///
    /// Returns true if the session was ended.
    pub fn handle_error(&self, err: &postdash_api::Error) -> bool {
        if !err.is_auth() {
            return false;
        }
        if self.token().is_set() || self.state() != SessionState::Anonymous {
            warn!("Backend rejected session: {err}");
            self.sign_out_locally();
        }
        true
    }

    fn forget_token(&self) {
        if let Err(e) = self.storage.clear() {
            warn!("Could not remove stored session token: {e}");
        }
        self.token().clear();
    }

    fn sign_out_locally(&self) {
        self.forget_token();
        self.queries.cache().clear();
        self.state.send_replace(SessionState::Anonymous);
    }
}
