//! Operator session: token persistence, expiry and sign-in state.

mod storage;
mod store;
pub mod token;

pub use storage::{
    CredentialError, CredentialResult, KeyringTokenStorage, MemoryTokenStorage, SERVICE_NAME,
    TOKEN_KEY, TokenStorage,
};
pub use store::{AuthError, SessionState, SessionStore};
