//! # postdash-core
//!
//! Client-side state for the postdash delivery statistics dashboard.
//!
//! This crate provides:
//! - Operator session with token persistence and expiry checks
//! - Persisted reporting period shared by every statistics view
//! - **Query cache** - keyed, de-duplicated, prefix-invalidated reads
//! - Cache-aware server mutations
//! - **View state** - paginated, debounced, period-scoped listings and detail pages
//! - CSV export and form validation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod dashboard;
mod error;
pub mod export;
pub mod period;
pub mod query;
pub mod session;
pub mod validation;
pub mod view;

pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use export::export_bounced_emails;
pub use period::{FilePeriodStorage, MemoryPeriodStorage, PeriodStorage, PeriodStore};
pub use query::{CacheConfig, CacheEvent, ErrorHook, Queries, QueryCache, QueryError, QueryKey, QueryResult, RetryPolicy};
pub use session::{
    AuthError, CredentialError, CredentialResult, KeyringTokenStorage, MemoryTokenStorage,
    SessionState, SessionStore, TokenStorage,
};
pub use validation::{LoginForm, ServerForm, ValidationError, ValidationResult, is_valid_email};
pub use view::{
    DomainListingView, EmailListingView, ListingView, PageItem, Pager, QueryObserver,
    ServerDetailView, ServerListView, ViewState, page_range,
};
