//! # postdash-api
//!
//! Typed HTTP client for the Postal delivery statistics backend.
//!
//! ## Features
//!
//! - **Bearer authentication**: every request carries the current session token
//! - **Uniform errors**: backend error bodies become [`Error::Api`]
//! - **Envelope unwrapping**: `{status, message, data}` bodies are unwrapped
//! - **Domain mapping**: wire payloads are normalized into stable domain types
//!
//! ## Quick Start
//!
//! ```ignore
//! use postdash_api::{ApiClient, ReportingPeriod, SharedToken};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let token = SharedToken::new();
//!     let client = ApiClient::new("http://localhost:3001/api")?.with_token(token.clone());
//!
//!     let grant = client.login("ops@example.com", "secret").await?;
//!     token.set(grant.token);
//!
//!     for server in client.list_servers().await? {
//!         let stats = client.server_stats(&server.id, ReportingPeriod::Last7Days).await?;
//!         println!("{}: {} sent", server.name, stats.total_sent);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! This crate performs no retries and keeps no state besides the shared token;
//! caching and retry policy live in `postdash-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod client;
mod envelope;
mod error;
pub mod model;
mod period;

pub use client::{ApiClient, DEFAULT_PAGE_SIZE, ListQuery, SharedToken, export_file_name};
pub use envelope::{Envelope, EnvelopeStatus};
pub use error::{Error, Result};
pub use model::{
    BounceBreakdown, BouncedDomain, BouncedEmail, ConnectionTestResult, Identity, LoginGrant,
    OpenedDomain, OpensPoint, OpensReport, Page, ServerConnection, ServerDraft, ServerId,
    ServerPatch, ServerStatus, StatsSnapshot, TimeSeriesPoint,
};
pub use period::{ReportingPeriod, UnknownPeriod};
