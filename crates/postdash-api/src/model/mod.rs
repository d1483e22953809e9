//! Domain types returned by the client.
//!
//! Wire payloads are mapped into these types inside the client; callers never
//! see the backend's field naming.

mod auth;
mod server;
mod stats;

pub use auth::{Identity, LoginGrant};
pub(crate) use auth::{LoginResponse, MeResponse};
pub use server::{
    ConnectionTestResult, ServerConnection, ServerDraft, ServerId, ServerPatch, ServerStatus,
};
pub use stats::{
    BounceBreakdown, BouncedDomain, BouncedEmail, OpenedDomain, OpensPoint, OpensReport, Page,
    StatsSnapshot, TimeSeriesPoint,
};
pub(crate) use stats::{BounceWire, DomainListingWire, EmailListingWire, OpensWire, StatsWire};

use serde::{Deserialize, Deserializer};

/// Accepts identifiers encoded either as JSON strings or numbers.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
