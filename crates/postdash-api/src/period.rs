//! Reporting periods understood by the statistics endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Time window that every statistics request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportingPeriod {
    /// Since midnight.
    #[serde(rename = "today")]
    Today,
    /// The previous calendar day.
    #[serde(rename = "yesterday")]
    Yesterday,
    /// Last 7 days.
    #[default]
    #[serde(rename = "7d")]
    Last7Days,
    /// Last 14 days.
    #[serde(rename = "14d")]
    Last14Days,
    /// Last 30 days.
    #[serde(rename = "30d")]
    Last30Days,
}

impl ReportingPeriod {
    /// Every period, in selector order.
    pub const ALL: [Self; 5] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last14Days,
        Self::Last30Days,
    ];

    /// Value sent in the `period` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "7d",
            Self::Last14Days => "14d",
            Self::Last30Days => "30d",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 days",
            Self::Last14Days => "Last 14 days",
            Self::Last30Days => "Last 30 days",
        }
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that names no period.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown reporting period: {0}")]
pub struct UnknownPeriod(pub String);

impl FromStr for ReportingPeriod {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPeriod(s.to_string()))
    }
}
