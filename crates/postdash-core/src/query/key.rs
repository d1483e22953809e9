//! Composite cache keys.

use std::fmt;

use postdash_api::{ListQuery, ReportingPeriod, ServerId};

/// Cache key made of ordered segments.
///
/// Keys are built only through the constructors below so that the same
/// parameters always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The signed-in operator.
    #[must_use]
    pub fn current_user() -> Self {
        Self::from_segments(["auth", "currentUser"])
    }

    /// The full server list. Also the prefix of every per-server record.
    #[must_use]
    pub fn servers() -> Self {
        Self::from_segments(["servers"])
    }

    /// One server record.
    #[must_use]
    pub fn server(id: &ServerId) -> Self {
        Self::from_segments(["servers", id.as_str()])
    }

    /// Aggregate statistics for a server and period.
    #[must_use]
    pub fn server_stats(id: &ServerId, period: ReportingPeriod) -> Self {
        Self::from_segments(["servers", id.as_str(), "stats", period.as_str()])
    }

    /// Top bounced domains for a server and period.
    #[must_use]
    pub fn bounce_breakdown(id: &ServerId, period: ReportingPeriod) -> Self {
        Self::from_segments(["bounces", id.as_str(), period.as_str()])
    }

    /// One page of bounced domains.
    #[must_use]
    pub fn bounced_domains(id: &ServerId, period: ReportingPeriod, query: &ListQuery) -> Self {
        Self::listing(id, period, "domains", query)
    }

    /// One page of bounced addresses.
    #[must_use]
    pub fn bounced_emails(id: &ServerId, period: ReportingPeriod, query: &ListQuery) -> Self {
        Self::listing(id, period, "emails", query)
    }

    /// Open tracking figures for a server and period.
    #[must_use]
    pub fn opens(id: &ServerId, period: ReportingPeriod) -> Self {
        Self::from_segments(["opens", id.as_str(), period.as_str()])
    }

    fn listing(id: &ServerId, period: ReportingPeriod, kind: &str, query: &ListQuery) -> Self {
        Self(vec![
            "bounces".to_string(),
            id.to_string(),
            period.to_string(),
            kind.to_string(),
            query.page.to_string(),
            query.per_page.to_string(),
            query.search.clone(),
        ])
    }

    /// Key segments in order.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true if `prefix` matches the leading segments of this key.
    ///
    /// A key is its own prefix.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let id = ServerId::new("7");
        let query = ListQuery::new().with_page(2).with_search("gmail");
        assert_eq!(
            QueryKey::bounced_domains(&id, ReportingPeriod::Today, &query),
            QueryKey::bounced_domains(&id, ReportingPeriod::Today, &query.clone())
        );
        assert_ne!(
            QueryKey::bounced_domains(&id, ReportingPeriod::Today, &query),
            QueryKey::bounced_emails(&id, ReportingPeriod::Today, &query)
        );
    }

    #[test]
    fn test_listing_key_carries_every_parameter() {
        let key = QueryKey::bounced_emails(
            &ServerId::new("7"),
            ReportingPeriod::Last30Days,
            &ListQuery::new().with_page(3).with_search("x"),
        );
        assert_eq!(
            key.segments(),
            ["bounces", "7", "30d", "emails", "3", "50", "x"]
        );
    }

    #[test]
    fn test_prefix_matching() {
        let id = ServerId::new("1");
        let servers = QueryKey::servers();
        assert!(QueryKey::server(&id).starts_with(&servers));
        assert!(QueryKey::server_stats(&id, ReportingPeriod::Today).starts_with(&servers));
        assert!(servers.starts_with(&servers));
        assert!(!QueryKey::bounce_breakdown(&id, ReportingPeriod::Today).starts_with(&servers));
        assert!(!servers.starts_with(&QueryKey::server(&id)));
        assert!(!QueryKey::current_user().starts_with(&servers));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            QueryKey::server_stats(&ServerId::new("4"), ReportingPeriod::Last7Days).to_string(),
            "[servers, 4, stats, 7d]"
        );
    }
}
