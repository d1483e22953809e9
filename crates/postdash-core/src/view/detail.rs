//! Server detail page: record, aggregate statistics and bounce breakdown.

use postdash_api::{BounceBreakdown, ReportingPeriod, ServerConnection, ServerId, StatsSnapshot};
use tokio::sync::watch;

use super::observer::{QueryObserver, ViewState, loader};
use crate::query::{Queries, QueryError, QueryKey};

/// Everything the detail page shows for one server, scoped to the active
/// period.
#[derive(Debug)]
pub struct ServerDetailView {
    queries: Queries,
    server_id: ServerId,
    period: watch::Receiver<ReportingPeriod>,
    period_open: bool,
    server: QueryObserver<ServerConnection>,
    stats: QueryObserver<StatsSnapshot>,
    bounces: QueryObserver<BounceBreakdown>,
}

impl ServerDetailView {
    /// Creates the view and requests its data.
    #[must_use]
    pub fn new(queries: Queries, server_id: ServerId, period: watch::Receiver<ReportingPeriod>) -> Self {
        let cache = queries.cache().clone();
        let mut view = Self {
            server: QueryObserver::new(cache.clone()),
            stats: QueryObserver::new(cache.clone()),
            bounces: QueryObserver::new(cache),
            queries,
            server_id,
            period,
            period_open: true,
        };

        let (queries, id) = (view.queries.clone(), view.server_id.clone());
        view.server.observe(
            QueryKey::server(&view.server_id),
            loader(move || {
                let (queries, id) = (queries.clone(), id.clone());
                async move { queries.server(&id).await }
            }),
        );
        view.refresh();
        view
    }

    /// Server shown.
    #[must_use]
    pub const fn server_id(&self) -> &ServerId {
        &self.server_id
    }

    /// Period the statistics are scoped to.
    #[must_use]
    pub fn period(&self) -> ReportingPeriod {
        *self.period.borrow()
    }

    /// The server record.
    #[must_use]
    pub const fn server(&self) -> &ViewState<ServerConnection> {
        self.server.state()
    }

    /// Aggregate statistics.
    #[must_use]
    pub const fn stats(&self) -> &ViewState<StatsSnapshot> {
        self.stats.state()
    }

    /// Bounce breakdown.
    #[must_use]
    pub const fn bounces(&self) -> &ViewState<BounceBreakdown> {
        self.bounces.state()
    }

    /// True while either statistics request is running.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.stats.state().loading || self.bounces.state().loading
    }

    /// First error among the record, statistics and breakdown.
    #[must_use]
    pub fn error(&self) -> Option<&QueryError> {
        self.server
            .state()
            .error
            .as_ref()
            .or(self.stats.state().error.as_ref())
            .or(self.bounces.state().error.as_ref())
    }

    /// Waits until a period change or response changes what the view shows.
    pub async fn changed(&mut self) {
        loop {
            tokio::select! {
                changed = self.period.changed(), if self.period_open => {
                    if changed.is_ok() {
                        self.refresh();
                        return;
                    }
                    self.period_open = false;
                }
                () = self.server.changed() => return,
                () = self.stats.changed() => return,
                () = self.bounces.changed() => return,
            }
        }
    }

    /// Processes changes until every request has finished.
    pub async fn settle(&mut self) {
        while self.server.state().loading || self.is_loading() {
            self.changed().await;
        }
    }

    fn refresh(&mut self) {
        let period = *self.period.borrow_and_update();

        let (queries, id) = (self.queries.clone(), self.server_id.clone());
        self.stats.observe(
            QueryKey::server_stats(&self.server_id, period),
            loader(move || {
                let (queries, id) = (queries.clone(), id.clone());
                async move { queries.server_stats(&id, period).await }
            }),
        );

        let (queries, id) = (self.queries.clone(), self.server_id.clone());
        self.bounces.observe(
            QueryKey::bounce_breakdown(&self.server_id, period),
            loader(move || {
                let (queries, id) = (queries.clone(), id.clone());
                async move { queries.bounce_breakdown(&id, period).await }
            }),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use postdash_api::ApiClient;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::period::{MemoryPeriodStorage, PeriodStore};
    use crate::query::QueryCache;

    async fn mount_period(server: &MockServer, period: &str, sent: u64) {
        Mock::given(method("GET"))
            .and(path("/api/stats/server/4"))
            .and(query_param("period", period))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"totalSent": sent, "totalBounced": 3, "chartData": [{"date": "2024-01-01", "sent": sent, "bounced": 3, "opens": 1}]}
            })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/stats/server/4/bounces"))
            .and(query_param("period", period))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"totalBounced": 3, "totalDomains": 1, "topDomains": [{"domain": "x.io", "count": 3, "percentage": 100.0}]}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn setup() -> (MockServer, Queries, PeriodStore) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/servers/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true,
                "data": {"id": 4, "name": "mta-4", "host": "h", "port": 3306, "database": "d", "username": "u", "status": "active"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let api = ApiClient::new(format!("{}/api", server.uri())).unwrap();
        let queries = Queries::new(api, QueryCache::default());
        let periods = PeriodStore::new(Arc::new(MemoryPeriodStorage::new()));
        (server, queries, periods)
    }

    #[tokio::test]
    async fn test_loads_record_stats_and_breakdown() {
        let (server, queries, periods) = setup().await;
        mount_period(&server, "7d", 100).await;

        let mut view = ServerDetailView::new(queries, ServerId::new("4"), periods.subscribe());
        assert!(view.is_loading());
        view.settle().await;

        assert!(view.error().is_none());
        assert_eq!(view.server().data.clone().unwrap().name, "mta-4");
        assert_eq!(view.stats().data.clone().unwrap().total_sent, 100);
        assert_eq!(view.bounces().data.clone().unwrap().top_domains[0].domain, "x.io");
    }

    #[tokio::test]
    async fn test_period_change_requests_new_period_only() {
        let (server, queries, periods) = setup().await;
        mount_period(&server, "7d", 100).await;
        mount_period(&server, "30d", 900).await;

        let mut view = ServerDetailView::new(queries, ServerId::new("4"), periods.subscribe());
        view.settle().await;

        periods.set_period(ReportingPeriod::Last30Days);
        view.changed().await;
        assert_eq!(view.period(), ReportingPeriod::Last30Days);
        view.settle().await;

        let stats = view.stats().data.clone().unwrap();
        assert_eq!(stats.total_sent, 900);
        assert_eq!(stats.period, ReportingPeriod::Last30Days);
    }

    #[tokio::test]
    async fn test_dropped_view_stops_refetching() {
        let (server, queries, periods) = setup().await;
        mount_period(&server, "7d", 100).await;

        let mut view = ServerDetailView::new(queries.clone(), ServerId::new("4"), periods.subscribe());
        view.settle().await;
        drop(view);

        periods.set_period(ReportingPeriod::Today);
        tokio::task::yield_now().await;
        assert!(!queries.cache().is_fetching(&QueryKey::server_stats(
            &ServerId::new("4"),
            ReportingPeriod::Today
        )));
        // Mock expectations verify no request for `today` was made.
    }

    #[tokio::test]
    async fn test_stats_error_is_reported() {
        let (server, queries, periods) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/stats/server/4"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/stats/server/4/bounces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"topDomains": []}})))
            .mount(&server)
            .await;

        let mut view = ServerDetailView::new(queries, ServerId::new("4"), periods.subscribe());
        view.settle().await;

        assert_eq!(view.error().unwrap().to_string(), "db down");
        assert!(view.stats().data.is_none());
        assert!(view.bounces().data.is_some());
    }
}
