//! Cached reads and cache-aware mutations over the API client.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use postdash_api::{
    ApiClient, BounceBreakdown, BouncedDomain, BouncedEmail, ConnectionTestResult, Identity,
    ListQuery, OpensReport, Page, ReportingPeriod, ServerConnection, ServerDraft, ServerId,
    ServerPatch, StatsSnapshot,
};
use tracing::info;

use super::{QueryCache, QueryKey, QueryResult, RetryPolicy};

/// Called with every error a read or mutation returns.
pub type ErrorHook = Arc<dyn Fn(&postdash_api::Error) + Send + Sync>;

/// Entry point for every backend read and write made by the dashboard.
///
/// Reads go through the cache. Mutations go straight to the backend and, on
/// success, invalidate the server list.
#[derive(Clone)]
pub struct Queries {
    api: ApiClient,
    cache: QueryCache,
    on_error: Option<ErrorHook>,
}

impl fmt::Debug for Queries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queries")
            .field("api", &self.api)
            .field("cache", &self.cache)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Queries {
    /// Creates the service.
    #[must_use]
    pub const fn new(api: ApiClient, cache: QueryCache) -> Self {
        Self {
            api,
            cache,
            on_error: None,
        }
    }

    /// Returns a handle on the same client and cache that passes every
    /// failure to `hook` before returning it.
    #[must_use]
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    fn report<T, E: Borrow<postdash_api::Error>>(&self, result: Result<T, E>) -> Result<T, E> {
        if let (Err(e), Some(hook)) = (&result, &self.on_error) {
            hook(e.borrow());
        }
        result
    }

    /// Underlying API client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn retry(&self) -> RetryPolicy {
        self.cache.config().retry
    }

    /// The signed-in operator. Never retried, so an expired session
    /// surfaces immediately.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn current_user(&self) -> QueryResult<Identity> {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::current_user(), RetryPolicy::NONE, move || {
                let api = api.clone();
                async move { api.current_user().await }
            })
            .await;
        self.report(result)
    }

    /// Every managed server.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn servers(&self) -> QueryResult<Vec<ServerConnection>> {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::servers(), self.retry(), move || {
                let api = api.clone();
                async move { api.list_servers().await }
            })
            .await;
        self.report(result)
    }

    /// One server record.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn server(&self, id: &ServerId) -> QueryResult<ServerConnection> {
        let api = self.api.clone();
        let id = id.clone();
        let result = self
            .cache
            .fetch(QueryKey::server(&id), self.retry(), move || {
                let (api, id) = (api.clone(), id.clone());
                async move { api.get_server(&id).await }
            })
            .await;
        self.report(result)
    }

    /// Aggregate statistics for a server and period.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn server_stats(&self, id: &ServerId, period: ReportingPeriod) -> QueryResult<StatsSnapshot> {
        let api = self.api.clone();
        let id = id.clone();
        let result = self
            .cache
            .fetch(QueryKey::server_stats(&id, period), self.retry(), move || {
                let (api, id) = (api.clone(), id.clone());
                async move { api.server_stats(&id, period).await }
            })
            .await;
        self.report(result)
    }

    /// Top bounced domains for a server and period.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn bounce_breakdown(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
    ) -> QueryResult<BounceBreakdown> {
        let api = self.api.clone();
        let id = id.clone();
        let result = self
            .cache
            .fetch(QueryKey::bounce_breakdown(&id, period), self.retry(), move || {
                let (api, id) = (api.clone(), id.clone());
                async move { api.bounce_breakdown(&id, period).await }
            })
            .await;
        self.report(result)
    }

    /// One page of bounced domains.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn bounced_domains(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> QueryResult<Page<BouncedDomain>> {
        let api = self.api.clone();
        let (id, query) = (id.clone(), query.clone());
        let result = self
            .cache
            .fetch(QueryKey::bounced_domains(&id, period, &query), self.retry(), move || {
                let (api, id, query) = (api.clone(), id.clone(), query.clone());
                async move { api.bounced_domains(&id, period, &query).await }
            })
            .await;
        self.report(result)
    }

    /// One page of bounced addresses.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn bounced_emails(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> QueryResult<Page<BouncedEmail>> {
        let api = self.api.clone();
        let (id, query) = (id.clone(), query.clone());
        let result = self
            .cache
            .fetch(QueryKey::bounced_emails(&id, period, &query), self.retry(), move || {
                let (api, id, query) = (api.clone(), id.clone(), query.clone());
                async move { api.bounced_emails(&id, period, &query).await }
            })
            .await;
        self.report(result)
    }

    /// Open tracking figures for a server and period.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn opens(&self, id: &ServerId, period: ReportingPeriod) -> QueryResult<OpensReport> {
        let api = self.api.clone();
        let id = id.clone();
        let result = self
            .cache
            .fetch(QueryKey::opens(&id, period), self.retry(), move || {
                let (api, id) = (api.clone(), id.clone());
                async move { api.opens(&id, period).await }
            })
            .await;
        self.report(result)
    }

    /// Creates a server.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is untouched on failure.
    pub async fn create_server(&self, draft: &ServerDraft) -> postdash_api::Result<ServerConnection> {
        let server = self.report(self.api.create_server(draft).await)?;
        info!("Created server {} ({})", server.name, server.id);
        self.cache.invalidate(&QueryKey::servers());
        Ok(server)
    }

    /// Updates a server.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is untouched on failure.
    pub async fn update_server(
        &self,
        id: &ServerId,
        patch: &ServerPatch,
    ) -> postdash_api::Result<ServerConnection> {
        let server = self.report(self.api.update_server(id, patch).await)?;
        info!("Updated server {id}");
        self.cache.invalidate(&QueryKey::servers());
        Ok(server)
    }

    /// Deletes a server.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is untouched on failure.
    pub async fn delete_server(&self, id: &ServerId) -> postdash_api::Result<()> {
        self.report(self.api.delete_server(id).await)?;
        info!("Deleted server {id}");
        self.cache.invalidate(&QueryKey::servers());
        Ok(())
    }

    /// Flips a server between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is untouched on failure.
    pub async fn toggle_server_status(&self, id: &ServerId) -> postdash_api::Result<ServerConnection> {
        let server = self.report(self.api.toggle_server_status(id).await)?;
        info!("Server {id} is now {}", server.status.display_name());
        self.cache.invalidate(&QueryKey::servers());
        Ok(server)
    }

    /// Asks the backend to connect to a server. Has no cache effect.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn test_connection(&self, id: &ServerId) -> postdash_api::Result<ConnectionTestResult> {
        self.report(self.api.test_connection(id).await)
    }

    /// Arc-wrapped read of the cached server list without fetching.
    #[must_use]
    pub fn cached_servers(&self) -> Option<Arc<Vec<ServerConnection>>> {
        self.cache.peek(&QueryKey::servers())
    }
}
