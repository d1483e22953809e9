//! Sidebar list of managed servers.

use postdash_api::ServerConnection;

use super::observer::{QueryObserver, ViewState, loader};
use crate::query::{Queries, QueryKey};

/// The full server list, refetched whenever a mutation invalidates it.
#[derive(Debug)]
pub struct ServerListView {
    observer: QueryObserver<Vec<ServerConnection>>,
}

impl ServerListView {
    /// Creates the view and requests the list.
    #[must_use]
    pub fn new(queries: &Queries) -> Self {
        let mut observer = QueryObserver::new(queries.cache().clone()).keep_previous_data();
        let queries = queries.clone();
        observer.observe(
            QueryKey::servers(),
            loader(move || {
                let queries = queries.clone();
                async move { queries.servers().await }
            }),
        );
        Self { observer }
    }

    /// Data, loading flag and error.
    #[must_use]
    pub const fn state(&self) -> &ViewState<Vec<ServerConnection>> {
        self.observer.state()
    }

    /// Requests the list again.
    pub fn refetch(&mut self) {
        self.observer.refetch();
    }

    /// Waits until the list or its loading state changes.
    pub async fn changed(&mut self) {
        self.observer.changed().await;
    }

    /// Processes changes until the current request has finished.
    pub async fn settle(&mut self) {
        while self.observer.state().loading {
            self.observer.changed().await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use postdash_api::{ApiClient, ServerId, ServerStatus};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::query::QueryCache;

    fn list(status: &str) -> serde_json::Value {
        json!({"status": true, "data": [
            {"id": 1, "name": "a", "host": "h", "port": 3306, "database": "d", "username": "u", "status": status}
        ]})
    }

    #[tokio::test]
    async fn test_mutation_refreshes_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list("active")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list("inactive")))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/servers/1/toggle-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": true, "data":
                {"id": 1, "name": "a", "host": "h", "port": 3306, "database": "d", "username": "u", "status": "inactive"}
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(format!("{}/api", server.uri())).unwrap();
        let queries = Queries::new(api, QueryCache::default());
        let mut view = ServerListView::new(&queries);
        view.settle().await;
        assert_eq!(view.state().data.clone().unwrap()[0].status, ServerStatus::Active);

        queries.toggle_server_status(&ServerId::new("1")).await.unwrap();
        view.changed().await;
        assert!(view.state().loading);
        assert_eq!(view.state().data.clone().unwrap()[0].status, ServerStatus::Active);

        view.settle().await;
        assert_eq!(view.state().data.clone().unwrap()[0].status, ServerStatus::Inactive);
    }
}
