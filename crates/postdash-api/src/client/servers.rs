//! Server connection management endpoints.

use reqwest::Method;

use super::ApiClient;
use crate::error::Result;
use crate::model::{ConnectionTestResult, ServerConnection, ServerDraft, ServerId, ServerPatch};

impl ApiClient {
    /// Lists every managed server connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_servers(&self) -> Result<Vec<ServerConnection>> {
        let url = self.endpoint(&["servers"])?;
        self.send_data(self.request(Method::GET, url)).await
    }

    /// Fetches one server connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_server(&self, id: &ServerId) -> Result<ServerConnection> {
        let url = self.endpoint(&["servers", id.as_str()])?;
        self.send_data(self.request(Method::GET, url)).await
    }

    /// Creates a server connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_server(&self, draft: &ServerDraft) -> Result<ServerConnection> {
        let url = self.endpoint(&["servers"])?;
        self.send_data(self.request(Method::POST, url).json(draft))
            .await
    }

    /// Updates a server connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_server(&self, id: &ServerId, patch: &ServerPatch) -> Result<ServerConnection> {
        let url = self.endpoint(&["servers", id.as_str()])?;
        self.send_data(self.request(Method::PUT, url).json(patch))
            .await
    }

    /// Deletes a server connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_server(&self, id: &ServerId) -> Result<()> {
        let url = self.endpoint(&["servers", id.as_str()])?;
        self.send_raw(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// Flips a server between active and inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn toggle_server_status(&self, id: &ServerId) -> Result<ServerConnection> {
        let url = self.endpoint(&["servers", id.as_str(), "toggle-status"])?;
        self.send_data(self.request(Method::PATCH, url)).await
    }

    /// Asks the backend to connect to the server's database.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. An unreachable database is a
    /// successful call with `connection_successful == false`.
    pub async fn test_connection(&self, id: &ServerId) -> Result<ConnectionTestResult> {
        let url = self.endpoint(&["servers", id.as_str(), "test-connection"])?;
        self.send_data(self.request(Method::POST, url)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{Error, ServerStatus};

    fn server_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id, "name": "eu-1", "host": "db.internal", "port": 3306,
            "database": "postal", "username": "reader", "status": status
        })
    }

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(format!("{}/api", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_list_servers_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": true, "message": "ok",
                "data": [server_json("1", "active"), server_json("2", "maintenance")]
            })))
            .mount(&server)
            .await;

        let servers = client_for(&server).await.list_servers().await.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].status, ServerStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_update_omits_password_when_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/servers/1"))
            .and(body_json(json!({"name": "renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success", "message": "updated", "data": server_json("1", "active")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let patch = ServerPatch {
            name: Some("renamed".into()),
            ..ServerPatch::default()
        };
        client_for(&server)
            .await
            .update_server(&ServerId::new("1"), &patch)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_toggle_and_test_connection() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/servers/1/toggle-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success", "message": "toggled", "data": server_json("1", "inactive")
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/servers/1/test-connection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success", "message": "tested", "data": {"connection_successful": false}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let id = ServerId::new("1");
        let toggled = client.toggle_server_status(&id).await.unwrap();
        assert_eq!(toggled.status, ServerStatus::Inactive);
        let result = client.test_connection(&id).await.unwrap();
        assert!(!result.connection_successful);
    }

    #[tokio::test]
    async fn test_delete_accepts_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/servers/9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success", "message": "deleted", "data": null
            })))
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .delete_server(&ServerId::new("9"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_not_found_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/servers/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_server(&ServerId::new("404"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }
}
