//! Authentication endpoints.

use reqwest::Method;
use serde_json::json;

use super::ApiClient;
use crate::error::{Error, Result};
use crate::model::{Identity, LoginGrant, LoginResponse, MeResponse};

impl ApiClient {
    /// Exchanges credentials for a bearer token.
    ///
    /// The token is returned, not installed; the caller decides where it lives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] for a non-success status and
    /// [`Error::AuthRejected`] when the backend answers without a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginGrant> {
        let url = self.endpoint(&["auth", "login"])?;
        let request = self
            .request(Method::POST, url)
            .json(&json!({ "email": email, "password": password }));

        let response: LoginResponse = self.send_json(request).await?;
        match response.access_token {
            Some(token) if response.status == "success" => Ok(LoginGrant {
                token,
                identity: response.user,
            }),
            _ => Err(Error::AuthRejected(
                response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "Login failed".to_string()),
            )),
        }
    }

    /// Ends the session on the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn logout(&self) -> Result<()> {
        let url = self.endpoint(&["auth", "logout"])?;
        self.send_raw(self.request(Method::POST, url)).await?;
        Ok(())
    }

    /// Returns the identity behind the current token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    pub async fn current_user(&self) -> Result<Identity> {
        let url = self.endpoint(&["auth", "me"])?;
        let response: MeResponse = self.send_json(self.request(Method::GET, url)).await?;
        Ok(response.user)
    }
}
