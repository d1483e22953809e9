//! CSV export endpoint.

use bytes::Bytes;
use reqwest::Method;

use super::ApiClient;
use crate::ReportingPeriod;
use crate::error::{Error, Result};
use crate::model::ServerId;

/// File name used when saving an export.
#[must_use]
pub fn export_file_name(id: &ServerId, period: ReportingPeriod) -> String {
    format!("bounced-emails-{id}-{period}.csv")
}

impl ApiClient {
    /// Downloads the bounced-address CSV for a server and period.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the message `Export failed` on a
    /// non-success status, or a network error.
    pub async fn export_bounced_emails(&self, id: &ServerId, period: ReportingPeriod) -> Result<Bytes> {
        let url = self.endpoint(&["export", "server", id.as_str(), "bounces", ""])?;
        let request = self
            .request(Method::GET, url)
            .query(&[("period", period.as_str())]);

        self.send_raw(request).await.map_err(|e| match e {
            Error::Api { status, code, .. } => Error::Api {
                message: "Export failed".to_string(),
                status,
                code,
            },
            other => other,
        })
    }
}
