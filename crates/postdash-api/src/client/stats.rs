//! Statistics endpoints.

use reqwest::Method;

use super::ApiClient;
use crate::ReportingPeriod;
use crate::error::Result;
use crate::model::{
    BounceBreakdown, BounceWire, BouncedDomain, BouncedEmail, DomainListingWire,
    EmailListingWire, OpensReport, OpensWire, Page, ServerId, StatsSnapshot, StatsWire,
};

/// Rows per page requested by listing views.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Page, page size and search term for a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
    /// Search term; empty means no filter.
    pub search: String,
}

impl ListQuery {
    /// First page, default size, no filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            search: String::new(),
        }
    }

    /// Sets the page.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the search term.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    fn params(&self, period: ReportingPeriod) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("period", period.as_str().to_string()),
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if !self.search.is_empty() {
            params.push(("q", self.search.clone()));
        }
        params
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    /// Fetches delivery totals and the chart series.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn server_stats(&self, id: &ServerId, period: ReportingPeriod) -> Result<StatsSnapshot> {
        let url = self.endpoint(&["stats", "server", id.as_str()])?;
        let request = self
            .request(Method::GET, url)
            .query(&[("period", period.as_str())]);
        let wire: StatsWire = self.send_data(request).await?;
        Ok(wire.into_snapshot(id.clone(), period))
    }

    /// Fetches the top bounced domains.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn bounce_breakdown(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
    ) -> Result<BounceBreakdown> {
        let url = self.endpoint(&["stats", "server", id.as_str(), "bounces"])?;
        let request = self
            .request(Method::GET, url)
            .query(&[("period", period.as_str())]);
        let wire: BounceWire = self.send_data(request).await?;
        Ok(wire.into_breakdown(period))
    }

    /// Fetches one page of bounced domains.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn bounced_domains(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> Result<Page<BouncedDomain>> {
        let url = self.endpoint(&["stats", "server", id.as_str(), "bounces", "domain"])?;
        let request = self.request(Method::GET, url).query(&query.params(period));
        let wire: DomainListingWire = self.send_data(request).await?;
        Ok(wire.into_page())
    }

    /// Fetches one page of bounced addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn bounced_emails(
        &self,
        id: &ServerId,
        period: ReportingPeriod,
        query: &ListQuery,
    ) -> Result<Page<BouncedEmail>> {
        let url = self.endpoint(&["stats", "server", id.as_str(), "bounces", "email"])?;
        // This endpoint historically reads `limit`; send both.
        let request = self
            .request(Method::GET, url)
            .query(&query.params(period))
            .query(&[("limit", query.per_page)]);
        let wire: EmailListingWire = self.send_data(request).await?;
        Ok(wire.into_page())
    }

    /// Fetches open tracking figures.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn opens(&self, id: &ServerId, period: ReportingPeriod) -> Result<OpensReport> {
        let url = self.endpoint(&["servers", id.as_str(), "opens"])?;
        let request = self
            .request(Method::GET, url)
            .query(&[("period", period.as_str())]);
        let wire: OpensWire = self.send_json(request).await?;
        Ok(wire.into_report())
    }
}
