//! Delivery statistics types and their wire representations.

use serde::{Deserialize, Serialize};

use super::ServerId;
use crate::ReportingPeriod;

/// One point of the delivery chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Bucket label as sent by the backend (usually `YYYY-MM-DD`).
    pub date: String,
    /// Messages sent.
    pub sent: u64,
    /// Messages bounced.
    pub bounces: u64,
    /// Messages opened.
    pub opens: u64,
}

/// Aggregate delivery statistics for a server and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Server the figures belong to.
    pub server_id: ServerId,
    /// Period the figures cover.
    pub period: ReportingPeriod,
    /// Messages sent.
    pub total_sent: u64,
    /// Messages delivered.
    pub total_delivered: u64,
    /// Messages bounced.
    pub total_bounces: u64,
    /// Messages held.
    pub total_held: u64,
    /// Messages opened.
    pub total_opens: u64,
    /// Delivery rate in percent, computed by the backend.
    pub delivery_rate: f64,
    /// Bounce rate in percent, computed by the backend.
    pub bounce_rate: f64,
    /// Open rate in percent, computed by the backend.
    pub open_rate: f64,
    /// Chart series, oldest first.
    pub time_series: Vec<TimeSeriesPoint>,
}

/// A domain and its share of bounces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BouncedDomain {
    /// Recipient domain.
    pub domain: String,
    /// Number of bounces.
    pub count: u64,
    /// Share of all bounces in the period, in percent.
    pub percentage: f64,
}

/// Top bounced domains for a server and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BounceBreakdown {
    /// Period the figures cover.
    pub period: ReportingPeriod,
    /// Domains ordered by bounce count, highest first.
    pub top_domains: Vec<BouncedDomain>,
    /// Number of distinct bounced domains.
    pub total_domains: u64,
    /// Number of bounces.
    pub total_bounces: u64,
    /// Bounce rate in percent, computed by the backend.
    pub bounce_rate: f64,
}

/// A bounced recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BouncedEmail {
    /// Recipient address.
    pub email: String,
    /// Recipient domain.
    pub domain: String,
    /// Timestamp of the most recent bounce, as sent by the backend.
    pub bounce_date: String,
    /// Number of bounces.
    pub bounce_count: u64,
}

/// One page of a server-side paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows across all pages.
    pub total_items: u64,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Number of pages.
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Returns true if a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Returns true if a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Returns true if the listing has no rows at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_items == 0
    }
}

/// Domain share of opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenedDomain {
    /// Recipient domain.
    pub domain: String,
    /// Opens.
    pub opens: u64,
    /// Unique opens.
    pub unique_opens: u64,
    /// Share of all opens, in percent.
    pub percentage: f64,
}

/// One point of the opens chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpensPoint {
    /// Bucket label.
    pub date: String,
    /// Opens.
    pub opens: u64,
    /// Unique opens.
    pub unique_opens: u64,
}

/// Open tracking figures for a server and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpensReport {
    /// Opens.
    pub total_opens: u64,
    /// Unique opens.
    pub unique_opens: u64,
    /// Open rate in percent.
    pub open_rate: f64,
    /// Top domains by opens.
    pub top_domains: Vec<OpenedDomain>,
    /// Chart series.
    pub chart: Vec<OpensPoint>,
}

/// Share of `count` in `total`, in percent; zero when `total` is zero.
#[allow(clippy::cast_precision_loss)]
fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

// Wire formats. Field names follow the backend.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatsWire {
    #[serde(default)]
    total_sent: u64,
    #[serde(default)]
    total_delivered: u64,
    #[serde(default)]
    total_bounced: u64,
    #[serde(default)]
    total_held: u64,
    #[serde(default)]
    total_opened: u64,
    #[serde(default)]
    delivery_rate: f64,
    #[serde(default)]
    bounce_rate: f64,
    #[serde(default)]
    open_rate: f64,
    #[serde(default)]
    chart_data: Vec<ChartPointWire>,
}

#[derive(Debug, Deserialize)]
struct ChartPointWire {
    date: String,
    #[serde(default)]
    sent: u64,
    #[serde(default)]
    bounced: u64,
    #[serde(default)]
    opens: u64,
}

impl StatsWire {
    pub(crate) fn into_snapshot(self, server_id: ServerId, period: ReportingPeriod) -> StatsSnapshot {
        StatsSnapshot {
            server_id,
            period,
            total_sent: self.total_sent,
            total_delivered: self.total_delivered,
            total_bounces: self.total_bounced,
            total_held: self.total_held,
            total_opens: self.total_opened,
            delivery_rate: self.delivery_rate,
            bounce_rate: self.bounce_rate,
            open_rate: self.open_rate,
            time_series: self
                .chart_data
                .into_iter()
                .map(|p| TimeSeriesPoint {
                    date: p.date,
                    sent: p.sent,
                    bounces: p.bounced,
                    opens: p.opens,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BounceWire {
    #[serde(default)]
    total_bounced: u64,
    #[serde(default)]
    total_domains: u64,
    #[serde(default)]
    bounce_rate: f64,
    #[serde(default)]
    top_domains: Vec<TopDomainWire>,
}

#[derive(Debug, Deserialize)]
struct TopDomainWire {
    domain: String,
    count: u64,
    #[serde(default)]
    percentage: f64,
}

impl BounceWire {
    pub(crate) fn into_breakdown(self, period: ReportingPeriod) -> BounceBreakdown {
        BounceBreakdown {
            period,
            top_domains: self
                .top_domains
                .into_iter()
                .map(|d| BouncedDomain {
                    domain: d.domain,
                    count: d.count,
                    percentage: d.percentage,
                })
                .collect(),
            total_domains: self.total_domains,
            total_bounces: self.total_bounced,
            bounce_rate: self.bounce_rate,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaginationWire {
    page: u32,
    per_page: u32,
    total: u64,
    #[serde(default)]
    last_page: u32,
}

impl PaginationWire {
    fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        let total_pages = if self.last_page > 0 || self.total == 0 || self.per_page == 0 {
            self.last_page
        } else {
            u32::try_from(self.total.div_ceil(u64::from(self.per_page))).unwrap_or(u32::MAX)
        };

        Page {
            items,
            total_items: self.total,
            page: self.page,
            page_size: self.per_page,
            total_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainListingWire {
    data: DomainRowsWire,
    pagination: PaginationWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainRowsWire {
    domains: Vec<DomainRowWire>,
    #[serde(default)]
    total_bounces: u64,
}

#[derive(Debug, Deserialize)]
struct DomainRowWire {
    domain: String,
    bounce_count: u64,
}

impl DomainListingWire {
    pub(crate) fn into_page(self) -> Page<BouncedDomain> {
        let total = self.data.total_bounces;
        let rows = self
            .data
            .domains
            .into_iter()
            .map(|row| BouncedDomain {
                percentage: percentage(row.bounce_count, total),
                domain: row.domain,
                count: row.bounce_count,
            })
            .collect();
        self.pagination.into_page(rows)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailListingWire {
    data: Vec<EmailRowWire>,
    pagination: PaginationWire,
}

#[derive(Debug, Deserialize)]
struct EmailRowWire {
    address: String,
    domain: String,
    bounce_count: u64,
    #[serde(default)]
    last_bounce: String,
}

impl EmailListingWire {
    pub(crate) fn into_page(self) -> Page<BouncedEmail> {
        let rows = self
            .data
            .into_iter()
            .map(|row| BouncedEmail {
                email: row.address,
                domain: row.domain,
                bounce_date: row.last_bounce,
                bounce_count: row.bounce_count,
            })
            .collect();
        self.pagination.into_page(rows)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpensWire {
    summary: OpensSummaryWire,
    #[serde(default)]
    chart_data: Vec<OpensPointWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpensSummaryWire {
    #[serde(default)]
    total_opens: u64,
    #[serde(default)]
    unique_opens: u64,
    #[serde(default)]
    open_rate: f64,
    #[serde(default)]
    top_domains: Vec<OpenedDomainWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenedDomainWire {
    domain: String,
    opens: u64,
    #[serde(default)]
    unique_opens: u64,
    #[serde(default)]
    percentage: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpensPointWire {
    date: String,
    #[serde(default)]
    opens: u64,
    #[serde(default)]
    unique_opens: u64,
}

impl OpensWire {
    pub(crate) fn into_report(self) -> OpensReport {
        OpensReport {
            total_opens: self.summary.total_opens,
            unique_opens: self.summary.unique_opens,
            open_rate: self.summary.open_rate,
            top_domains: self
                .summary
                .top_domains
                .into_iter()
                .map(|d| OpenedDomain {
                    domain: d.domain,
                    opens: d.opens,
                    unique_opens: d.unique_opens,
                    percentage: d.percentage,
                })
                .collect(),
            chart: self
                .chart_data
                .into_iter()
                .map(|p| OpensPoint {
                    date: p.date,
                    opens: p.opens,
                    unique_opens: p.unique_opens,
                })
                .collect(),
        }
    }
}
