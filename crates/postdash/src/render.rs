//! Plain-text presentation of view states.

use std::fmt::Write;

use postdash_api::{
    BounceBreakdown, BouncedDomain, BouncedEmail, Identity, OpensReport, Page, ReportingPeriod,
    ServerConnection, StatsSnapshot,
};
use postdash_core::{PageItem, ViewState};

/// Renders a view state: the data when present, a loading line while the
/// first request runs and the error when there is one.
pub fn view_state<T>(state: &ViewState<T>, render: impl Fn(&T) -> String) -> String {
    let mut out = String::new();
    match &state.data {
        Some(data) => {
            out.push_str(&render(data));
            if state.placeholder {
                out.push_str("(showing previous results)\n");
            } else if state.loading {
                out.push_str("(refreshing)\n");
            }
        }
        None if state.loading => out.push_str("Loading...\n"),
        None if state.error.is_none() => out.push_str("No data\n"),
        None => {}
    }
    if let Some(err) = &state.error {
        let _ = writeln!(out, "Error: {err}");
    }
    out
}

fn row_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// Left-aligned table with a header rule.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", row_line(headers.iter().copied(), &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in rows {
        let _ = writeln!(out, "{}", row_line(row.iter().map(String::as_str), &widths));
    }
    out
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Signed-in operator.
pub fn identity(identity: &Identity) -> String {
    if identity.display_name.is_empty() {
        format!("{}\n", identity.email)
    } else {
        format!("{} <{}>\n", identity.display_name, identity.email)
    }
}

/// Server list.
pub fn servers(servers: &[ServerConnection]) -> String {
    if servers.is_empty() {
        return "No servers configured\n".to_string();
    }
    let rows: Vec<Vec<String>> = servers
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.clone(),
                format!("{}:{}", s.host, s.port),
                s.database.clone(),
                s.status.display_name().to_string(),
            ]
        })
        .collect();
    table(&["ID", "NAME", "HOST", "DATABASE", "STATUS"], &rows)
}

/// Single server record.
pub fn server(server: &ServerConnection) -> String {
    format!(
        "{} ({}) {}:{}/{} as {}\n",
        server.name,
        server.status.display_name(),
        server.host,
        server.port,
        server.database,
        server.username
    )
}

/// Headline figures as a row of cards.
pub fn stat_cards(stats: &StatsSnapshot) -> String {
    let cards = [
        ("Sent", stats.total_sent.to_string()),
        ("Delivered", stats.total_delivered.to_string()),
        ("Bounced", stats.total_bounces.to_string()),
        ("Held", stats.total_held.to_string()),
        ("Opens", stats.total_opens.to_string()),
        ("Delivery", percent(stats.delivery_rate)),
        ("Bounce", percent(stats.bounce_rate)),
        ("Open", percent(stats.open_rate)),
    ];
    let mut out = format!("{}\n", stats.period.label());
    for (label, value) in cards {
        let _ = writeln!(out, "  {label:<10} {value:>10}");
    }
    if !stats.time_series.is_empty() {
        let rows: Vec<Vec<String>> = stats
            .time_series
            .iter()
            .map(|p| vec![p.date.clone(), p.sent.to_string(), p.bounces.to_string(), p.opens.to_string()])
            .collect();
        out.push('\n');
        out.push_str(&table(&["DATE", "SENT", "BOUNCED", "OPENS"], &rows));
    }
    out
}

/// Bounce breakdown by top domain.
pub fn breakdown(breakdown: &BounceBreakdown) -> String {
    let mut out = format!(
        "{} bounces across {} domains ({})\n",
        breakdown.total_bounces,
        breakdown.total_domains,
        percent(breakdown.bounce_rate)
    );
    if !breakdown.top_domains.is_empty() {
        out.push_str(&domain_rows(&breakdown.top_domains));
    }
    out
}

fn domain_rows(domains: &[BouncedDomain]) -> String {
    let rows: Vec<Vec<String>> = domains
        .iter()
        .map(|d| vec![d.domain.clone(), d.count.to_string(), percent(d.percentage)])
        .collect();
    table(&["DOMAIN", "BOUNCES", "SHARE"], &rows)
}

/// One page of bounced domains.
pub fn domain_page(page: &Page<BouncedDomain>) -> String {
    if page.is_empty() {
        return "No bounced domains\n".to_string();
    }
    domain_rows(&page.items)
}

/// One page of bounced addresses.
pub fn email_page(page: &Page<BouncedEmail>) -> String {
    if page.is_empty() {
        return "No bounced addresses\n".to_string();
    }
    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|e| {
            vec![
                e.email.clone(),
                e.domain.clone(),
                e.bounce_count.to_string(),
                e.bounce_date.clone(),
            ]
        })
        .collect();
    table(&["EMAIL", "DOMAIN", "BOUNCES", "LAST BOUNCE"], &rows)
}

/// Open statistics.
pub fn opens(report: &OpensReport) -> String {
    let mut out = format!(
        "{} opens, {} unique ({})\n",
        report.total_opens,
        report.unique_opens,
        percent(report.open_rate)
    );
    if !report.top_domains.is_empty() {
        let rows: Vec<Vec<String>> = report
            .top_domains
            .iter()
            .map(|d| {
                vec![
                    d.domain.clone(),
                    d.opens.to_string(),
                    d.unique_opens.to_string(),
                    percent(d.percentage),
                ]
            })
            .collect();
        out.push_str(&table(&["DOMAIN", "OPENS", "UNIQUE", "SHARE"], &rows));
    }
    out
}

/// Page navigation line, e.g. `< 1 ... 4 [5] 6 ... 10 >`.
pub fn pagination(current: u32, items: &[PageItem], can_prev: bool, can_next: bool) -> String {
    let mut parts = Vec::with_capacity(items.len() + 2);
    parts.push(if can_prev { "<" } else { " " }.to_string());
    for item in items {
        parts.push(match item {
            PageItem::Page(p) if *p == current => format!("[{p}]"),
            PageItem::Page(p) => p.to_string(),
            PageItem::Ellipsis => "...".to_string(),
        });
    }
    parts.push(if can_next { ">" } else { " " }.to_string());
    format!("{}\n", parts.join(" ").trim())
}

/// Period selector with the active period marked.
pub fn periods(active: ReportingPeriod) -> String {
    let mut out = String::new();
    for period in ReportingPeriod::ALL {
        let marker = if period == active { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {:<10} {}", period.as_str(), period.label());
    }
    out
}
