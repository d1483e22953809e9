//! Bounced-address CSV export to disk.

use std::path::{Path, PathBuf};

use postdash_api::{ApiClient, ReportingPeriod, ServerId, export_file_name};
use tracing::info;

use crate::error::Result;

/// Downloads the bounced-address CSV for `id` and `period` into `dir`.
///
/// The file is named `bounced-emails-{id}-{period}.csv`; `dir` is created if
/// needed. Returns the path written.
///
/// # Errors
///
/// Returns an API error (nothing is written) if the download fails, or an
/// I/O error if the file cannot be written.
pub async fn export_bounced_emails(
    api: &ApiClient,
    id: &ServerId,
    period: ReportingPeriod,
    dir: &Path,
) -> Result<PathBuf> {
    let body = api.export_bounced_emails(id, period).await?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(export_file_name(id, period));
    tokio::fs::write(&path, &body).await?;

    info!(server = %id, %period, path = %path.display(), bytes = body.len(), "Exported bounced emails");
    Ok(path)
}
