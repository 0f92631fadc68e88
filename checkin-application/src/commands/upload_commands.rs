use std::collections::HashMap;

use checkin_domain::{
    EventConnection, ScanLogEntry, ScanStatus, ScanType, PENDING_SCAN_PAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{AppError, EngineContext, Session};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    /// Pending entries sent to the server.
    pub sent: usize,
    /// Entries the server gave a verdict for.
    pub resolved: usize,
    /// Batches the server did not answer; their entries stay pending.
    pub failed_batches: usize,
}

#[derive(Serialize)]
struct BulkItem<'a> {
    identifier: &'a str,
    code: Option<&'a str>,
}

#[derive(Deserialize)]
struct BulkVerdict {
    result: BulkResult,
}

#[derive(Deserialize)]
struct BulkResult {
    status: ScanStatus,
}

/// Sends pending check-in and badge scans to the server, one page at a
/// time, and records each verdict as a new log entry. Existing entries are
/// never edited; the index moves to the verdict, which drops the ticket
/// from the pending list.
///
/// A page with an unanswered or unresolved entry ends the run for its scan
/// type; those entries go out again on the next upload.
pub async fn upload_pending(
    ctx: &EngineContext,
    session: &mut Session,
) -> Result<UploadReport, AppError> {
    let event_id = session.connection.event_id.clone();
    let mut report = UploadReport::default();
    for scan_type in [ScanType::CheckIn, ScanType::Badge] {
        loop {
            let pending = session.store.find_pending_by_type(scan_type)?;
            if pending.is_empty() {
                break;
            }
            report.sent += pending.len();
            let Some(verdicts) = post_bulk(ctx, &session.connection, &pending).await else {
                warn!(%event_id, %scan_type, count = pending.len(), "bulk upload failed");
                ctx.metrics.record_upload_failed();
                report.failed_batches += 1;
                break;
            };

            let mut resolved = 0;
            for entry in &pending {
                let Some(status) = verdict_for(&verdicts, &entry.scan_id) else {
                    debug!(uuid = %entry.scan_id, %scan_type, "no verdict, left pending");
                    continue;
                };
                session.store.add_scan(&entry.with_remote_status(status))?;
                resolved += 1;
            }
            ctx.metrics.record_upload(resolved);
            report.resolved += resolved;
            debug!(%scan_type, sent = pending.len(), resolved, "bulk page uploaded");
            if resolved < pending.len() || pending.len() < PENDING_SCAN_PAGE_SIZE {
                break;
            }
        }
    }
    info!(
        %event_id,
        sent = report.sent,
        resolved = report.resolved,
        failed = report.failed_batches,
        "pending scans uploaded"
    );
    Ok(report)
}

fn verdict_for(verdicts: &HashMap<String, Value>, uuid: &str) -> Option<ScanStatus> {
    let verdict = verdicts.get(uuid)?;
    match serde_json::from_value::<BulkVerdict>(verdict.clone()) {
        Ok(verdict) if verdict.result.status != ScanStatus::Retry => Some(verdict.result.status),
        Ok(_) => None,
        Err(err) => {
            warn!(%uuid, "unexpected bulk verdict: {}", err);
            None
        }
    }
}

async fn post_bulk(
    ctx: &EngineContext,
    connection: &EventConnection,
    entries: &[ScanLogEntry],
) -> Option<HashMap<String, Value>> {
    let items: Vec<BulkItem<'_>> = entries
        .iter()
        .map(|entry| BulkItem {
            identifier: &entry.scan_id,
            code: match entry.scan_type {
                ScanType::CheckIn => entry.code.as_deref(),
                ScanType::Badge => None,
            },
        })
        .collect();
    let body = serde_json::to_value(&items).ok()?;
    let url = connection.bulk_check_in_url();
    let response = ctx
        .remote
        .post(&url, &connection.api_key, ctx.settings.request_timeout, &body)
        .await?;
    match response.decode::<HashMap<String, Value>>() {
        Ok(verdicts) => Some(verdicts.body),
        Err(err) => {
            warn!(%url, "unexpected bulk check-in response: {}", err);
            None
        }
    }
}
