use std::collections::HashMap;

use checkin_domain::ports::RemoteResponse;
use checkin_domain::EventConnection;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{AppError, EngineContext, Session};

/// Watermark of a store that has never completed a sync.
pub const NEVER_SYNCED: i64 = -1;
pub const FETCH_CHUNK_SIZE: usize = 200;

const SERVER_TIME_HEADER: &str = "Alfio-TIME";
const DEFAULT_SERVER_TIME: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The identifier list could not be fetched; nothing changed locally.
    pub skipped: bool,
    pub identifiers: usize,
    pub payloads_stored: usize,
    pub failed_chunks: usize,
    pub watermark: Option<i64>,
}

pub async fn synchronize_data_with_event(
    ctx: &EngineContext,
    session: &mut Session,
) -> Result<SyncReport, AppError> {
    info!(event_id = %session.connection.event_id, "sync data with event if necessary");
    let report = sync_attendees(ctx, session).await?;
    info!(
        event_id = %session.connection.event_id,
        skipped = report.skipped,
        payloads = report.payloads_stored,
        "end sync data with event"
    );
    Ok(report)
}

/// Pulls identifiers changed since the stored watermark, then fetches and
/// caches their payloads in chunks of [`FETCH_CHUNK_SIZE`].
///
/// A failed chunk is logged and skipped; the watermark still advances once
/// the loop ends. Only a failed identifier pull leaves the watermark as is.
pub async fn sync_attendees(
    ctx: &EngineContext,
    session: &mut Session,
) -> Result<SyncReport, AppError> {
    let event_id = session.connection.event_id.clone();
    let last_updated = session
        .store
        .last_updated(&event_id)?
        .unwrap_or(NEVER_SYNCED);
    let changed_since = (last_updated != NEVER_SYNCED).then_some(last_updated);

    let Some(ids) = load_ids(ctx, &session.connection, changed_since).await else {
        warn!(%event_id, "identifier pull failed, keeping cached attendees");
        ctx.metrics.record_sync_skipped();
        return Ok(SyncReport {
            skipped: true,
            ..SyncReport::default()
        });
    };

    let server_time = ids
        .header(SERVER_TIME_HEADER)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_SERVER_TIME);
    info!(%event_id, found = ids.body.len(), server_time, "changed attendee identifiers");

    let mut report = SyncReport {
        identifiers: ids.body.len(),
        ..SyncReport::default()
    };
    for (index, chunk) in ids.body.chunks(FETCH_CHUNK_SIZE).enumerate() {
        let from = index * FETCH_CHUNK_SIZE;
        debug!(from, to = from + chunk.len(), "fetching attendee payloads");
        match fetch_payloads(ctx, &session.connection, chunk).await {
            Some(payloads) => {
                for (identifier, payload) in &payloads {
                    session.store.put_attendee(identifier, payload)?;
                }
                debug!(stored = payloads.len(), "attendee payloads cached");
                report.payloads_stored += payloads.len();
            }
            None => {
                warn!(from, to = from + chunk.len(), "attendee payload fetch failed");
                report.failed_chunks += 1;
            }
        }
    }

    // The watermark never rewinds: a server clock behind the stored value,
    // or a missing time header, keeps the previous one.
    let watermark = server_time.max(last_updated);
    session.store.put_last_updated(&event_id, watermark)?;
    report.watermark = Some(watermark);
    ctx.metrics.record_sync(report.payloads_stored);
    Ok(report)
}

async fn load_ids(
    ctx: &EngineContext,
    connection: &EventConnection,
    changed_since: Option<i64>,
) -> Option<RemoteResponse<Vec<i64>>> {
    let url = connection.identifiers_url(changed_since);
    let response = ctx
        .remote
        .get(&url, &connection.api_key, ctx.settings.request_timeout)
        .await?;
    match response.decode::<Vec<i64>>() {
        Ok(ids) => Some(ids),
        Err(err) => {
            warn!(%url, "unexpected identifier list: {}", err);
            None
        }
    }
}

async fn fetch_payloads(
    ctx: &EngineContext,
    connection: &EventConnection,
    ids: &[i64],
) -> Option<HashMap<String, String>> {
    let url = connection.offline_payloads_url();
    let response = ctx
        .remote
        .post(
            &url,
            &connection.api_key,
            ctx.settings.request_timeout,
            &json!(ids),
        )
        .await?;
    match response.decode::<HashMap<String, String>>() {
        Ok(payloads) => Some(payloads.body),
        Err(err) => {
            warn!(%url, "unexpected attendee payload map: {}", err);
            None
        }
    }
}
