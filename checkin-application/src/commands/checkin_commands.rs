use checkin_domain::{
    CheckInOutcome, DecryptFailurePolicy, ScanCode, ScanLogEntry, ScanStatus, ScanType,
    TicketCipher, TicketData,
};
use tracing::{debug, info, warn};

use crate::commands::sync_commands;
use crate::{AppError, EngineContext, Session};

/// Validates a scanned code against the local cache and records the
/// check-in and badge scan as pending remote reconciliation.
pub async fn check_in(
    ctx: &EngineContext,
    session: &mut Session,
    raw_code: &str,
) -> Result<CheckInOutcome, AppError> {
    let code = match ScanCode::parse(raw_code) {
        Ok(code) => code,
        Err(err) => {
            warn!("rejected scan code: {}", err);
            ctx.metrics.record_check_in_rejected();
            return Ok(CheckInOutcome::rejected(err.status()));
        }
    };

    let already_checked_in = session
        .store
        .checkin_scan(&code.uuid)?
        .is_some_and(|entry| entry.local_status == ScanStatus::Success);
    if already_checked_in {
        info!(uuid = %code.uuid, "already checked in");
        return Ok(CheckInOutcome::rejected(ScanStatus::AlreadyCheckIn));
    }

    let Some(payload) = resolve_payload(ctx, session, &code).await? else {
        warn!(uuid = %code.uuid, "no attendee data for ticket");
        ctx.metrics.record_check_in_rejected();
        return Ok(CheckInOutcome::rejected(ScanStatus::TicketNotFound));
    };

    let ticket = match decode_ticket(&code, &payload) {
        Ok(ticket) => Some(ticket),
        Err(err) => match ctx.settings.decrypt_failure_policy {
            DecryptFailurePolicy::Record => {
                warn!(uuid = %code.uuid, "cannot read ticket data, recording check-in anyway: {}", err);
                None
            }
            DecryptFailurePolicy::Reject => {
                // The code itself parsed; what the cache holds for it is unusable.
                warn!(uuid = %code.uuid, "cannot read ticket data: {}", err);
                ctx.metrics.record_check_in_rejected();
                return Ok(CheckInOutcome::rejected(ScanStatus::InvalidTicketState));
            }
        },
    };

    let entries = [
        ScanLogEntry::pending(code.uuid.clone(), ScanType::CheckIn).with_code(code.secret()),
        ScanLogEntry::pending(code.uuid.clone(), ScanType::Badge),
    ];
    let keys = session.store.add_scans(&entries)?;
    debug!(uuid = %code.uuid, ?keys, "scans logged");
    ctx.metrics.record_check_in();
    info!(uuid = %code.uuid, "checked in locally");
    Ok(CheckInOutcome::checked_in(ticket))
}

/// Cache lookup with a single re-sync on a miss.
async fn resolve_payload(
    ctx: &EngineContext,
    session: &mut Session,
    code: &ScanCode,
) -> Result<Option<String>, AppError> {
    let key = code.attendee_key();
    if let Some(payload) = session.store.attendee(&key)? {
        return Ok(Some(payload));
    }
    info!(uuid = %code.uuid, "attendee not cached, syncing before check-in");
    sync_commands::sync_attendees(ctx, session).await?;
    Ok(session.store.attendee(&key)?)
}

fn decode_ticket(code: &ScanCode, payload: &str) -> anyhow::Result<TicketData> {
    let plaintext = TicketCipher::derive(&code.secret()).decrypt(payload)?;
    Ok(serde_json::from_str(&plaintext)?)
}
