use checkin_domain::{ScanLogEntry, ScanType};

use crate::commands::sync_commands::NEVER_SYNCED;
use crate::{AppError, EngineState, Session, SessionSnapshot};

pub fn pending_scans(session: &Session, scan_type: ScanType) -> Result<Vec<ScanLogEntry>, AppError> {
    Ok(session.store.find_pending_by_type(scan_type)?)
}

pub fn latest_scan(
    session: &Session,
    scan_type: ScanType,
    ticket_uuid: &str,
) -> Result<Option<ScanLogEntry>, AppError> {
    let entry = match scan_type {
        ScanType::CheckIn => session.store.checkin_scan(ticket_uuid)?,
        ScanType::Badge => session.store.badge_scan(ticket_uuid)?,
    };
    Ok(entry)
}

pub fn snapshot(state: EngineState, session: Option<&Session>) -> Result<SessionSnapshot, AppError> {
    let Some(session) = session else {
        return Ok(SessionSnapshot {
            state,
            event_id: None,
            attendee_count: 0,
            last_updated: None,
        });
    };
    let event_id = session.connection.event_id.clone();
    let last_updated = session
        .store
        .last_updated(&event_id)?
        .filter(|value| *value != NEVER_SYNCED);
    Ok(SessionSnapshot {
        state,
        attendee_count: session.store.attendee_count()?,
        event_id: Some(event_id),
        last_updated,
    })
}
