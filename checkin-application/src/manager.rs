use checkin_domain::{CheckInOutcome, EventConnection, ScanLogEntry, ScanType};
use tracing::{info, warn};

use crate::commands::sync_commands::SyncReport;
use crate::commands::upload_commands::UploadReport;
use crate::commands::{checkin_commands, sync_commands, upload_commands};
use crate::queries::scan_log_queries;
use crate::{AppError, EngineContext, EngineState, Session, SessionSnapshot};

/// Owns the store of the loaded event and runs sync and check-in against it.
///
/// Not synchronized: callers serialize access, normally through
/// [`crate::CheckinWorker`].
pub struct CheckinManager {
    context: EngineContext,
    session: Option<Session>,
    state: EngineState,
}

impl CheckinManager {
    pub fn new(context: EngineContext) -> Self {
        Self {
            context,
            session: None,
            state: EngineState::Unloaded,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Closes any open store, opens the one for `connection` and syncs it.
    /// On failure the engine is left unloaded.
    pub async fn load(&mut self, connection: EventConnection) -> Result<SyncReport, AppError> {
        connection
            .validate()
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        self.state = EngineState::Loading;
        if let Some(previous) = self.session.take() {
            info!(event_id = %previous.connection.event_id, "closing previous event store");
            previous.close();
        }

        info!(event_id = %connection.event_id, "opening event store");
        let store = match self.context.opener.open(&connection) {
            Ok(store) => store,
            Err(err) => {
                self.state = EngineState::Unloaded;
                return Err(AppError::Internal(err));
            }
        };
        let mut session = Session::new(connection, store);

        match sync_commands::synchronize_data_with_event(&self.context, &mut session).await {
            Ok(report) => {
                self.session = Some(session);
                self.state = EngineState::Ready;
                Ok(report)
            }
            Err(err) => {
                warn!(event_id = %session.connection.event_id, "load failed: {}", err);
                session.close();
                self.state = EngineState::Unloaded;
                Err(err)
            }
        }
    }

    pub async fn check_in(&mut self, code: &str) -> Result<CheckInOutcome, AppError> {
        let session = ready_session(self.state, &mut self.session)?;
        checkin_commands::check_in(&self.context, session, code).await
    }

    pub async fn synchronize(&mut self) -> Result<SyncReport, AppError> {
        let session = ready_session(self.state, &mut self.session)?;
        sync_commands::synchronize_data_with_event(&self.context, session).await
    }

    /// Sends pending scans to the server and records its verdicts.
    pub async fn upload_pending(&mut self) -> Result<UploadReport, AppError> {
        let session = ready_session(self.state, &mut self.session)?;
        upload_commands::upload_pending(&self.context, session).await
    }

    pub fn pending_scans(&self, scan_type: ScanType) -> Result<Vec<ScanLogEntry>, AppError> {
        let session = self.session.as_ref().ok_or(AppError::NotLoaded)?;
        scan_log_queries::pending_scans(session, scan_type)
    }

    pub fn latest_scan(
        &self,
        scan_type: ScanType,
        ticket_uuid: &str,
    ) -> Result<Option<ScanLogEntry>, AppError> {
        let session = self.session.as_ref().ok_or(AppError::NotLoaded)?;
        scan_log_queries::latest_scan(session, scan_type, ticket_uuid)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        scan_log_queries::snapshot(self.state, self.session.as_ref())
    }

    /// Closes the open store, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.state = EngineState::Unloaded;
    }
}

fn ready_session(
    state: EngineState,
    session: &mut Option<Session>,
) -> Result<&mut Session, AppError> {
    if state != EngineState::Ready {
        return Err(AppError::NotLoaded);
    }
    session.as_mut().ok_or(AppError::NotLoaded)
}
