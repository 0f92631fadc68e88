use checkin_domain::{CheckInOutcome, EventConnection, ScanLogEntry, ScanType};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::commands::sync_commands::SyncReport;
use crate::commands::upload_commands::UploadReport;
use crate::{AppError, CheckinManager, SessionSnapshot};

type Reply<T> = oneshot::Sender<Result<T, AppError>>;

enum Command {
    Load {
        connection: EventConnection,
        reply: Reply<SyncReport>,
    },
    CheckIn {
        code: String,
        reply: Reply<CheckInOutcome>,
    },
    Synchronize {
        reply: Reply<SyncReport>,
    },
    Upload {
        reply: Reply<UploadReport>,
    },
    PendingScans {
        scan_type: ScanType,
        reply: Reply<Vec<ScanLogEntry>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Single task that owns the [`CheckinManager`] and runs queued commands
/// one at a time, in submission order.
pub struct CheckinWorker;

impl CheckinWorker {
    pub fn spawn(manager: CheckinManager) -> (CheckinHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(manager, rx));
        (CheckinHandle { tx }, task)
    }
}

async fn run(mut manager: CheckinManager, mut rx: mpsc::UnboundedReceiver<Command>) {
    info!("check-in worker started");
    while let Some(command) = rx.recv().await {
        match command {
            Command::Load { connection, reply } => {
                let _ = reply.send(manager.load(connection).await);
            }
            Command::CheckIn { code, reply } => {
                let _ = reply.send(manager.check_in(&code).await);
            }
            Command::Synchronize { reply } => {
                let _ = reply.send(manager.synchronize().await);
            }
            Command::Upload { reply } => {
                let _ = reply.send(manager.upload_pending().await);
            }
            Command::PendingScans { scan_type, reply } => {
                let _ = reply.send(manager.pending_scans(scan_type));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(manager.snapshot());
            }
            Command::Stop { reply } => {
                rx.close();
                manager.stop();
                let _ = reply.send(());
                break;
            }
        }
    }
    manager.stop();
    info!("check-in worker stopped");
}

/// Cloneable submission side of the worker queue.
#[derive(Clone)]
pub struct CheckinHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CheckinHandle {
    pub async fn load(&self, connection: EventConnection) -> Result<SyncReport, AppError> {
        self.request(|reply| Command::Load { connection, reply }).await
    }

    pub async fn check_in(&self, code: impl Into<String>) -> Result<CheckInOutcome, AppError> {
        let code = code.into();
        self.request(|reply| Command::CheckIn { code, reply }).await
    }

    pub async fn sync(&self) -> Result<SyncReport, AppError> {
        self.request(|reply| Command::Synchronize { reply }).await
    }

    pub async fn upload(&self) -> Result<UploadReport, AppError> {
        self.request(|reply| Command::Upload { reply }).await
    }

    pub async fn pending_scans(&self, scan_type: ScanType) -> Result<Vec<ScanLogEntry>, AppError> {
        self.request(|reply| Command::PendingScans { scan_type, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Waits for queued work to finish, then closes the store.
    /// Later submissions fail with [`AppError::WorkerStopped`].
    pub async fn stop(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Stop { reply }).is_err() {
            debug!("check-in worker already stopped");
            return;
        }
        let _ = done.await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, AppError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| AppError::WorkerStopped)?;
        response.await.map_err(|_| AppError::WorkerStopped)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_domain::{EngineSettings, ScanStatus};
    use serde_json::json;

    use crate::testing::{connection, context_with_opener, FakeRemote, MemoryOpener};
    use crate::EngineState;

    fn spawn(remote: FakeRemote, opener: MemoryOpener) -> (CheckinHandle, JoinHandle<()>) {
        let context = context_with_opener(remote, opener, EngineSettings::default());
        CheckinWorker::spawn(CheckinManager::new(context))
    }

    #[tokio::test]
    async fn commands_run_in_submission_order() {
        let remote = FakeRemote::default()
            .with_ids(json!([1, 2]), Some("1000"))
            .echo_payloads();
        let (handle, task) = spawn(remote, MemoryOpener::default());

        let load = handle.load(connection("devoxx"));
        let first = handle.check_in("abc/def");
        let second = handle.check_in("no-separator");
        let (load, first, second) = tokio::join!(load, first, second);

        assert_eq!(load.expect("load").payloads_stored, 2);
        assert_eq!(first.expect("first").status, ScanStatus::TicketNotFound);
        assert_eq!(second.expect("second").status, ScanStatus::InvalidTicketCode);

        handle.stop().await;
        task.await.expect("worker task");
    }

    #[tokio::test]
    async fn load_failure_is_reported_to_caller() {
        let (handle, _task) = spawn(FakeRemote::default(), MemoryOpener::failing());

        let err = handle.load(connection("devoxx")).await.expect_err("load fails");

        assert!(matches!(err, AppError::Internal(_)));
        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.state, EngineState::Unloaded);
    }

    #[tokio::test]
    async fn stop_closes_store_and_rejects_later_work() {
        let opener = MemoryOpener::default();
        let (handle, task) = spawn(FakeRemote::default(), opener.clone());
        handle.load(connection("devoxx")).await.expect("load");

        handle.stop().await;
        handle.stop().await;
        task.await.expect("worker task");

        assert!(opener
            .tables(&connection("devoxx"))
            .lock()
            .expect("tables")
            .closed);
        assert!(matches!(
            handle.check_in("a/b").await,
            Err(AppError::WorkerStopped)
        ));
    }

    #[tokio::test]
    async fn pending_scans_are_visible_through_the_handle() {
        let (handle, _task) = spawn(FakeRemote::default(), MemoryOpener::default());
        handle.load(connection("devoxx")).await.expect("load");

        let pending = handle
            .pending_scans(ScanType::Badge)
            .await
            .expect("pending scans");

        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn upload_is_available_through_the_handle() {
        let remote = FakeRemote::default().accept_uploads("SUCCESS");
        let opener = MemoryOpener::default();
        let (handle, _task) = spawn(remote.clone(), opener.clone());
        handle.load(connection("devoxx")).await.expect("load");
        {
            let tables = opener.tables(&connection("devoxx"));
            let mut tables = tables.lock().expect("tables");
            let entry = ScanLogEntry::pending("ticket-1", ScanType::Badge);
            tables.scan_log.push(("key-1".to_string(), entry));
            tables
                .badge_mapping
                .insert("ticket-1".to_string(), "key-1".to_string());
        }

        let report = handle.upload().await.expect("upload");

        assert_eq!(report.resolved, 1);
        assert!(handle
            .pending_scans(ScanType::Badge)
            .await
            .expect("pending")
            .is_empty());
        assert_eq!(remote.bulk_bodies().len(), 1);
    }
}
