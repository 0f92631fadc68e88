use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use checkin_application::commands::sync_commands::SyncReport;
use checkin_application::commands::upload_commands::UploadReport;
use checkin_application::{AppError, CheckinHandle, Metrics, SessionSnapshot};
use checkin_domain::{CheckInOutcome, EventConnection, ScanType};
use checkin_infrastructure::{validate_event, AppConfig};

use crate::context::AppContext;

/// Event selection given on the command line. A QR payload wins over the
/// individual flags; flags override the `[event]` table of the config file.
#[derive(Debug, Default, Clone)]
pub struct EventOverrides {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub event: Option<String>,
    pub qr: Option<String>,
}

impl EventOverrides {
    pub fn resolve(self, configured: Option<EventConnection>) -> Result<EventConnection> {
        if let Some(qr) = self.qr {
            let connection = EventConnection::from_qr_json(&qr)?;
            validate_event(&connection)?;
            return Ok(connection);
        }
        let mut connection = match configured {
            Some(connection) => connection,
            None if self.url.is_none() && self.api_key.is_none() && self.event.is_none() => {
                return Err(anyhow!(
                    "no event configured: set [event] in the config file or pass --url, --api-key and --event"
                ));
            }
            None => EventConnection::new("", "", ""),
        };
        if let Some(url) = self.url {
            connection.base_url = url;
        }
        if let Some(api_key) = self.api_key {
            connection.api_key = api_key;
        }
        if let Some(event) = self.event {
            connection.event_id = event;
        }
        validate_event(&connection)?;
        Ok(connection)
    }
}

/// Loads the event, then checks in every code read from stdin (one per
/// line) until EOF or a shutdown signal. Outcomes are printed as JSON lines.
///
/// Lines starting with `:` are commands: `:sync`, `:upload`, `:status`,
/// `:pending`.
pub async fn run_standalone(overrides: EventOverrides, print_metrics: bool) -> Result<()> {
    let context = AppContext::new().await?;
    let connection = overrides.resolve(context.config.event.clone())?;
    let (handle, worker) = context.spawn_worker();

    info!(event_id = %connection.event_id, "loading event");
    let report = handle.load(connection).await?;
    info!(
        identifiers = report.identifiers,
        payloads = report.payloads_stored,
        skipped = report.skipped,
        "event loaded"
    );

    tokio::select! {
        result = read_codes(&handle) => result?,
        _ = shutdown_signal() => info!("shutdown signal received"),
    }

    handle.stop().await;
    if let Err(err) = worker.await {
        warn!("check-in worker ended abnormally: {}", err);
    }
    if print_metrics {
        print!("{}", context.engine.metrics.render_prometheus());
    }
    Ok(())
}

async fn read_codes(handle: &CheckinHandle) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();
    while let Some(line) = lines.next_line().await? {
        let output = match line.trim() {
            ":sync" => serde_json::to_string(&handle.sync().await?)?,
            ":upload" => serde_json::to_string(&handle.upload().await?)?,
            ":status" => serde_json::to_string(&handle.snapshot().await?)?,
            ":pending" => {
                let check_ins = handle.pending_scans(ScanType::CheckIn).await?;
                let badges = handle.pending_scans(ScanType::Badge).await?;
                serde_json::to_string(&serde_json::json!({
                    "checkIn": check_ins,
                    "badge": badges,
                }))?
            }
            code => {
                let outcome = handle.check_in(code).await?;
                info!(status = %outcome.status, "scan processed");
                serde_json::to_string(&outcome)?
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    info!("end of input");
    Ok(())
}

/// Engine running on its own runtime, driven through blocking calls.
/// Must not be used from inside another tokio runtime.
pub struct EmbeddedEngine {
    runtime: Runtime,
    handle: CheckinHandle,
    worker: Option<JoinHandle<()>>,
    metrics: Arc<Metrics>,
}

impl EmbeddedEngine {
    pub fn load(&self, connection: EventConnection) -> Result<SyncReport, AppError> {
        self.runtime.block_on(self.handle.load(connection))
    }

    pub fn check_in(&self, code: &str) -> Result<CheckInOutcome, AppError> {
        self.runtime.block_on(self.handle.check_in(code))
    }

    pub fn sync(&self) -> Result<SyncReport, AppError> {
        self.runtime.block_on(self.handle.sync())
    }

    pub fn upload(&self) -> Result<UploadReport, AppError> {
        self.runtime.block_on(self.handle.upload())
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, AppError> {
        self.runtime.block_on(self.handle.snapshot())
    }

    /// Async submission side, for callers that run their own executor.
    pub fn handle(&self) -> CheckinHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn stop(mut self) {
        let worker = self.worker.take();
        let handle = self.handle.clone();
        self.runtime.block_on(async move {
            handle.stop().await;
            if let Some(worker) = worker {
                let _ = worker.await;
            }
        });
    }
}

pub fn start_embedded(config: AppConfig) -> Result<EmbeddedEngine> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("alfio-checkin-rt")
        .enable_all()
        .build()?;
    let guard = runtime.enter();
    let context = AppContext::from_config(config)?;
    let (handle, worker) = context.spawn_worker();
    drop(guard);
    info!(data_dir = %context.config.data_dir, "embedded check-in engine started");
    Ok(EmbeddedEngine {
        runtime,
        handle,
        worker: Some(worker),
        metrics: context.engine.metrics.clone(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("cannot listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_application::EngineState;
    use checkin_domain::ScanStatus;

    fn unreachable_base_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn embedded_engine_works_offline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            data_dir: dir.path().join("data").to_string_lossy().to_string(),
            request_timeout_ms: Some(500),
            ..AppConfig::default()
        };
        let engine = start_embedded(config).expect("start");

        let report = engine
            .load(EventConnection::new(unreachable_base_url(), "key", "devoxx"))
            .expect("load");
        assert!(report.skipped);
        assert_eq!(engine.snapshot().expect("snapshot").state, EngineState::Ready);

        let outcome = engine.check_in("abc/def").expect("check in");
        assert_eq!(outcome.status, ScanStatus::TicketNotFound);
        let outcome = engine.check_in("").expect("check in");
        assert_eq!(outcome.status, ScanStatus::EmptyTicketCode);
        let upload = engine.upload().expect("upload");
        assert_eq!(upload.sent, 0);

        let handle = engine.handle();
        engine.stop();
        assert!(dir.path().join("data").is_dir());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        assert!(matches!(
            runtime.block_on(handle.check_in("abc/def")),
            Err(AppError::WorkerStopped)
        ));
    }

    #[test]
    fn flags_override_configured_event() {
        let overrides = EventOverrides {
            event: Some("jug".to_string()),
            ..EventOverrides::default()
        };
        let configured = EventConnection::new("https://alf.io", "key", "devoxx");

        let connection = overrides.resolve(Some(configured)).expect("resolve");

        assert_eq!(connection.base_url, "https://alf.io");
        assert_eq!(connection.event_id, "jug");
    }

    #[test]
    fn qr_payload_takes_precedence() {
        let overrides = EventOverrides {
            url: Some("https://ignored.example".to_string()),
            qr: Some(r#"{"url":"https://alf.io","apiKey":"k","event":"devoxx"}"#.to_string()),
            ..EventOverrides::default()
        };

        let connection = overrides.resolve(None).expect("resolve");

        assert_eq!(connection.base_url, "https://alf.io");
        assert_eq!(connection.api_key, "k");
    }

    #[test]
    fn missing_event_is_an_error() {
        assert!(EventOverrides::default().resolve(None).is_err());
        let partial = EventOverrides {
            url: Some("https://alf.io".to_string()),
            ..EventOverrides::default()
        };
        assert!(partial.resolve(None).is_err());
    }
}
