use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use checkin_application::{CheckinHandle, CheckinManager, CheckinWorker, EngineContext, Metrics};
use checkin_infrastructure::{AppConfig, HttpRemoteClient, SqliteStoreOpener};

pub struct AppContext {
    pub config: AppConfig,
    pub engine: EngineContext,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> Result<Self> {
        let remote = HttpRemoteClient::new(config.connect_timeout())?;
        let engine = EngineContext {
            remote: Arc::new(remote),
            opener: Arc::new(SqliteStoreOpener::new(config.data_dir())),
            settings: config.to_engine_settings(),
            metrics: Arc::new(Metrics::default()),
        };
        Ok(Self { config, engine })
    }

    /// Must be called from within a tokio runtime.
    pub fn spawn_worker(&self) -> (CheckinHandle, JoinHandle<()>) {
        CheckinWorker::spawn(CheckinManager::new(self.engine.clone()))
    }
}
