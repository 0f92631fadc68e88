use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use checkin_domain::{DecryptFailurePolicy, EngineSettings, EventConnection};

use crate::config::validation::validate_event;
use crate::utils::resolve_path;

pub const CONFIG_PATH_ENV: &str = "ALFIO_CHECKIN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./checkin.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: String,
    pub request_timeout_ms: Option<u64>,
    pub connect_timeout_ms: u64,
    pub decrypt_failure_policy: DecryptFailurePolicy,
    pub event: Option<EventConnection>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            request_timeout_ms: None,
            connect_timeout_ms: 5000,
            decrypt_failure_policy: DecryptFailurePolicy::Record,
            event: None,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path)).await
    }

    pub async fn load_from(file_path: &Path) -> Result<Self> {
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str(&content)
                .map_err(|err| anyhow!("invalid {}: {}", file_path.display(), err))?
        } else {
            warn!(path = %file_path.display(), "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(file_path.parent());
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.data_dir = self.data_dir.trim().to_string();
        if self.request_timeout_ms == Some(0) {
            self.request_timeout_ms = None;
        }
        if let Some(event) = &mut self.event {
            event.base_url = event.base_url.trim().to_string();
            event.api_key = event.api_key.trim().to_string();
            event.event_id = event.event_id.trim().to_string();
            if event.ssid.as_deref().is_some_and(|ssid| ssid.trim().is_empty()) {
                event.ssid = None;
            }
            if event
                .password
                .as_deref()
                .is_some_and(|password| password.trim().is_empty())
            {
                event.password = None;
            }
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.data_dir = resolve_path(base, &self.data_dir);
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.is_empty() {
            return Err(anyhow!("data_dir must not be empty"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(anyhow!("connect_timeout_ms must be greater than 0"));
        }
        if let Some(event) = &self.event {
            validate_event(event).map_err(|err| anyhow!("invalid [event]: {}", err))?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn to_engine_settings(&self) -> EngineSettings {
        EngineSettings {
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
            decrypt_failure_policy: self.decrypt_failure_policy,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("ALFIO_CHECKIN_DATA_DIR") {
            self.data_dir = value;
        }
        if let Ok(value) = env::var("ALFIO_CHECKIN_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = value.parse().ok();
        }
        if let Ok(value) = env::var("ALFIO_CHECKIN_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = value.parse().unwrap_or(self.connect_timeout_ms);
        }
        if let Ok(value) = env::var("ALFIO_CHECKIN_DECRYPT_FAILURE_POLICY") {
            match value.trim().to_ascii_lowercase().as_str() {
                "record" => self.decrypt_failure_policy = DecryptFailurePolicy::Record,
                "reject" => self.decrypt_failure_policy = DecryptFailurePolicy::Reject,
                other => warn!("ignoring unknown decrypt failure policy '{}'", other),
            }
        }
    }
}
