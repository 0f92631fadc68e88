use std::sync::Arc;

use checkin_domain::ports::{CheckinStore, RemoteClient, StoreOpener};
use checkin_domain::{EngineSettings, EventConnection};
use serde::Serialize;
use tracing::{info, warn};

use crate::Metrics;

#[derive(Clone)]
pub struct EngineContext {
    pub remote: Arc<dyn RemoteClient>,
    pub opener: Arc<dyn StoreOpener>,
    pub settings: EngineSettings,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
}

/// The loaded event and the store opened for it.
pub struct Session {
    pub connection: EventConnection,
    pub store: Box<dyn CheckinStore>,
}

impl Session {
    pub fn new(connection: EventConnection, store: Box<dyn CheckinStore>) -> Self {
        Self { connection, store }
    }

    pub fn close(mut self) {
        match self.store.close() {
            Ok(()) => info!(event_id = %self.connection.event_id, "store closed"),
            Err(err) => warn!(
                event_id = %self.connection.event_id,
                "failed to close store: {}", err
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: EngineState,
    pub event_id: Option<String>,
    pub attendee_count: u64,
    pub last_updated: Option<i64>,
}
