// In-memory doubles for the domain ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use checkin_domain::ports::{CheckinStore, RemoteClient, RemoteResponse, StoreOpener};
use checkin_domain::{
    new_scan_storage_key, EngineSettings, EventConnection, ScanLogEntry, ScanType,
    PENDING_SCAN_PAGE_SIZE,
};
use serde_json::{json, Value};

use crate::{EngineContext, Metrics, Session};

#[derive(Clone, Default)]
enum PayloadMode {
    #[default]
    Fail,
    Echo,
    Fixed(HashMap<String, String>),
}

#[derive(Default)]
struct RemoteScript {
    ids: Option<(Value, Option<String>)>,
    payloads: PayloadMode,
    bulk: Option<Value>,
    bulk_bodies: Vec<Value>,
    requested_urls: Vec<String>,
    posted_bodies: Vec<Value>,
}

/// Scripted remote: answers the identifier pull, the payload fetch and the
/// bulk upload.
#[derive(Clone, Default)]
pub struct FakeRemote {
    script: Arc<Mutex<RemoteScript>>,
}

impl FakeRemote {
    fn script(&self) -> MutexGuard<'_, RemoteScript> {
        self.script.lock().expect("remote script lock")
    }

    pub fn with_ids(self, ids: Value, server_time: Option<&str>) -> Self {
        self.script().ids = Some((ids, server_time.map(str::to_string)));
        self
    }

    /// Answers each posted id with `payload-<id>`.
    pub fn echo_payloads(self) -> Self {
        self.script().payloads = PayloadMode::Echo;
        self
    }

    pub fn with_payloads(self, payloads: HashMap<String, String>) -> Self {
        self.script().payloads = PayloadMode::Fixed(payloads);
        self
    }

    /// Answers every bulk upload with `response`; without it uploads fail.
    pub fn with_bulk_response(self, response: Value) -> Self {
        self.script().bulk = Some(response);
        self
    }

    /// Answers every uploaded identifier with `status`.
    pub fn accept_uploads(self, status: &str) -> Self {
        self.with_bulk_response(json!({ "*": status }))
    }

    pub fn bulk_bodies(&self) -> Vec<Value> {
        self.script().bulk_bodies.clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.script().requested_urls.clone()
    }

    pub fn posted_bodies(&self) -> Vec<Value> {
        self.script().posted_bodies.clone()
    }

    pub fn get_calls(&self) -> usize {
        self.script()
            .requested_urls
            .iter()
            .filter(|url| url.contains("offline-identifiers"))
            .count()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn get(
        &self,
        url: &str,
        _api_key: &str,
        _timeout: Option<Duration>,
    ) -> Option<RemoteResponse> {
        let mut script = self.script();
        script.requested_urls.push(url.to_string());
        let (ids, server_time) = script.ids.clone()?;
        let headers = server_time
            .map(|time| HashMap::from([("alfio-time".to_string(), time)]))
            .unwrap_or_default();
        Some(RemoteResponse { body: ids, headers })
    }

    async fn post(
        &self,
        url: &str,
        _api_key: &str,
        _timeout: Option<Duration>,
        body: &Value,
    ) -> Option<RemoteResponse> {
        let mut script = self.script();
        script.requested_urls.push(url.to_string());
        if url.contains("/bulk") {
            script.bulk_bodies.push(body.clone());
            return bulk_answer(script.bulk.as_ref()?, body);
        }
        script.posted_bodies.push(body.clone());
        let payloads = match &script.payloads {
            PayloadMode::Fail => return None,
            PayloadMode::Echo => body
                .as_array()
                .map(|ids| {
                    ids.iter()
                        .map(|id| (id.to_string(), format!("payload-{id}")))
                        .collect::<HashMap<_, _>>()
                })
                .unwrap_or_default(),
            PayloadMode::Fixed(payloads) => payloads.clone(),
        };
        Some(RemoteResponse {
            body: json!(payloads),
            headers: HashMap::new(),
        })
    }
}

fn bulk_answer(script: &Value, body: &Value) -> Option<RemoteResponse> {
    let body = match script.get("*").and_then(Value::as_str) {
        Some(status) => {
            let answers = body
                .as_array()?
                .iter()
                .filter_map(|item| item.get("identifier").and_then(Value::as_str))
                .map(|uuid| {
                    (
                        uuid.to_string(),
                        json!({ "result": { "status": status }, "ticket": null }),
                    )
                })
                .collect::<serde_json::Map<_, _>>();
            Value::Object(answers)
        }
        None => script.clone(),
    };
    Some(RemoteResponse {
        body,
        headers: HashMap::new(),
    })
}

#[derive(Default)]
pub struct MemoryTables {
    pub attendees: HashMap<String, String>,
    pub last_updated: HashMap<String, i64>,
    pub scan_log: Vec<(String, ScanLogEntry)>,
    pub checkin_mapping: HashMap<String, String>,
    pub badge_mapping: HashMap<String, String>,
    pub closed: bool,
    /// Makes `put_last_updated` fail, as a full disk would.
    pub fail_watermark_writes: bool,
    /// Makes any batch containing an entry of this type fail before
    /// anything is written.
    pub fail_scan_writes: Option<ScanType>,
}

impl MemoryTables {
    fn entry(&self, storage_key: Option<&String>) -> Option<ScanLogEntry> {
        let storage_key = storage_key?;
        self.scan_log
            .iter()
            .find(|(key, _)| key == storage_key)
            .map(|(_, entry)| entry.clone())
    }
}

pub struct MemoryStore {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(MemoryTables::default())),
        }
    }

    fn tables(&self) -> anyhow::Result<MutexGuard<'_, MemoryTables>> {
        let tables = self.tables.lock().map_err(|_| anyhow!("poisoned"))?;
        if tables.closed {
            bail!("store is closed");
        }
        Ok(tables)
    }
}

impl CheckinStore for MemoryStore {
    fn put_attendee(&mut self, identifier: &str, payload: &str) -> anyhow::Result<()> {
        self.tables()?
            .attendees
            .insert(identifier.to_string(), payload.to_string());
        Ok(())
    }

    fn attendee(&self, identifier: &str) -> anyhow::Result<Option<String>> {
        Ok(self.tables()?.attendees.get(identifier).cloned())
    }

    fn attendee_count(&self) -> anyhow::Result<u64> {
        Ok(self.tables()?.attendees.len() as u64)
    }

    fn last_updated(&self, event_id: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.tables()?.last_updated.get(event_id).copied())
    }

    fn put_last_updated(&mut self, event_id: &str, server_time: i64) -> anyhow::Result<()> {
        let mut tables = self.tables()?;
        if tables.fail_watermark_writes {
            bail!("disk full");
        }
        tables.last_updated.insert(event_id.to_string(), server_time);
        Ok(())
    }

    fn add_scans(&mut self, entries: &[ScanLogEntry]) -> anyhow::Result<Vec<String>> {
        let mut tables = self.tables()?;
        if let Some(failing) = tables.fail_scan_writes {
            if entries.iter().any(|entry| entry.scan_type == failing) {
                bail!("disk full");
            }
        }
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = new_scan_storage_key();
            tables.scan_log.push((key.clone(), entry.clone()));
            let mapping = match entry.scan_type {
                ScanType::CheckIn => &mut tables.checkin_mapping,
                ScanType::Badge => &mut tables.badge_mapping,
            };
            mapping.insert(entry.scan_id.clone(), key.clone());
            keys.push(key);
        }
        Ok(keys)
    }

    fn checkin_scan(&self, ticket_uuid: &str) -> anyhow::Result<Option<ScanLogEntry>> {
        let tables = self.tables()?;
        Ok(tables.entry(tables.checkin_mapping.get(ticket_uuid)))
    }

    fn badge_scan(&self, ticket_uuid: &str) -> anyhow::Result<Option<ScanLogEntry>> {
        let tables = self.tables()?;
        Ok(tables.entry(tables.badge_mapping.get(ticket_uuid)))
    }

    fn find_pending_by_type(&self, scan_type: ScanType) -> anyhow::Result<Vec<ScanLogEntry>> {
        let tables = self.tables()?;
        let mapping = match scan_type {
            ScanType::CheckIn => &tables.checkin_mapping,
            ScanType::Badge => &tables.badge_mapping,
        };
        Ok(tables
            .scan_log
            .iter()
            .filter(|(key, entry)| mapping.get(&entry.scan_id) == Some(key))
            .map(|(_, entry)| entry)
            .filter(|entry| entry.scan_type == scan_type && entry.is_pending())
            .take(PENDING_SCAN_PAGE_SIZE)
            .cloned()
            .collect())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        let mut tables = self.tables.lock().map_err(|_| anyhow!("poisoned"))?;
        tables.closed = true;
        Ok(())
    }
}

/// Hands out one set of tables per event identity; reopening reuses them.
#[derive(Clone, Default)]
pub struct MemoryOpener {
    stores: Arc<Mutex<HashMap<String, Arc<Mutex<MemoryTables>>>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryOpener {
    pub fn failing() -> Self {
        let opener = Self::default();
        *opener.fail.lock().expect("fail flag") = true;
        opener
    }

    pub fn tables(&self, connection: &EventConnection) -> Arc<Mutex<MemoryTables>> {
        self.stores
            .lock()
            .expect("stores lock")
            .entry(connection.store_key())
            .or_default()
            .clone()
    }
}

impl StoreOpener for MemoryOpener {
    fn open(&self, connection: &EventConnection) -> anyhow::Result<Box<dyn CheckinStore>> {
        if *self.fail.lock().map_err(|_| anyhow!("poisoned"))? {
            bail!("data directory is not writable");
        }
        let tables = self.tables(connection);
        tables.lock().map_err(|_| anyhow!("poisoned"))?.closed = false;
        Ok(Box::new(MemoryStore { tables }))
    }
}

pub fn connection(event_id: &str) -> EventConnection {
    EventConnection::new("https://alf.io", "api-key", event_id)
}

pub fn context_with(remote: FakeRemote) -> EngineContext {
    context_with_opener(remote, MemoryOpener::default(), EngineSettings::default())
}

pub fn context_with_opener(
    remote: FakeRemote,
    opener: MemoryOpener,
    settings: EngineSettings,
) -> EngineContext {
    EngineContext {
        remote: Arc::new(remote),
        opener: Arc::new(opener),
        settings,
        metrics: Arc::new(Metrics::default()),
    }
}

pub fn ready_session(event_id: &str) -> Session {
    Session::new(connection(event_id), Box::new(MemoryStore::new()))
}

/// Session over `opener`'s tables, so a test can flip their fault flags.
pub fn session_in(opener: &MemoryOpener, event_id: &str) -> Session {
    let connection = connection(event_id);
    let store = opener.open(&connection).expect("open memory store");
    Session::new(connection, store)
}
