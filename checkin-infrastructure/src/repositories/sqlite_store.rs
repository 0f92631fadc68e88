use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use checkin_domain::ports::{CheckinStore, StoreOpener};
use checkin_domain::{
    new_scan_storage_key, EventConnection, ScanLogEntry, ScanStatus, ScanType,
    PENDING_SCAN_PAGE_SIZE,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS attendee (
    identifier TEXT PRIMARY KEY,
    payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS last_updated (
    event_id TEXT PRIMARY KEY,
    server_time INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scan_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    storage_key TEXT NOT NULL UNIQUE,
    scan_id TEXT NOT NULL,
    scan_type TEXT NOT NULL,
    local_status TEXT NOT NULL,
    remote_status TEXT NOT NULL,
    ticket_code TEXT
);

CREATE TABLE IF NOT EXISTS checkin_mapping (
    ticket_uuid TEXT PRIMARY KEY,
    storage_key TEXT NOT NULL REFERENCES scan_log(storage_key)
);

CREATE TABLE IF NOT EXISTS badgescan_mapping (
    ticket_uuid TEXT PRIMARY KEY,
    storage_key TEXT NOT NULL REFERENCES scan_log(storage_key)
);

CREATE INDEX IF NOT EXISTS idx_scan_log_pending ON scan_log(scan_type, remote_status, seq);
"#;

const ENTRY_COLUMNS: &str =
    "l.scan_id, l.scan_type, l.local_status, l.remote_status, l.ticket_code";

/// [`CheckinStore`] backed by one SQLite file per event identity.
pub struct SqliteStore {
    conn: Option<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "sqlite store ready");
        Ok(Self {
            conn: Some(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| anyhow!("store {} is closed", self.path.display()))
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        let path = self.path.display().to_string();
        self.conn
            .as_mut()
            .ok_or_else(|| anyhow!("store {} is closed", path))
    }

    fn mapped_scan(&self, mapping_table: &str, ticket_uuid: &str) -> Result<Option<ScanLogEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {mapping_table} m
             JOIN scan_log l ON l.storage_key = m.storage_key
             WHERE m.ticket_uuid = ?1"
        );
        let raw = self
            .conn()?
            .query_row(&sql, params![ticket_uuid], raw_entry)
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }
}

fn mapping_table(scan_type: ScanType) -> &'static str {
    match scan_type {
        ScanType::CheckIn => "checkin_mapping",
        ScanType::Badge => "badgescan_mapping",
    }
}

struct RawEntry {
    scan_id: String,
    scan_type: String,
    local_status: String,
    remote_status: String,
    code: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> Result<ScanLogEntry> {
        Ok(ScanLogEntry {
            scan_id: self.scan_id,
            scan_type: self.scan_type.parse().map_err(|err: String| anyhow!(err))?,
            local_status: parse_status(&self.local_status)?,
            remote_status: parse_status(&self.remote_status)?,
            code: self.code,
        })
    }
}

fn raw_entry(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        scan_id: row.get(0)?,
        scan_type: row.get(1)?,
        local_status: row.get(2)?,
        remote_status: row.get(3)?,
        code: row.get(4)?,
    })
}

fn parse_status(value: &str) -> Result<ScanStatus> {
    value.parse().map_err(|err: String| anyhow!(err))
}

impl CheckinStore for SqliteStore {
    fn put_attendee(&mut self, identifier: &str, payload: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO attendee (identifier, payload) VALUES (?1, ?2)
             ON CONFLICT(identifier) DO UPDATE SET payload = excluded.payload",
            params![identifier, payload],
        )?;
        Ok(())
    }

    fn attendee(&self, identifier: &str) -> Result<Option<String>> {
        let payload = self
            .conn()?
            .query_row(
                "SELECT payload FROM attendee WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn attendee_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM attendee", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn last_updated(&self, event_id: &str) -> Result<Option<i64>> {
        let value = self
            .conn()?
            .query_row(
                "SELECT server_time FROM last_updated WHERE event_id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_last_updated(&mut self, event_id: &str, server_time: i64) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO last_updated (event_id, server_time) VALUES (?1, ?2)
             ON CONFLICT(event_id) DO UPDATE SET server_time = excluded.server_time",
            params![event_id, server_time],
        )?;
        Ok(())
    }

    fn add_scans(&mut self, entries: &[ScanLogEntry]) -> Result<Vec<String>> {
        let tx = self.conn_mut()?.transaction()?;
        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = new_scan_storage_key();
            tx.execute(
                "INSERT INTO scan_log
                 (storage_key, scan_id, scan_type, local_status, remote_status, ticket_code)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    entry.scan_id,
                    entry.scan_type.as_str(),
                    entry.local_status.as_str(),
                    entry.remote_status.as_str(),
                    entry.code,
                ],
            )?;
            let sql = format!(
                "INSERT INTO {} (ticket_uuid, storage_key) VALUES (?1, ?2)
                 ON CONFLICT(ticket_uuid) DO UPDATE SET storage_key = excluded.storage_key",
                mapping_table(entry.scan_type)
            );
            tx.execute(&sql, params![entry.scan_id, key])?;
            keys.push(key);
        }
        // Dropping an uncommitted transaction rolls every insert back.
        tx.commit()?;
        Ok(keys)
    }

    fn checkin_scan(&self, ticket_uuid: &str) -> Result<Option<ScanLogEntry>> {
        self.mapped_scan(mapping_table(ScanType::CheckIn), ticket_uuid)
    }

    fn badge_scan(&self, ticket_uuid: &str) -> Result<Option<ScanLogEntry>> {
        self.mapped_scan(mapping_table(ScanType::Badge), ticket_uuid)
    }

    fn find_pending_by_type(&self, scan_type: ScanType) -> Result<Vec<ScanLogEntry>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM {} m
             JOIN scan_log l ON l.storage_key = m.storage_key
             WHERE l.scan_type = ?1 AND l.remote_status = ?2
             ORDER BY l.seq ASC LIMIT ?3",
            mapping_table(scan_type)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                scan_type.as_str(),
                ScanStatus::Retry.as_str(),
                PENDING_SCAN_PAGE_SIZE as i64
            ],
            raw_entry,
        )?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        conn.close()
            .map_err(|(_, err)| anyhow!("failed to close {}: {}", self.path.display(), err))?;
        info!(path = %self.path.display(), "sqlite store closed");
        Ok(())
    }
}

/// Opens `<data_dir>/<store key>.sqlite3`, one file per event identity.
pub struct SqliteStoreOpener {
    data_dir: PathBuf,
}

impl SqliteStoreOpener {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn store_path(&self, connection: &EventConnection) -> PathBuf {
        self.data_dir
            .join(format!("{}.sqlite3", connection.store_key()))
    }
}

impl StoreOpener for SqliteStoreOpener {
    fn open(&self, connection: &EventConnection) -> Result<Box<dyn CheckinStore>> {
        let path = self.store_path(connection);
        info!(event_id = %connection.event_id, path = %path.display(), "opening sqlite store");
        Ok(Box::new(SqliteStore::open(&path)?))
    }
}
