use crate::entities::{EventConnection, ScanLogEntry};
use crate::value_objects::ScanType;

/// Per-event local persistence.
///
/// Holds the attendee cache, the sync watermark, the scan log and the two
/// index tables mapping a ticket uuid to its latest check-in / badge entry.
/// `get`-style lookups return `None` on a miss; `put`-style writes overwrite.
/// After `close` every other operation fails.
pub trait CheckinStore: Send {
    fn put_attendee(&mut self, identifier: &str, payload: &str) -> anyhow::Result<()>;
    fn attendee(&self, identifier: &str) -> anyhow::Result<Option<String>>;
    fn attendee_count(&self) -> anyhow::Result<u64>;

    fn last_updated(&self, event_id: &str) -> anyhow::Result<Option<i64>>;
    fn put_last_updated(&mut self, event_id: &str, server_time: i64) -> anyhow::Result<()>;

    /// Appends `entry` and points the index table for its type at it.
    /// Returns the generated storage key.
    fn add_scan(&mut self, entry: &ScanLogEntry) -> anyhow::Result<String> {
        let mut keys = self.add_scans(std::slice::from_ref(entry))?;
        keys.pop()
            .ok_or_else(|| anyhow::anyhow!("store returned no key for appended scan"))
    }
    /// Appends all `entries` and their index rows atomically: either every
    /// entry is written or none is. Keys are returned in input order.
    fn add_scans(&mut self, entries: &[ScanLogEntry]) -> anyhow::Result<Vec<String>>;
    fn checkin_scan(&self, ticket_uuid: &str) -> anyhow::Result<Option<ScanLogEntry>>;
    fn badge_scan(&self, ticket_uuid: &str) -> anyhow::Result<Option<ScanLogEntry>>;
    /// Entries still awaiting the server, considering only the latest entry
    /// per ticket (the one the index table points at). Oldest first, at most
    /// [`crate::PENDING_SCAN_PAGE_SIZE`] entries.
    fn find_pending_by_type(&self, scan_type: ScanType) -> anyhow::Result<Vec<ScanLogEntry>>;

    /// Flushes and releases the store. Idempotent.
    fn close(&mut self) -> anyhow::Result<()>;
}

pub trait StoreOpener: Send + Sync {
    fn open(&self, connection: &EventConnection) -> anyhow::Result<Box<dyn CheckinStore>>;
}
