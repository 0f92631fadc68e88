// Scan log entity
// Append-only record of a check-in or badge scan attempt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::current_millis;
use crate::value_objects::{ScanStatus, ScanType};

/// Maximum number of pending entries returned by one `find_pending_by_type` call.
pub const PENDING_SCAN_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    /// External id of the scanned ticket (its uuid).
    pub scan_id: String,
    pub scan_type: ScanType,
    pub local_status: ScanStatus,
    pub remote_status: ScanStatus,
    /// Full `uuid/hmac` code, sent back to the server on upload.
    /// Badge scans are uploaded without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ScanLogEntry {
    /// Resolved locally, still waiting for the server.
    pub fn pending(scan_id: impl Into<String>, scan_type: ScanType) -> Self {
        Self {
            scan_id: scan_id.into(),
            scan_type,
            local_status: ScanStatus::Success,
            remote_status: ScanStatus::Retry,
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Copy carrying the server's verdict. The original entry stays as is.
    pub fn with_remote_status(&self, remote_status: ScanStatus) -> Self {
        Self {
            remote_status,
            ..self.clone()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.remote_status == ScanStatus::Retry
    }
}

/// Storage key for a new log entry: creation millis followed by a random uuid.
pub fn new_scan_storage_key() -> String {
    format!("{}{}", current_millis(), Uuid::new_v4())
}
