// Engine settings entity

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when a cached payload exists but cannot be decrypted or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecryptFailurePolicy {
    /// Log the failure and still record the check-in.
    #[default]
    Record,
    /// Refuse the check-in with `INVALID_TICKET_CODE`.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub request_timeout: Option<Duration>,
    pub decrypt_failure_policy: DecryptFailurePolicy,
}
