// Ticket entity
// Plaintext carried inside an attendee payload, only ever held in memory.

use serde::{Deserialize, Serialize};

use crate::value_objects::ScanStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketData {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub check_in_status: Option<String>,
}

impl TicketData {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Result of a single check-in request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInOutcome {
    pub status: ScanStatus,
    pub ticket: Option<TicketData>,
}

impl CheckInOutcome {
    pub fn checked_in(ticket: Option<TicketData>) -> Self {
        Self {
            status: ScanStatus::Success,
            ticket,
        }
    }

    pub fn rejected(status: ScanStatus) -> Self {
        Self {
            status,
            ticket: None,
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }
}
