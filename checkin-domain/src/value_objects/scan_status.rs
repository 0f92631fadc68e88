// Scan status value object
// Every status carries a (successful, warning) facet pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Retry,
    EventNotFound,
    TicketNotFound,
    EmptyTicketCode,
    InvalidTicketCode,
    InvalidTicketState,
    AlreadyCheckIn,
    MustPay,
    OkReadyToBeCheckedIn,
    Success,
    BadgeScanAlreadyDone,
    BadgeScanSuccess,
    InvalidTicketCategoryCheckInDate,
}

impl ScanStatus {
    pub const ALL: [ScanStatus; 13] = [
        ScanStatus::Retry,
        ScanStatus::EventNotFound,
        ScanStatus::TicketNotFound,
        ScanStatus::EmptyTicketCode,
        ScanStatus::InvalidTicketCode,
        ScanStatus::InvalidTicketState,
        ScanStatus::AlreadyCheckIn,
        ScanStatus::MustPay,
        ScanStatus::OkReadyToBeCheckedIn,
        ScanStatus::Success,
        ScanStatus::BadgeScanAlreadyDone,
        ScanStatus::BadgeScanSuccess,
        ScanStatus::InvalidTicketCategoryCheckInDate,
    ];

    /// `(successful, warning)`
    pub fn facets(&self) -> (bool, bool) {
        match self {
            ScanStatus::OkReadyToBeCheckedIn
            | ScanStatus::Success
            | ScanStatus::BadgeScanSuccess => (true, false),
            ScanStatus::BadgeScanAlreadyDone => (false, true),
            _ => (false, false),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.facets().0
    }

    pub fn is_warning(&self) -> bool {
        self.facets().1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Retry => "RETRY",
            ScanStatus::EventNotFound => "EVENT_NOT_FOUND",
            ScanStatus::TicketNotFound => "TICKET_NOT_FOUND",
            ScanStatus::EmptyTicketCode => "EMPTY_TICKET_CODE",
            ScanStatus::InvalidTicketCode => "INVALID_TICKET_CODE",
            ScanStatus::InvalidTicketState => "INVALID_TICKET_STATE",
            ScanStatus::AlreadyCheckIn => "ALREADY_CHECK_IN",
            ScanStatus::MustPay => "MUST_PAY",
            ScanStatus::OkReadyToBeCheckedIn => "OK_READY_TO_BE_CHECKED_IN",
            ScanStatus::Success => "SUCCESS",
            ScanStatus::BadgeScanAlreadyDone => "BADGE_SCAN_ALREADY_DONE",
            ScanStatus::BadgeScanSuccess => "BADGE_SCAN_SUCCESS",
            ScanStatus::InvalidTicketCategoryCheckInDate => "INVALID_TICKET_CATEGORY_CHECK_IN_DATE",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScanStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown scan status '{s}'"))
    }
}
