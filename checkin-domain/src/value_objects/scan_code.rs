// Scanned ticket code value object
// A QR code on a ticket reads "<uuid>/<hmac>".

use thiserror::Error;

use crate::utils::sha256_hex;
use crate::value_objects::ScanStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanCodeError {
    #[error("scan code is empty")]
    Empty,
    #[error("scan code has no '/' separator between ticket uuid and hmac")]
    MissingSeparator,
    #[error("scan code has an empty ticket uuid or hmac")]
    EmptyPart,
}

impl ScanCodeError {
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanCodeError::Empty => ScanStatus::EmptyTicketCode,
            ScanCodeError::MissingSeparator | ScanCodeError::EmptyPart => {
                ScanStatus::InvalidTicketCode
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCode {
    pub uuid: String,
    pub hmac: String,
}

impl ScanCode {
    /// Splits at the first '/'; everything after it belongs to the hmac.
    pub fn parse(raw: &str) -> Result<Self, ScanCodeError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScanCodeError::Empty);
        }
        let (uuid, hmac) = raw
            .split_once('/')
            .ok_or(ScanCodeError::MissingSeparator)?;
        if uuid.is_empty() || hmac.is_empty() {
            return Err(ScanCodeError::EmptyPart);
        }
        Ok(Self {
            uuid: uuid.to_string(),
            hmac: hmac.to_string(),
        })
    }

    /// Secret the ticket payload key is derived from.
    pub fn secret(&self) -> String {
        format!("{}/{}", self.uuid, self.hmac)
    }

    /// Key of the attendee cache entry holding this ticket's payload.
    pub fn attendee_key(&self) -> String {
        sha256_hex(&self.hmac)
    }
}
