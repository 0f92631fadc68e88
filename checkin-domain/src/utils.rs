use chrono::Utc;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `value`.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}
