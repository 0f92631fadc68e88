// Scan type value object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanType {
    CheckIn,
    Badge,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::CheckIn => "CHECK_IN",
            ScanType::Badge => "BADGE",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHECK_IN" => Ok(ScanType::CheckIn),
            "BADGE" => Ok(ScanType::Badge),
            other => Err(format!("unknown scan type '{other}'")),
        }
    }
}
