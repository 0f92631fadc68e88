use anyhow::{anyhow, Result};

use checkin_domain::EventConnection;

pub fn validate_base_url(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(anyhow!("base_url must start with http:// or https://"));
    }
    Ok(())
}

pub fn validate_event(connection: &EventConnection) -> Result<()> {
    connection.validate()?;
    validate_base_url(&connection.base_url)
}
