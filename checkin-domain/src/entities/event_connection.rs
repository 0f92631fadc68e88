// Event connection entity
// Identifies the remote event and the credentials used to reach it.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::utils::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConnection {
    pub base_url: String,
    pub api_key: String,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub check_in_force_payment_on_site: bool,
}

/// Shape of the configuration QR code shown by the event admin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QrCodePayload {
    url: String,
    api_key: String,
    event: String,
    #[serde(default)]
    ssid: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    check_in_force_payment_on_site: bool,
}

impl EventConnection {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        event_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            event_id: event_id.into(),
            ssid: None,
            password: None,
            check_in_force_payment_on_site: false,
        }
    }

    pub fn from_qr_json(raw: &str) -> Result<Self> {
        let payload: QrCodePayload = serde_json::from_str(raw)?;
        let connection = Self {
            base_url: payload.url,
            api_key: payload.api_key,
            event_id: payload.event,
            ssid: payload.ssid,
            password: payload.password,
            check_in_force_payment_on_site: payload.check_in_force_payment_on_site,
        };
        connection.validate()?;
        Ok(connection)
    }

    /// Identity of the local store: sha256(base_url + api_key + event_id).
    pub fn store_key(&self) -> String {
        sha256_hex(&format!("{}{}{}", self.base_url, self.api_key, self.event_id))
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("event base_url must not be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("event api_key must not be empty"));
        }
        if self.event_id.trim().is_empty() {
            return Err(anyhow!("event_id must not be empty"));
        }
        Ok(())
    }

    pub fn identifiers_url(&self, changed_since: Option<i64>) -> String {
        let base = format!(
            "{}/admin/api/check-in/{}/offline-identifiers",
            self.trimmed_base_url(),
            self.event_id
        );
        match changed_since {
            Some(since) => format!("{base}?changedSince={since}"),
            None => base,
        }
    }

    pub fn offline_payloads_url(&self) -> String {
        format!(
            "{}/admin/api/check-in/{}/offline",
            self.trimmed_base_url(),
            self.event_id
        )
    }

    /// Bulk upload of locally recorded scans.
    pub fn bulk_check_in_url(&self) -> String {
        let url = format!(
            "{}/admin/api/check-in/event/{}/bulk",
            self.trimmed_base_url(),
            self.event_id
        );
        if self.check_in_force_payment_on_site {
            format!("{url}?forceCheckInPaymentOnSite=true")
        } else {
            url
        }
    }

    fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_key_isolates_credentials_and_events() {
        let a = EventConnection::new("https://alf.io", "key", "devoxx");
        let b = EventConnection::new("https://alf.io", "key", "jug");
        let c = EventConnection::new("https://alf.io", "other", "devoxx");
        assert_eq!(a.store_key(), sha256_hex("https://alf.iokeydevoxx"));
        assert_ne!(a.store_key(), b.store_key());
        assert_ne!(a.store_key(), c.store_key());
    }

    #[test]
    fn urls_follow_remote_api_layout() {
        let connection = EventConnection::new("https://alf.io/", "key", "devoxx");
        assert_eq!(
            connection.identifiers_url(None),
            "https://alf.io/admin/api/check-in/devoxx/offline-identifiers"
        );
        assert_eq!(
            connection.identifiers_url(Some(1000)),
            "https://alf.io/admin/api/check-in/devoxx/offline-identifiers?changedSince=1000"
        );
        assert_eq!(
            connection.offline_payloads_url(),
            "https://alf.io/admin/api/check-in/devoxx/offline"
        );
    }

    #[test]
    fn bulk_url_carries_force_payment_flag() {
        let mut connection = EventConnection::new("https://alf.io/", "key", "devoxx");
        assert_eq!(
            connection.bulk_check_in_url(),
            "https://alf.io/admin/api/check-in/event/devoxx/bulk"
        );
        connection.check_in_force_payment_on_site = true;
        assert_eq!(
            connection.bulk_check_in_url(),
            "https://alf.io/admin/api/check-in/event/devoxx/bulk?forceCheckInPaymentOnSite=true"
        );
    }

    #[test]
    fn from_qr_json_reads_camel_case_fields() {
        let connection = EventConnection::from_qr_json(
            r#"{"url":"https://alf.io","apiKey":"k","event":"devoxx","ssid":"wifi","checkInForcePaymentOnSite":true}"#,
        )
        .expect("qr payload");
        assert_eq!(connection.base_url, "https://alf.io");
        assert_eq!(connection.api_key, "k");
        assert_eq!(connection.event_id, "devoxx");
        assert_eq!(connection.ssid.as_deref(), Some("wifi"));
        assert!(connection.password.is_none());
        assert!(connection.check_in_force_payment_on_site);
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let connection = EventConnection::new("https://alf.io", " ", "devoxx");
        let err = connection.validate().expect_err("blank api key");
        assert!(err.to_string().contains("api_key"));
        assert!(EventConnection::from_qr_json(r#"{"url":"","apiKey":"k","event":"e"}"#).is_err());
    }
}
