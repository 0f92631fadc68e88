use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decoded JSON body plus the response headers (names lowercased).
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse<T = Value> {
    pub body: T,
    pub headers: HashMap<String, String>,
}

impl<T> RemoteResponse<T> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl RemoteResponse<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> serde_json::Result<RemoteResponse<T>> {
        Ok(RemoteResponse {
            body: serde_json::from_value(self.body)?,
            headers: self.headers,
        })
    }
}

/// Authenticated access to the event-management API.
///
/// Transport failures are reported as `None`: callers treat a missing
/// response as "skip this step and retry on the next cycle".
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Option<RemoteResponse>;

    async fn post(
        &self,
        url: &str,
        api_key: &str,
        timeout: Option<Duration>,
        body: &Value,
    ) -> Option<RemoteResponse>;
}
