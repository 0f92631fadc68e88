use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use checkin_domain::ports::{RemoteClient, RemoteResponse};

/// [`RemoteClient`] over reqwest. Any transport error, non-2xx status or
/// non-JSON body is logged and reported as `None`.
#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
}

impl HttpRemoteClient {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("ApiKey {api_key}"));
        match timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Option<RemoteResponse> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, "remote call failed: {}", err);
                return None;
            }
        };
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "remote call rejected");
            return None;
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        match response.json::<Value>().await {
            Ok(body) => {
                debug!(%url, %status, "remote call succeeded");
                Some(RemoteResponse { body, headers })
            }
            Err(err) => {
                warn!(%url, "remote response is not JSON: {}", err);
                None
            }
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn get(
        &self,
        url: &str,
        api_key: &str,
        timeout: Option<Duration>,
    ) -> Option<RemoteResponse> {
        let request = self.request(Method::GET, url, api_key, timeout);
        self.send(request, url).await
    }

    async fn post(
        &self,
        url: &str,
        api_key: &str,
        timeout: Option<Duration>,
        body: &Value,
    ) -> Option<RemoteResponse> {
        let request = self.request(Method::POST, url, api_key, timeout).json(body);
        self.send(request, url).await
    }
}
