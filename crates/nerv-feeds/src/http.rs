use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::{FeedError, Result};

/// The outbound HTTP surface the feed clients need. Kept as a trait so the
/// clients can be exercised without a network.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Value>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nerv-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FeedError::Request {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let request_err = |source| FeedError::Request {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(request_err)?;
        Ok(bytes.to_vec())
    }

    fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Value> {
        let request_err = |source| FeedError::Request {
            url: url.to_string(),
            source,
        };
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        let response = request.send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let text = response.text().map_err(request_err)?;
        serde_json::from_str(&text).map_err(|source| FeedError::Json {
            url: url.to_string(),
            source,
        })
    }
}
