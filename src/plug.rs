// --------------------------------------------------
// Client for the smart plug that powers the TV.
//
// The plug exposes a single switch endpoint:
//   GET <url>?id=0&on=true|false  ->  JSON reply
// -------------------------------------------------

use std::time::Duration;

use serde_json::Value;

use crate::error::PlugError;

#[derive(Debug, Clone)]
pub struct PlugClient {
    http: reqwest::Client,
    url: String,
}

impl PlugClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PlugError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PlugError::Request)?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Switches the plug and returns its JSON reply.
    pub async fn set_power(&self, on: bool) -> Result<Value, PlugError> {
        let on_param = if on { "true" } else { "false" };
        let response = self
            .http
            .get(&self.url)
            .query(&[("id", "0"), ("on", on_param)])
            .send()
            .await
            .map_err(PlugError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlugError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(PlugError::Decode)
    }
}
