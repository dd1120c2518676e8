//! Cloudflare DNS adapter for the `NamePublisher` port.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::application::ports::NamePublisher;
use crate::domain::PublishedName;
use crate::domain::config::DnsConfig;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

/// Creates A records in one Cloudflare zone.
pub struct CloudflareDns {
    client: Client,
    base_url: String,
    zone_id: String,
    api_token: String,
}

impl CloudflareDns {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &DnsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            zone_id: config.zone_id.clone(),
            api_token: config.api_token.clone(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }
}

fn record_body(record: &PublishedName) -> serde_json::Value {
    json!({
        "type": "A",
        "name": record.name,
        "content": record.address,
        "ttl": record.ttl,
        "proxied": record.proxied,
    })
}

/// Turn a Cloudflare envelope into `Ok(())` or a readable error.
fn check_response(status: reqwest::StatusCode, body: &str) -> Result<()> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();
    match parsed {
        Some(resp) if resp.success && status.is_success() => Ok(()),
        Some(resp) => {
            let detail = resp
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            anyhow::bail!("Cloudflare rejected the record (HTTP {status}): {detail}")
        }
        None => anyhow::bail!("Cloudflare returned HTTP {status}: {}", body.trim()),
    }
}

impl NamePublisher for CloudflareDns {
    async fn create_record(&self, record: &PublishedName) -> Result<()> {
        tracing::info!(name = %record.name, address = %record.address, "creating DNS record");
        let response = self
            .client
            .post(self.records_url())
            .bearer_auth(&self.api_token)
            .json(&record_body(record))
            .send()
            .await
            .context("Cloudflare API request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("cannot read Cloudflare response")?;
        check_response(status, &body)
    }
}
