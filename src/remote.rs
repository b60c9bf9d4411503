//! Client for the remote focus endpoint.
//!
//! The endpoint is polled with a GET request and must answer
//! `{ "success": true, "focus": 0 | 1, ... }`. Anything else, status or
//! payload, is an error; the acquisition layer degrades those to a random
//! label rather than surfacing them.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::signal::FocusLabel;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct RemoteFocusResponse {
    pub success: bool,
    pub focus: i64,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl RemoteFocusResponse {
    /// Accept the payload only when it reports success and a focus value
    /// of exactly 0 or 1.
    pub fn label(&self) -> Result<FocusLabel> {
        if !self.success {
            bail!("focus endpoint reported failure");
        }
        FocusLabel::from_bit(self.focus)
            .ok_or_else(|| anyhow!("focus value {} is not 0 or 1", self.focus))
    }
}

pub struct RemoteLabelClient {
    client: reqwest::Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

impl RemoteLabelClient {
    pub fn new(endpoint: impl Into<String>, headers: Option<HashMap<String, String>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build focus endpoint HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: headers.unwrap_or_default(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_label(&self) -> Result<FocusLabel> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("focus request to {} failed", self.endpoint))?;

        if !response.status().is_success() {
            bail!("focus endpoint returned status {}", response.status());
        }

        let body: RemoteFocusResponse = response
            .json()
            .await
            .context("malformed focus payload")?;

        body.label()
    }
}
