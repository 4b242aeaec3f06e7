use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{DiagnosticRequest, DiagnosticResponse, DiagnosticsBackend};
use crate::config::Config;

const DEFAULT_ANALYSIS_URL: &str = "https://emkc.org/api/v2/piston/analyze";

pub struct DiagnosticsClient {
    client: Client,
    url: String,
}

impl DiagnosticsClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let url = cfg
            .get_nonempty("ANALYSIS_API_URL")
            .unwrap_or_else(|| DEFAULT_ANALYSIS_URL.to_string());

        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl DiagnosticsBackend for DiagnosticsClient {
    async fn diagnose(&self, request: &DiagnosticRequest) -> Result<DiagnosticResponse> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .context("failed to reach analysis service")?;

        let status = resp.status();
        let text = resp.text().await.context("failed to read analysis response")?;
        parse_response(status, &text)
    }
}

/// Any 2xx body must be a well-formed diagnostics response.
fn parse_response(status: StatusCode, text: &str) -> Result<DiagnosticResponse> {
    if !status.is_success() {
        bail!("analysis failed: {} - {}", status, text.trim());
    }
    serde_json::from_str(text).context("malformed analysis response")
}
