use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{ExecutionBackend, RemoteResponse, Submission};
use crate::config::Config;

const DEFAULT_PISTON_BASE: &str = "https://emkc.org/api/v2/piston";

/// Piston-compatible execution service (`POST {base}/execute`).
pub struct PistonClient {
    client: Client,
    base: String,
}

impl PistonClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base = cfg
            .get_nonempty("EXECUTION_API_URL")
            .unwrap_or_else(|| DEFAULT_PISTON_BASE.to_string());

        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()?;

        Ok(Self { client, base })
    }

    fn execute_url(&self) -> String {
        format!("{}/execute", self.base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ExecutionBackend for PistonClient {
    async fn submit(&self, submission: &Submission) -> Result<RemoteResponse> {
        let resp = self
            .client
            .post(self.execute_url())
            .json(submission)
            .send()
            .await
            .context("failed to reach execution service")?;

        let status = resp.status();
        let text = resp.text().await.context("failed to read execution response")?;

        let parsed = serde_json::from_str::<RemoteResponse>(&text);
        if status.is_success() {
            return parsed.context("malformed execution response");
        }
        // Some deployments answer 4xx with a regular run/compile body.
        match parsed {
            Ok(body) if body.run.is_some() || body.compile.is_some() => Ok(body),
            _ => bail!("execution service returned {}: {}", status, text.trim()),
        }
    }
}
