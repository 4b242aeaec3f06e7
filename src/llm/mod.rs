//! Text-generation pipeline seam and a reqwest-based inference client.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::Config;

pub mod pipeline;

pub use pipeline::{FailurePolicy, ModelPipelineManager, PipelineStatus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Generation {
    pub generated_text: String,
    #[serde(default)]
    pub score: f64,
}

/// What to construct: a task kind and a model identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub task: String,
    pub model: String,
}

impl PipelineSpec {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            task: cfg.get_nonempty("MODEL_TASK").unwrap_or_else(|| "text-generation".into()),
            model: cfg
                .get_nonempty("MODEL_ID")
                .unwrap_or_else(|| "Xenova/codellama-7b-instruct-hf".into()),
        }
    }
}

/// A ready pipeline. Only the first returned generation is used by callers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<Vec<Generation>>;
}

impl std::fmt::Debug for dyn TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TextGenerator")
    }
}

/// Expensive one-time construction of a `TextGenerator`.
#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn TextGenerator>>;
}

#[derive(Debug, Clone)]
pub struct HttpPipelineLoader {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPipelineLoader {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = cfg
            .get_nonempty("MODEL_API_URL")
            .unwrap_or_else(|| "https://api-inference.huggingface.co".into())
            .trim_end_matches('/')
            .to_string();
        let api_key = cfg.get_nonempty("MODEL_API_KEY");

        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()?;

        Ok(Self { http, base_url, api_key })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let hv = HeaderValue::from_str(&format!("Bearer {}", key))?;
            headers.insert(AUTHORIZATION, hv);
        }
        Ok(headers)
    }
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
}

#[async_trait]
impl PipelineLoader for HttpPipelineLoader {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn TextGenerator>> {
        let headers = self.headers()?;
        let info_url = format!("{}/api/models/{}", self.base_url, spec.model);

        let resp = self
            .http
            .get(&info_url)
            .headers(headers.clone())
            .send()
            .await
            .context("failed to reach model service")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("model {} unavailable: {} - {}", spec.model, status, text.trim());
        }
        let info: ModelInfo = resp.json().await.context("malformed model metadata")?;
        if let Some(tag) = info.pipeline_tag.as_deref() {
            if tag != spec.task {
                bail!("model {} serves {}, not {}", spec.model, tag, spec.task);
            }
        }

        Ok(Arc::new(HttpTextGenerator {
            http: self.http.clone(),
            url: format!("{}/models/{}", self.base_url, spec.model),
            headers,
        }))
    }
}

pub struct HttpTextGenerator {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationsBody {
    Many(Vec<Generation>),
    One(Generation),
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, opts: &GenerateOptions) -> Result<Vec<Generation>> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": opts.max_new_tokens,
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "return_full_text": true
            },
            "options": { "wait_for_model": true }
        });

        let resp = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .context("failed to send generation request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("generation error: {} - {}", status, text.trim());
        }

        match resp.json::<GenerationsBody>().await.context("malformed generation response")? {
            GenerationsBody::Many(items) => Ok(items),
            GenerationsBody::One(item) => Ok(vec![item]),
        }
    }
}
