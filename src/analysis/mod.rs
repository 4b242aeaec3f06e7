//! Code analysis, completion and suggestions.
//!
//! Analysis and suggestions are advisory: any failure yields an empty result and a
//! `warn!` record. Completion is user-initiated, so its failures propagate.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::EngineError,
    llm::{GenerateOptions, ModelPipelineManager},
};

pub mod diagnostics;

pub const COMPLETION_OPTIONS: GenerateOptions =
    GenerateOptions { max_new_tokens: 128, temperature: 0.7, top_p: 0.95 };

pub const SUGGESTION_OPTIONS: GenerateOptions =
    GenerateOptions { max_new_tokens: 256, temperature: 0.7, top_p: 0.95 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[serde(other)]
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeIssue {
    pub line: u32,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSuggestion {
    pub line: u32,
    pub suggestion: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub errors: Vec<CodeIssue>,
    pub suggestions: Vec<LineSuggestion>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.suggestions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub completion_text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRequest {
    pub language: String,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticResponse {
    pub diagnostics: Vec<RawDiagnostic>,
    pub suggestions: Vec<RawSuggestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDiagnostic {
    pub line: u32,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSuggestion {
    pub line: u32,
    pub text: String,
    pub confidence: f64,
}

impl From<DiagnosticResponse> for AnalysisResult {
    fn from(resp: DiagnosticResponse) -> Self {
        Self {
            errors: resp
                .diagnostics
                .into_iter()
                .map(|d| CodeIssue {
                    line: d.line,
                    message: d.message,
                    severity: d.severity,
                    suggestions: d.suggestions,
                })
                .collect(),
            suggestions: resp
                .suggestions
                .into_iter()
                .map(|s| LineSuggestion {
                    line: s.line,
                    suggestion: s.text,
                    confidence: clamp_confidence(s.confidence),
                })
                .collect(),
        }
    }
}

/// Remote static-analysis provider, independent of the model pipeline.
#[async_trait]
pub trait DiagnosticsBackend: Send + Sync {
    async fn diagnose(&self, request: &DiagnosticRequest) -> Result<DiagnosticResponse>;
}

pub fn completion_prompt(language_id: &str, source: &str) -> String {
    format!("Complete the following {language_id} code:\n\n{source}\n\nCompletion:")
}

pub fn suggestion_prompt(language_id: &str, source: &str) -> String {
    format!(
        "Suggest improvements for the following {language_id} code:\n\n{source}\n\nSuggestions:"
    )
}

/// Drop the echoed prompt from raw model output.
pub fn strip_prompt(raw: &str, prompt: &str) -> String {
    raw.strip_prefix(prompt).unwrap_or(raw).trim().to_string()
}

pub fn clamp_confidence(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Clone)]
pub struct AnalysisService {
    diagnostics: Arc<dyn DiagnosticsBackend>,
    pipeline: Arc<ModelPipelineManager>,
}

impl AnalysisService {
    pub fn new(
        diagnostics: Arc<dyn DiagnosticsBackend>,
        pipeline: Arc<ModelPipelineManager>,
    ) -> Self {
        Self { diagnostics, pipeline }
    }

    pub fn from_config(cfg: &Config, pipeline: Arc<ModelPipelineManager>) -> Result<Self> {
        let client = diagnostics::DiagnosticsClient::from_config(cfg)?;
        Ok(Self::new(Arc::new(client), pipeline))
    }

    pub async fn analyze(&self, source: &str, language_id: &str) -> AnalysisResult {
        let request = DiagnosticRequest {
            language: language_id.to_string(),
            source: source.to_string(),
        };
        match self.diagnostics.diagnose(&request).await {
            Ok(resp) => {
                let result = AnalysisResult::from(resp);
                debug!(
                    language = language_id,
                    errors = result.errors.len(),
                    suggestions = result.suggestions.len(),
                    "analysis finished"
                );
                result
            }
            Err(e) => {
                warn!(
                    language = language_id,
                    error = %format!("{e:#}"),
                    "analysis failed; returning empty result"
                );
                AnalysisResult::default()
            }
        }
    }

    pub async fn complete(
        &self,
        source: &str,
        language_id: &str,
    ) -> Result<CompletionResult, EngineError> {
        let prompt = completion_prompt(language_id, source);
        let generation = self.pipeline.generate(&prompt, &COMPLETION_OPTIONS).await?;
        Ok(CompletionResult {
            completion_text: strip_prompt(&generation.generated_text, &prompt),
            confidence: clamp_confidence(generation.score),
        })
    }

    pub async fn suggest(&self, source: &str, language_id: &str) -> Vec<String> {
        let prompt = suggestion_prompt(language_id, source);
        match self.pipeline.generate(&prompt, &SUGGESTION_OPTIONS).await {
            Ok(generation) => strip_prompt(&generation.generated_text, &prompt)
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                warn!(language = language_id, error = %e, "suggestions unavailable");
                Vec::new()
            }
        }
    }
}
