//! Execution engine: submission/response protocol, normalization and the dispatcher.

use std::{sync::Arc, time::Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::EngineError,
    language::{self, Target},
};

pub mod piston;

const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Outcome of one dispatch. `success` implies `output`; failure implies `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<f64>,
}

impl ExecutionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()), ..Default::default() }
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or(UNKNOWN_ERROR)
    }
}

impl From<EngineError> for ExecutionResult {
    fn from(e: EngineError) -> Self {
        Self::failure(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Request body for the remote execution service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
}

impl Submission {
    /// Exactly one file, `main.<ext>`, holding the whole source.
    pub fn new(target: Target, source: &str) -> Self {
        Self {
            language: target.runtime_id.to_string(),
            version: "*".to_string(),
            files: vec![SourceFile { name: target.file_name(), content: source.to_string() }],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteResponse {
    #[serde(default)]
    pub run: Option<RunSection>,
    #[serde(default)]
    pub compile: Option<CompileSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub memory: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompileSection {
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Which section of the response produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    Run,
    Compile,
    Unknown,
}

/// Map a remote response onto the single result shape.
pub fn normalize(resp: RemoteResponse) -> (ExecutionResult, ResponsePhase) {
    if let Some(run) = resp.run {
        let result = ExecutionResult {
            success: true,
            output: Some(run.output.unwrap_or_default()),
            execution_time_ms: run.time,
            memory_bytes: run.memory,
            ..Default::default()
        };
        return (result, ResponsePhase::Run);
    }
    if let Some(compile) = resp.compile {
        let message = compile
            .stderr
            .filter(|s| !s.is_empty())
            .or(compile.output.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| UNKNOWN_ERROR.into());
        return (EngineError::CompileFailure(message).into(), ResponsePhase::Compile);
    }
    (ExecutionResult::failure(UNKNOWN_ERROR), ResponsePhase::Unknown)
}

/// Transport to a remote execution service. One call, no retries.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn submit(&self, submission: &Submission) -> Result<RemoteResponse>;
}

#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn ExecutionBackend>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = piston::PistonClient::from_config(cfg)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn resolve(&self, language_id: &str) -> Result<Target, EngineError> {
        language::resolve(language_id)
    }

    /// Run `source` remotely. Never fails: every failure mode is folded into the result.
    pub async fn execute(&self, source: &str, language_id: &str) -> ExecutionResult {
        let target = match self.resolve(language_id) {
            Ok(t) => t,
            Err(e) => {
                debug!(language = language_id, "rejected before dispatch");
                return e.into();
            }
        };

        let submission = Submission::new(target, source);
        debug!(
            language = language_id,
            runtime = target.runtime_id,
            bytes = source.len(),
            "dispatching execution"
        );
        let started = Instant::now();
        let resp = match self.backend.submit(&submission).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    language = language_id,
                    error = %format!("{e:#}"),
                    "execution transport failed"
                );
                return EngineError::transport(format!("{e:#}")).into();
            }
        };

        let (result, phase) = normalize(resp);
        info!(
            language = language_id,
            phase = ?phase,
            success = result.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "execution settled"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> RemoteResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn run_section_maps_to_success() {
        let (result, phase) =
            normalize(parse(json!({ "run": { "output": "5", "time": 10, "memory": 100 } })));
        assert_eq!(phase, ResponsePhase::Run);
        assert_eq!(
            result,
            ExecutionResult {
                success: true,
                output: Some("5".into()),
                execution_time_ms: Some(10.0),
                memory_bytes: Some(100.0),
                ..Default::default()
            }
        );
    }

    #[test]
    fn compile_section_prefers_stderr() {
        let (result, phase) = normalize(parse(json!({ "compile": { "stderr": "err" } })));
        assert_eq!(phase, ResponsePhase::Compile);
        assert_eq!(result, ExecutionResult::failure("err"));
    }

    #[test]
    fn empty_stderr_falls_back_to_output() {
        let (result, _) =
            normalize(parse(json!({ "compile": { "stderr": "", "output": "fallback" } })));
        assert_eq!(result, ExecutionResult::failure("fallback"));
    }

    #[test]
    fn empty_compile_section_reports_unknown_error() {
        let (result, phase) = normalize(parse(json!({ "compile": { "stderr": "" } })));
        assert_eq!(phase, ResponsePhase::Compile);
        assert_eq!(result.error.as_deref(), Some("Unknown error occurred"));

        let (result, _) =
            normalize(parse(json!({ "compile": { "stderr": "", "output": "" } })));
        assert_eq!(result.error.as_deref(), Some("Unknown error occurred"));
    }

    #[test]
    fn fractional_run_statistics_are_copied() {
        let (result, _) =
            normalize(parse(json!({ "run": { "output": "", "time": 2.5, "memory": 1536.5 } })));
        assert!(result.success);
        assert_eq!(result.execution_time_ms, Some(2.5));
        assert_eq!(result.memory_bytes, Some(1536.5));
    }

    #[test]
    fn neither_section_is_unknown() {
        let (result, phase) = normalize(parse(json!({ "language": "nodejs" })));
        assert_eq!(phase, ResponsePhase::Unknown);
        assert_eq!(result, ExecutionResult::failure("Unknown error occurred"));
    }

    #[test]
    fn submission_has_single_main_file() {
        let target = language::resolve("python").unwrap();
        let sub = Submission::new(target, "print(1)");
        assert_eq!(
            serde_json::to_value(&sub).unwrap(),
            json!({
                "language": "python3",
                "version": "*",
                "files": [{ "name": "main.py", "content": "print(1)" }]
            })
        );
    }

    #[test]
    fn result_serializes_camel_case_without_absent_fields() {
        let (result, _) = normalize(parse(json!({ "run": { "output": "", "time": 1.5 } })));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "success": true, "output": "", "executionTimeMs": 1.5 })
        );
    }
}
