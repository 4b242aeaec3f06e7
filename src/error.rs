//! Error taxonomy shared by the dispatcher, the debug synthesizer and the model pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Every failure the orchestration layer can name.
///
/// Execution failures (`UnsupportedLanguage`, `TransportFailure`, `CompileFailure`,
/// `RuntimeFailure`) are normally folded into `ExecutionResult { success: false, .. }`;
/// the remaining kinds propagate to callers. The type is `Clone` so a single settled
/// pipeline failure can be handed to every caller that waited on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{0}")]
    TransportFailure(String),

    #[error("{0}")]
    CompileFailure(String),

    /// Never produced by `normalize`; a `run` section always counts as a success.
    #[error("{0}")]
    RuntimeFailure(String),

    #[error("compilation required before debugging: {0}")]
    CompilationRequired(String),

    #[error("model pipeline initialization failed: {0}")]
    PipelineInitFailure(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),
}

impl EngineError {
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::TransportFailure(e.to_string())
    }

    pub fn pipeline_init(e: &anyhow::Error) -> Self {
        Self::PipelineInitFailure(format!("{e:#}"))
    }

    pub fn generation(e: &anyhow::Error) -> Self {
        Self::GenerationFailure(format!("{e:#}"))
    }
}
