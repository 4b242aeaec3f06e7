//! Caller-side state: the latest result of each action and the current debug session.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    analysis::{AnalysisResult, AnalysisService, CompletionResult},
    config::Config,
    debug::{DebugSession, DebugSynthesizer},
    error::EngineError,
    execution::{Dispatcher, ExecutionResult},
    llm::ModelPipelineManager,
};

pub struct Workbench {
    dispatcher: Dispatcher,
    debugger: DebugSynthesizer,
    ai: AnalysisService,
    pub result: Option<ExecutionResult>,
    pub debug_session: Option<DebugSession>,
    pub analysis: Option<AnalysisResult>,
    pub completion: Option<CompletionResult>,
    pub error: Option<String>,
}

impl Workbench {
    pub fn new(dispatcher: Dispatcher, ai: AnalysisService) -> Self {
        Self {
            debugger: DebugSynthesizer::new(dispatcher.clone()),
            dispatcher,
            ai,
            result: None,
            debug_session: None,
            analysis: None,
            completion: None,
            error: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let pipeline = Arc::new(ModelPipelineManager::from_config(cfg)?);
        let dispatcher = Dispatcher::from_config(cfg)?;
        let ai = AnalysisService::from_config(cfg, pipeline)?;
        Ok(Self::new(dispatcher, ai))
    }

    pub async fn compile(&mut self, source: &str, language_id: &str) -> &ExecutionResult {
        self.error = None;
        let result = self.dispatcher.execute(source, language_id).await;
        self.result.insert(result)
    }

    pub async fn debug(
        &mut self,
        source: &str,
        language_id: &str,
        breakpoints: &[u32],
    ) -> Result<&DebugSession, EngineError> {
        self.error = None;
        match self.debugger.synthesize(source, language_id, breakpoints).await {
            Ok(session) => Ok(self.debug_session.insert(session)),
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Discard the current debug session. Sessions are never persisted.
    pub fn clear_debug_session(&mut self) {
        self.debug_session = None;
    }

    pub async fn analyze(&mut self, source: &str, language_id: &str) -> &AnalysisResult {
        let analysis = self.ai.analyze(source, language_id).await;
        self.analysis.insert(analysis)
    }

    pub async fn complete(
        &mut self,
        source: &str,
        language_id: &str,
    ) -> Result<&CompletionResult, EngineError> {
        self.error = None;
        match self.ai.complete(source, language_id).await {
            Ok(completion) => Ok(self.completion.insert(completion)),
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn suggest(&self, source: &str, language_id: &str) -> Vec<String> {
        self.ai.suggest(source, language_id).await
    }
}
