#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use codeshell::{
    analysis::{DiagnosticRequest, DiagnosticResponse, DiagnosticsBackend},
    execution::{ExecutionBackend, RemoteResponse, Submission},
    llm::{
        FailurePolicy, GenerateOptions, Generation, ModelPipelineManager, PipelineLoader,
        PipelineSpec, TextGenerator,
    },
};
use tokio::sync::Notify;

/// Execution backend that records submissions and replays a canned reply.
pub struct SpyBackend {
    reply: std::result::Result<serde_json::Value, String>,
    pub submissions: Mutex<Vec<Submission>>,
}

impl SpyBackend {
    pub fn replying(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self { reply: Ok(body), submissions: Mutex::new(Vec::new()) })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self { reply: Err(message.to_string()), submissions: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl ExecutionBackend for SpyBackend {
    async fn submit(&self, submission: &Submission) -> Result<RemoteResponse> {
        self.submissions.lock().unwrap().push(submission.clone());
        match &self.reply {
            Ok(body) => Ok(serde_json::from_value(body.clone())?),
            Err(msg) => Err(anyhow!(msg.clone())),
        }
    }
}

/// Generator that echoes the prompt followed by a fixed continuation.
pub struct EchoGenerator {
    pub continuation: String,
    pub score: f64,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl EchoGenerator {
    pub fn new(continuation: &str, score: f64) -> Arc<Self> {
        Arc::new(Self {
            continuation: continuation.to_string(),
            score,
            fail: false,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            continuation: String::new(),
            score: 0.0,
            fail: true,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str, _opts: &GenerateOptions) -> Result<Vec<Generation>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(anyhow!("inference backend crashed"));
        }
        Ok(vec![Generation {
            generated_text: format!("{prompt}{}", self.continuation),
            score: self.score,
        }])
    }
}

/// Loader that counts constructions, can be held at a gate, and fails scripted attempts.
pub struct CountingLoader {
    generator: Arc<EchoGenerator>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    failures: Mutex<VecDeque<bool>>,
}

impl CountingLoader {
    pub fn new(generator: Arc<EchoGenerator>) -> Arc<Self> {
        Arc::new(Self {
            generator,
            calls: AtomicUsize::new(0),
            gate: None,
            failures: Mutex::new(VecDeque::new()),
        })
    }

    pub fn gated(generator: Arc<EchoGenerator>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            generator,
            calls: AtomicUsize::new(0),
            gate: Some(gate),
            failures: Mutex::new(VecDeque::new()),
        })
    }

    /// `true` entries make the matching attempt fail; attempts past the script succeed.
    pub fn scripted(generator: Arc<EchoGenerator>, script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            generator,
            calls: AtomicUsize::new(0),
            gate: None,
            failures: Mutex::new(script.iter().copied().collect()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineLoader for CountingLoader {
    async fn load(&self, _spec: &PipelineSpec) -> Result<Arc<dyn TextGenerator>> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;
        let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
        if fail {
            return Err(anyhow!("model download failed (attempt {attempt})"));
        }
        Ok(self.generator.clone())
    }
}

pub fn spec() -> PipelineSpec {
    PipelineSpec { task: "text-generation".into(), model: "test/tiny".into() }
}

pub fn manager(loader: Arc<CountingLoader>, policy: FailurePolicy) -> Arc<ModelPipelineManager> {
    Arc::new(ModelPipelineManager::new(loader, spec(), policy))
}

/// Diagnostics backend returning a canned body or an error.
pub struct StubDiagnostics {
    reply: std::result::Result<serde_json::Value, String>,
    pub requests: Mutex<Vec<DiagnosticRequest>>,
}

impl StubDiagnostics {
    pub fn replying(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self { reply: Ok(body), requests: Mutex::new(Vec::new()) })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { reply: Err("connection refused".into()), requests: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl DiagnosticsBackend for StubDiagnostics {
    async fn diagnose(&self, request: &DiagnosticRequest) -> Result<DiagnosticResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(body) => Ok(serde_json::from_value(body.clone())?),
            Err(msg) => Err(anyhow!(msg.clone())),
        }
    }
}
