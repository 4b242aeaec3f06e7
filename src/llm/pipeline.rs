//! Lazily constructed, shared text-generation pipeline.
//!
//! State moves `Uninitialized -> Initializing -> Ready | Failed`. While a construction
//! is in flight every caller awaits the same shared future, so the loader runs at most
//! once per `Initializing` phase and all waiters observe the same outcome.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};

use super::{
    GenerateOptions, Generation, HttpPipelineLoader, PipelineLoader, PipelineSpec, TextGenerator,
};
use crate::{config::Config, error::EngineError};

pub type PipelineHandle = Arc<dyn TextGenerator>;

type InitFuture = Shared<BoxFuture<'static, Result<PipelineHandle, EngineError>>>;

/// What happens to callers arriving after a construction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Start a fresh construction (itself single-flight).
    #[default]
    Retry,
    /// Keep returning the first failure.
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum State {
    Uninitialized,
    Initializing { attempt: usize, fut: InitFuture },
    Ready(PipelineHandle),
    Failed(EngineError),
}

pub struct ModelPipelineManager {
    loader: Arc<dyn PipelineLoader>,
    spec: PipelineSpec,
    policy: FailurePolicy,
    state: Mutex<State>,
    constructions: AtomicUsize,
}

impl ModelPipelineManager {
    pub fn new(loader: Arc<dyn PipelineLoader>, spec: PipelineSpec, policy: FailurePolicy) -> Self {
        Self {
            loader,
            spec,
            policy,
            state: Mutex::new(State::Uninitialized),
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let loader = HttpPipelineLoader::from_config(cfg)?;
        let policy = if cfg.get_bool("MODEL_RETRY_AFTER_FAILURE") {
            FailurePolicy::Retry
        } else {
            FailurePolicy::Permanent
        };
        Ok(Self::new(Arc::new(loader), PipelineSpec::from_config(cfg), policy))
    }

    pub fn status(&self) -> PipelineStatus {
        match &*self.lock() {
            State::Uninitialized => PipelineStatus::Uninitialized,
            State::Initializing { .. } => PipelineStatus::Initializing,
            State::Ready(_) => PipelineStatus::Ready,
            State::Failed(_) => PipelineStatus::Failed,
        }
    }

    /// Number of constructions started so far.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn ensure_ready(&self) -> Result<PipelineHandle, EngineError> {
        let (attempt, fut) = {
            let mut state = self.lock();
            let pending = match &*state {
                State::Ready(handle) => return Ok(Arc::clone(handle)),
                State::Failed(e) if self.policy == FailurePolicy::Permanent => {
                    return Err(e.clone())
                }
                State::Initializing { attempt, fut } => Some((*attempt, fut.clone())),
                State::Uninitialized | State::Failed(_) => None,
            };
            match pending {
                Some(p) => {
                    debug!(attempt = p.0, "joining in-flight pipeline construction");
                    p
                }
                None => {
                    let attempt = self.constructions.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(
                        attempt,
                        task = %self.spec.task,
                        model = %self.spec.model,
                        "constructing model pipeline"
                    );
                    let fut = self.construct();
                    *state = State::Initializing { attempt, fut: fut.clone() };
                    (attempt, fut)
                }
            }
        };

        let outcome = fut.await;
        self.settle(attempt, &outcome);
        outcome
    }

    fn construct(&self) -> InitFuture {
        let loader = Arc::clone(&self.loader);
        let spec = self.spec.clone();
        async move { loader.load(&spec).await.map_err(|e| EngineError::pipeline_init(&e)) }
            .boxed()
            .shared()
    }

    /// First waiter to observe the outcome of `attempt` records it; later ones no-op.
    fn settle(&self, attempt: usize, outcome: &Result<PipelineHandle, EngineError>) {
        let mut state = self.lock();
        let current = matches!(&*state, State::Initializing { attempt: a, .. } if *a == attempt);
        if !current {
            return;
        }
        *state = match outcome {
            Ok(handle) => {
                info!(attempt, "model pipeline ready");
                State::Ready(Arc::clone(handle))
            }
            Err(e) => {
                warn!(attempt, error = %e, "model pipeline construction failed");
                State::Failed(e.clone())
            }
        };
    }

    /// Ensure the pipeline, then run one generation and return its first result.
    pub async fn generate(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<Generation, EngineError> {
        let handle = self.ensure_ready().await?;
        let mut generations = handle
            .generate(prompt, opts)
            .await
            .map_err(|e| EngineError::generation(&e))?;
        if generations.is_empty() {
            return Err(EngineError::GenerationFailure("empty generation".into()));
        }
        Ok(generations.swap_remove(0))
    }
}
