mod common;

use std::sync::Arc;

use codeshell::{
    llm::{FailurePolicy, PipelineStatus},
    EngineError,
};
use common::{manager, CountingLoader, EchoGenerator};
use tokio::sync::Notify;

#[tokio::test]
async fn concurrent_callers_share_one_construction() {
    let gate = Arc::new(Notify::new());
    let loader = CountingLoader::gated(EchoGenerator::new("", 1.0), gate.clone());
    let pipeline = manager(loader.clone(), FailurePolicy::Retry);

    let release = async {
        // Both callers have been polled once by now and are parked on the gate.
        tokio::task::yield_now().await;
        assert_eq!(pipeline.status(), PipelineStatus::Initializing);
        assert_eq!(loader.calls(), 1);
        gate.notify_one();
    };

    let (a, b, ()) = tokio::join!(pipeline.ensure_ready(), pipeline.ensure_ready(), release);

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(loader.calls(), 1);
    assert_eq!(pipeline.constructions(), 1);
    assert_eq!(pipeline.status(), PipelineStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_tasks_never_duplicate_construction() {
    let gate = Arc::new(Notify::new());
    let loader = CountingLoader::gated(EchoGenerator::new("", 1.0), gate.clone());
    let pipeline = manager(loader.clone(), FailurePolicy::Retry);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ensure_ready().await })
        })
        .collect();
    gate.notify_one();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.unwrap().unwrap());
    }
    assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn ready_pipeline_is_reused_without_reconstruction() {
    let loader = CountingLoader::new(EchoGenerator::new("", 1.0));
    let pipeline = manager(loader.clone(), FailurePolicy::Retry);

    let first = pipeline.ensure_ready().await.unwrap();
    let second = pipeline.ensure_ready().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn failure_is_shared_by_all_waiters() {
    let loader = CountingLoader::scripted(EchoGenerator::new("", 1.0), &[true]);
    let pipeline = manager(loader.clone(), FailurePolicy::Retry);

    // The loader yields once, so the second caller joins while the first is in flight.
    let (a, b) = tokio::join!(pipeline.ensure_ready(), pipeline.ensure_ready());

    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert_eq!(a, b);
    assert!(matches!(a, EngineError::PipelineInitFailure(ref msg) if msg.contains("attempt 1")));
    assert_eq!(loader.calls(), 1);
    assert_eq!(pipeline.status(), PipelineStatus::Failed);
}

#[tokio::test]
async fn retry_policy_constructs_again_after_failure() {
    let loader = CountingLoader::scripted(EchoGenerator::new("", 1.0), &[true]);
    let pipeline = manager(loader.clone(), FailurePolicy::Retry);

    assert!(pipeline.ensure_ready().await.is_err());
    assert_eq!(pipeline.status(), PipelineStatus::Failed);

    assert!(pipeline.ensure_ready().await.is_ok());
    assert_eq!(loader.calls(), 2);
    assert_eq!(pipeline.constructions(), 2);
    assert_eq!(pipeline.status(), PipelineStatus::Ready);
}

#[tokio::test]
async fn permanent_policy_keeps_first_failure() {
    let loader = CountingLoader::scripted(EchoGenerator::new("", 1.0), &[true]);
    let pipeline = manager(loader.clone(), FailurePolicy::Permanent);

    let first = pipeline.ensure_ready().await.unwrap_err();
    let second = pipeline.ensure_ready().await.unwrap_err();

    assert_eq!(first, second);
    assert_eq!(loader.calls(), 1);
    assert_eq!(pipeline.status(), PipelineStatus::Failed);
}
