//! Integration tests for Store action broadcasting
//!
//! Effect-produced actions are broadcast after the reducer has applied them.
//! These tests drive cancellable jobs through the store and observe their
//! terminal actions from outside.

#![allow(clippy::unwrap_used)] // Test code

use postsync_core::{CancellationToken, EffectId, SmallVec, effect::Effect, reducer::Reducer, smallvec};
use postsync_runtime::{Store, StoreError};
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum JobAction {
    /// Start a job that takes `millis` to finish
    Start { job: u32, millis: u64 },
    /// Abort a running job
    Stop { job: u32 },
    /// Job finished (terminal action)
    Finished { job: u32, cancelled: bool },
}

#[derive(Debug, Clone, Default)]
struct JobState {
    running: Vec<u32>,
    finished: Vec<u32>,
    cancelled: Vec<u32>,
}

#[derive(Clone)]
struct JobReducer;

fn job_id(job: u32) -> EffectId {
    EffectId::new(format!("job/{job}"))
}

impl Reducer for JobReducer {
    type State = JobState;
    type Action = JobAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            JobAction::Start { job, millis } => {
                state.running.push(job);
                let token = CancellationToken::new();
                let observed = token.clone();
                smallvec![
                    Effect::Future(Box::pin(async move {
                        let cancelled = tokio::select! {
                            () = observed.cancelled() => true,
                            () = tokio::time::sleep(Duration::from_millis(millis)) => false,
                        };
                        Some(JobAction::Finished { job, cancelled })
                    }))
                    .cancellable(job_id(job), token)
                ]
            },
            JobAction::Stop { job } => smallvec![Effect::Cancel(job_id(job))],
            JobAction::Finished { job, cancelled } => {
                state.running.retain(|j| *j != job);
                if cancelled {
                    state.cancelled.push(job);
                } else {
                    state.finished.push(job);
                }
                smallvec![Effect::None]
            },
        }
    }
}

fn store() -> Store<JobState, JobAction, (), JobReducer> {
    Store::new(JobState::default(), JobReducer, ())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_send_and_wait_for_sees_applied_state() {
    let store = store();

    let action = store
        .send_and_wait_for(
            JobAction::Start { job: 1, millis: 10 },
            |a| matches!(a, JobAction::Finished { job: 1, .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(action, JobAction::Finished { job: 1, cancelled: false });
    let (running, finished) = store.state(|s| (s.running.clone(), s.finished.clone())).await;
    assert!(running.is_empty());
    assert_eq!(finished, vec![1]);
    assert!(store.cancellations().is_empty());
}

#[tokio::test]
async fn test_every_subscriber_receives_the_terminal_action() {
    let store = store();
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    store.send(JobAction::Start { job: 7, millis: 5 }).await.unwrap();

    let expected = JobAction::Finished { job: 7, cancelled: false };
    assert_eq!(first.recv().await.unwrap(), expected);
    assert_eq!(second.recv().await.unwrap(), expected);
}

#[tokio::test]
async fn test_stop_cancels_only_the_named_job() {
    let store = store();
    let mut observer = store.subscribe_actions();

    store.send(JobAction::Start { job: 1, millis: 10_000 }).await.unwrap();
    store.send(JobAction::Start { job: 2, millis: 20 }).await.unwrap();
    assert_eq!(store.cancellations().len(), 2);

    store.send(JobAction::Stop { job: 1 }).await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        seen.push(
            tokio::time::timeout(Duration::from_secs(1), observer.recv())
                .await
                .unwrap()
                .unwrap(),
        );
    }

    assert!(seen.contains(&JobAction::Finished { job: 1, cancelled: true }));
    assert!(seen.contains(&JobAction::Finished { job: 2, cancelled: false }));
    let (cancelled, finished) = store.state(|s| (s.cancelled.clone(), s.finished.clone())).await;
    assert_eq!(cancelled, vec![1]);
    assert_eq!(finished, vec![2]);
}

#[tokio::test]
async fn test_stopping_a_finished_job_is_a_no_op() {
    let store = store();

    store
        .send_and_wait_for(
            JobAction::Start { job: 3, millis: 1 },
            |a| matches!(a, JobAction::Finished { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    store.send(JobAction::Stop { job: 3 }).await.unwrap();
    assert!(!store.cancel(&job_id(3)));

    let cancelled = store.state(|s| s.cancelled.clone()).await;
    assert!(cancelled.is_empty());
}

#[tokio::test]
async fn test_send_and_wait_for_times_out() {
    let store = store();

    let result = store
        .send_and_wait_for(
            JobAction::Start { job: 9, millis: 10_000 },
            |a| matches!(a, JobAction::Finished { .. }),
            Duration::from_millis(30),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
    assert!(store.cancel(&job_id(9)));
}
