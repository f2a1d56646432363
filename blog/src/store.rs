//! Caller-facing posts store.
//!
//! Wraps the runtime [`Store`] with one method per command. Every `trigger_*`
//! call gets a fresh [`RequestId`] and returns an [`OperationHandle`] that can
//! abort the operation or wait for its outcome.

use crate::action::{Completion, Failure, Lifecycle, Operation, PostsAction};
use crate::environment::PostsEnvironment;
use crate::error::PostsError;
use crate::reducer::PostsReducer;
use crate::state::{PostsState, UnmatchedMutation};
use crate::types::{Post, PostDraft, PostId, RequestId, ValidationErrors};
use chrono::{DateTime, Utc};
use postsync_runtime::{Store, StoreConfig, StoreError};
use std::time::Duration;
use tokio::sync::broadcast;

type PostsRuntime = Store<PostsState, PostsAction, PostsEnvironment, PostsReducer>;

/// How an operation ended, short of an unexpected failure.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// The operation succeeded
    Completed(Completion),
    /// The service rejected the input
    Rejected(ValidationErrors),
    /// The operation was aborted
    Cancelled,
}

/// Read-only copy of the posts state.
#[derive(Debug, Clone, PartialEq)]
pub struct PostsView {
    /// The collection, in order
    pub posts: Vec<Post>,
    /// The post selected for editing
    pub editing: Option<Post>,
    /// Whether an operation owns the loading indicator
    pub loading: bool,
    /// The operation owning the loading indicator
    pub current_request_id: Option<RequestId>,
    /// When a list result was last applied
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Update and delete results that found no target
    pub unmatched: Vec<UnmatchedMutation>,
}

impl PostsView {
    /// Copy the parts of `state` a reader needs.
    #[must_use]
    pub fn of(state: &PostsState) -> Self {
        Self {
            posts: state.posts().to_vec(),
            editing: state.editing_post().cloned(),
            loading: state.is_loading(),
            current_request_id: state.current_request_id(),
            last_synced_at: state.last_synced_at(),
            unmatched: state.unmatched().to_vec(),
        }
    }
}

/// Posts state kept in sync with the remote collection service.
///
/// # Example
///
/// ```ignore
/// let store = PostsStore::new(environment);
///
/// let list = store.trigger_list().await?;
/// list.outcome().await?;
///
/// let view = store.snapshot().await;
/// assert!(!view.loading);
/// ```
#[derive(Clone)]
pub struct PostsStore {
    runtime: PostsRuntime,
}

impl PostsStore {
    /// Create a store with default runtime settings.
    #[must_use]
    pub fn new(environment: PostsEnvironment) -> Self {
        Self::with_config(environment, StoreConfig::default())
    }

    /// Create a store with custom runtime settings.
    ///
    /// `config.broadcast_capacity` bounds how far an [`OperationHandle`] may
    /// fall behind other operations' events before it misses its own.
    #[must_use]
    pub fn with_config(environment: PostsEnvironment, config: StoreConfig) -> Self {
        Self::with_state(PostsState::new(), environment, config)
    }

    /// Create a store starting from `state`.
    #[must_use]
    pub fn with_state(state: PostsState, environment: PostsEnvironment, config: StoreConfig) -> Self {
        Self {
            runtime: Store::with_config(state, PostsReducer::new(), environment, config),
        }
    }

    /// Fetch the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn trigger_list(&self) -> Result<OperationHandle, PostsError> {
        self.trigger(Operation::List).await
    }

    /// Create a post.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn trigger_create(&self, draft: PostDraft) -> Result<OperationHandle, PostsError> {
        self.trigger(Operation::Create(draft)).await
    }

    /// Replace the post `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn trigger_update(&self, id: PostId, body: PostDraft) -> Result<OperationHandle, PostsError> {
        self.trigger(Operation::Update { id, body }).await
    }

    /// Delete the post `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn trigger_delete(&self, id: PostId) -> Result<OperationHandle, PostsError> {
        self.trigger(Operation::Delete { id }).await
    }

    #[tracing::instrument(skip(self, operation), fields(kind = %operation.kind()))]
    async fn trigger(&self, operation: Operation) -> Result<OperationHandle, PostsError> {
        let request_id = RequestId::new();
        // Subscribe first so the terminal event cannot be missed
        let events = self.runtime.subscribe_actions();

        self.runtime
            .send(PostsAction::Dispatch {
                request_id,
                operation,
            })
            .await?;

        Ok(OperationHandle {
            request_id,
            store: self.clone(),
            events,
        })
    }

    /// Abort the operation `request_id` if it is still running.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn abort(&self, request_id: RequestId) -> Result<(), PostsError> {
        self.runtime.send(PostsAction::Abort { request_id }).await?;
        Ok(())
    }

    /// Select the post `id` for editing; selects nothing if it is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn begin_edit(&self, id: PostId) -> Result<(), PostsError> {
        self.runtime.send(PostsAction::BeginEdit { id }).await?;
        Ok(())
    }

    /// Drop the editing selection.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn cancel_edit(&self) -> Result<(), PostsError> {
        self.runtime.send(PostsAction::CancelEdit).await?;
        Ok(())
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> PostsView {
        self.runtime.state(PostsView::of).await
    }

    /// Read the current state through a closure.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&PostsState) -> T,
    {
        self.runtime.state(f).await
    }

    /// Actions produced by running operations, delivered after they are applied.
    ///
    /// Each operation delivers its raw [`PostsAction::Response`] followed by
    /// the terminal [`PostsAction::Lifecycle`] event that was applied.
    /// `Started` events are applied synchronously by the trigger call and are
    /// not delivered here.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PostsAction> {
        self.runtime.subscribe_actions()
    }

    /// Stop accepting commands and wait for running operations, up to the
    /// configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if operations are still running after
    /// the timeout.
    pub async fn shutdown_default(&self) -> Result<(), PostsError> {
        self.runtime.shutdown_default().await?;
        Ok(())
    }

    /// Stop accepting commands and wait for running operations.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if operations are still running after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), PostsError> {
        self.runtime.shutdown(timeout).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PostsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostsStore").finish_non_exhaustive()
    }
}

/// Handle to one triggered operation.
pub struct OperationHandle {
    request_id: RequestId,
    store: PostsStore,
    events: broadcast::Receiver<PostsAction>,
}

impl OperationHandle {
    /// The id this invocation runs under.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Abort the operation.
    ///
    /// Once the abort is applied, the operation ends as
    /// [`OperationOutcome::Cancelled`] even if the service has already
    /// answered. Aborting an operation whose result was applied first does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PostsError::Store`] if the store is shutting down.
    pub async fn abort(&self) -> Result<(), PostsError> {
        self.store.abort(self.request_id).await
    }

    /// Wait for the operation to end.
    ///
    /// By the time this returns, the outcome has been applied to the state.
    /// A result arriving after [`PostsStore::shutdown`] began is discarded and
    /// never reported; use [`OperationHandle::outcome_within`] to bound the wait.
    ///
    /// # Errors
    ///
    /// - [`PostsError::Remote`] for an unexpected failure
    /// - [`PostsError::Store`] with [`StoreError::Lagged`] if this handle fell
    ///   more than `broadcast_capacity` events behind; the outcome may already
    ///   be applied, so read it from [`PostsStore::snapshot`]
    /// - [`PostsError::Store`] with [`StoreError::ChannelClosed`] if the event
    ///   stream closed
    pub async fn outcome(mut self) -> Result<OperationOutcome, PostsError> {
        loop {
            match self.events.recv().await {
                Ok(PostsAction::Lifecycle(Lifecycle::Succeeded { request_id, completion }))
                    if request_id == self.request_id =>
                {
                    return Ok(OperationOutcome::Completed(completion));
                },
                Ok(PostsAction::Lifecycle(Lifecycle::Failed { request_id, kind, failure }))
                    if request_id == self.request_id =>
                {
                    return match failure {
                        Failure::Rejected(errors) => Ok(OperationOutcome::Rejected(errors)),
                        Failure::Cancelled => Ok(OperationOutcome::Cancelled),
                        Failure::Unexpected(message) => Err(PostsError::Remote { kind, message }),
                    };
                },
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(request_id = %self.request_id, skipped, "Operation handle lagged behind");
                    return Err(StoreError::Lagged(skipped).into());
                },
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::ChannelClosed.into());
                },
            }
        }
    }

    /// Like [`OperationHandle::outcome`], giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// As for [`OperationHandle::outcome`], plus [`PostsError::Store`] with
    /// [`StoreError::Timeout`] when the timeout expires.
    pub async fn outcome_within(self, timeout: Duration) -> Result<OperationOutcome, PostsError> {
        tokio::time::timeout(timeout, self.outcome())
            .await
            .map_err(|_| PostsError::Store(StoreError::Timeout))?
    }
}

impl std::fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationHandle")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
