//! The posts reducer.
//!
//! Two rules apply to every operation regardless of its kind:
//!
//! - a `Started` event hands the loading indicator to its request id,
//!   replacing whichever operation held it;
//! - a terminal event (`Succeeded` or `Failed`) releases the indicator only if
//!   its request id still holds it.
//!
//! On top of that, each kind of `Succeeded` event applies its own change to
//! the collection, whether or not the operation still holds the indicator.
//! Failures never change the collection or the editing selection.

use crate::action::{Completion, Failure, Lifecycle, Operation, OperationKind, PostsAction};
use crate::config::MissingTargetPolicy;
use crate::environment::PostsEnvironment;
use crate::operation;
use crate::state::{PostsState, UnmatchedMutation};
use crate::types::{PostId, RequestId};
use postsync_core::{CancellationToken, EffectId, SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Reducer for the posts feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostsReducer;

impl PostsReducer {
    /// Create a new posts reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn start(state: &mut PostsState, request_id: RequestId, kind: OperationKind) {
        match state.registry_mut().begin(request_id) {
            Some(previous) => {
                tracing::debug!(%request_id, %kind, superseded = %previous, "Operation started");
            },
            None => tracing::debug!(%request_id, %kind, "Operation started"),
        }
    }

    /// Effect running `operation` under its own cancellation token.
    fn launch(request_id: RequestId, operation: Operation, env: &PostsEnvironment) -> Effect<PostsAction> {
        let token = CancellationToken::new();
        let observed = token.clone();
        let api = env.api();

        Effect::Future(Box::pin(async move {
            Some(operation::run(api.as_ref(), request_id, operation, observed).await)
        }))
        .map(PostsAction::Response)
        .cancellable(EffectId::from(request_id), token)
    }

    /// The terminal event to apply for an operation's response.
    ///
    /// An operation aborted before its response was reduced ends as cancelled,
    /// whatever the service answered.
    fn resolve(state: &mut PostsState, event: Lifecycle) -> Lifecycle {
        let request_id = event.request_id();
        match (state.untrack(request_id), event) {
            (
                Some(true),
                event @ (Lifecycle::Succeeded { .. }
                | Lifecycle::Failed {
                    failure: Failure::Rejected(_) | Failure::Unexpected(_),
                    ..
                }),
            ) => {
                tracing::debug!(%request_id, "Response arrived after abort; discarded");
                Lifecycle::Failed {
                    request_id,
                    kind: event.kind(),
                    failure: Failure::Cancelled,
                }
            },
            (_, event) => event,
        }
    }

    fn apply(state: &mut PostsState, event: Lifecycle, env: &PostsEnvironment) {
        match event {
            Lifecycle::Started { request_id, operation } => {
                Self::start(state, request_id, operation.kind());
            },
            Lifecycle::Succeeded { request_id, completion } => {
                Self::apply_completion(state, request_id, completion, env);
                Self::settle(state, request_id);
            },
            Lifecycle::Failed { request_id, kind, failure } => {
                match &failure {
                    Failure::Rejected(errors) => {
                        tracing::debug!(%request_id, %kind, fields = errors.fields.len(), "Operation rejected");
                    },
                    Failure::Unexpected(message) => {
                        tracing::debug!(%request_id, %kind, error = %message, "Operation failed");
                    },
                    Failure::Cancelled => tracing::debug!(%request_id, %kind, "Operation cancelled"),
                }
                Self::settle(state, request_id);
            },
        }
    }

    fn apply_completion(
        state: &mut PostsState,
        request_id: RequestId,
        completion: Completion,
        env: &PostsEnvironment,
    ) {
        match completion {
            Completion::Listed(posts) => {
                let dropped = state.replace_all(posts);
                if dropped > 0 {
                    tracing::warn!(%request_id, dropped, "List result repeated post ids; kept first occurrences");
                }
                state.mark_synced(env.clock().now());
            },
            Completion::Created(post) => {
                let id = post.id.clone();
                if !state.append(post) {
                    tracing::warn!(%request_id, post_id = %id, "Created post already present; replaced in place");
                }
            },
            Completion::Updated(post) => {
                let id = post.id.clone();
                let found = state.replace_by_id(post);
                state.clear_editing_selection();
                if !found {
                    Self::missing_target(state, request_id, OperationKind::Update, id, env);
                }
            },
            Completion::Deleted { id, .. } => {
                if !state.remove_by_id(&id) {
                    Self::missing_target(state, request_id, OperationKind::Delete, id, env);
                }
            },
        }
    }

    fn missing_target(
        state: &mut PostsState,
        request_id: RequestId,
        kind: OperationKind,
        id: PostId,
        env: &PostsEnvironment,
    ) {
        match env.missing_target_policy() {
            MissingTargetPolicy::Ignore => {
                tracing::trace!(%request_id, %kind, post_id = %id, "No post to apply result to");
            },
            MissingTargetPolicy::Warn => {
                tracing::warn!(%request_id, %kind, post_id = %id, "No post to apply result to");
            },
            MissingTargetPolicy::Record => {
                tracing::warn!(%request_id, %kind, post_id = %id, "No post to apply result to; recorded");
                state.record_unmatched(UnmatchedMutation { request_id, kind, id });
            },
        }
    }

    fn settle(state: &mut PostsState, request_id: RequestId) {
        if state.registry_mut().settle(request_id) {
            tracing::debug!(%request_id, "Loading indicator released");
        } else {
            tracing::debug!(%request_id, "Terminal event of a superseded operation; indicator unchanged");
        }
    }
}

impl Reducer for PostsReducer {
    type State = PostsState;
    type Action = PostsAction;
    type Environment = PostsEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PostsAction::Dispatch { request_id, operation } => {
                state.track(request_id);
                Self::start(state, request_id, operation.kind());
                smallvec![Self::launch(request_id, operation, env)]
            },
            PostsAction::Abort { request_id } => {
                if state.mark_aborted(request_id) {
                    tracing::debug!(%request_id, "Abort requested");
                } else {
                    tracing::trace!(%request_id, "Abort of an operation not in flight");
                }
                smallvec![Effect::Cancel(EffectId::from(request_id))]
            },
            PostsAction::BeginEdit { id } => {
                if !state.set_editing_selection(&id) {
                    tracing::debug!(post_id = %id, "No such post to edit; selection cleared");
                }
                smallvec![Effect::None]
            },
            PostsAction::CancelEdit => {
                state.clear_editing_selection();
                smallvec![Effect::None]
            },
            PostsAction::Response(event) => {
                let event = Self::resolve(state, event);
                smallvec![Effect::Future(Box::pin(async move {
                    Some(PostsAction::Lifecycle(event))
                }))]
            },
            PostsAction::Lifecycle(event) => {
                Self::apply(state, event, env);
                smallvec![Effect::None]
            },
        }
    }
}
