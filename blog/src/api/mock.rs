//! Scripted in-memory [`PostsApi`] for tests and demos.
//!
//! Replies are queued per call kind and handed out in order. A reply may be
//! delayed; a call cancelled while waiting answers [`ApiError::Cancelled`] and
//! counts as aborted. A call with nothing queued fails with a transport error.

use super::{ApiError, ApiFuture, PostsApi};
use crate::action::OperationKind;
use crate::types::{Post, PostDraft, PostId};
use postsync_core::CancellationToken;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct Reply<T> {
    result: Result<T, ApiError>,
    latency: Duration,
}

impl<T> Reply<T> {
    /// Answer with `value`.
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self {
            result: Ok(value),
            latency: Duration::ZERO,
        }
    }

    /// Answer with `error`.
    #[must_use]
    pub const fn err(error: ApiError) -> Self {
        Self {
            result: Err(error),
            latency: Duration::ZERO,
        }
    }

    /// Delay the answer.
    #[must_use]
    pub const fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// A call received by [`ScriptedPostsApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `list`
    List,
    /// `create`
    Create(PostDraft),
    /// `update`
    Update {
        /// Target
        id: PostId,
        /// Content
        body: PostDraft,
    },
    /// `delete`
    Delete {
        /// Target
        id: PostId,
    },
}

#[derive(Default)]
struct Script {
    list: VecDeque<Reply<Vec<Post>>>,
    create: VecDeque<Reply<Post>>,
    update: VecDeque<Reply<Post>>,
    delete: VecDeque<Reply<Option<Value>>>,
    calls: Vec<ApiCall>,
    aborted: usize,
}

/// [`PostsApi`] answering from queued [`Reply`]s.
#[derive(Default)]
pub struct ScriptedPostsApi {
    script: Mutex<Script>,
}

impl ScriptedPostsApi {
    /// A service with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for `list`.
    pub fn push_list(&self, reply: Reply<Vec<Post>>) -> &Self {
        self.lock().list.push_back(reply);
        self
    }

    /// Queue an answer for `create`.
    pub fn push_create(&self, reply: Reply<Post>) -> &Self {
        self.lock().create.push_back(reply);
        self
    }

    /// Queue an answer for `update`.
    pub fn push_update(&self, reply: Reply<Post>) -> &Self {
        self.lock().update.push_back(reply);
        self
    }

    /// Queue an answer for `delete`.
    pub fn push_delete(&self, reply: Reply<Option<Value>>) -> &Self {
        self.lock().delete.push_back(reply);
        self
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// How many calls were cancelled before answering.
    #[must_use]
    pub fn aborted(&self) -> usize {
        self.lock().aborted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn answer<T>(
        &self,
        kind: OperationKind,
        reply: Option<Reply<T>>,
        cancel: CancellationToken,
    ) -> Result<T, ApiError> {
        let Some(reply) = reply else {
            return Err(ApiError::Transport(format!("no scripted {kind} reply")));
        };

        if !reply.latency.is_zero() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {},
                () = tokio::time::sleep(reply.latency) => {},
            }
        }

        if cancel.is_cancelled() {
            self.lock().aborted += 1;
            tracing::trace!(%kind, "Scripted call aborted");
            return Err(ApiError::Cancelled);
        }
        reply.result
    }
}

impl PostsApi for ScriptedPostsApi {
    fn list(&self, cancel: CancellationToken) -> ApiFuture<'_, Vec<Post>> {
        let reply = {
            let mut script = self.lock();
            script.calls.push(ApiCall::List);
            script.list.pop_front()
        };
        Box::pin(self.answer(OperationKind::List, reply, cancel))
    }

    fn create(&self, draft: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post> {
        let reply = {
            let mut script = self.lock();
            script.calls.push(ApiCall::Create(draft));
            script.create.pop_front()
        };
        Box::pin(self.answer(OperationKind::Create, reply, cancel))
    }

    fn update(&self, id: PostId, body: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post> {
        let reply = {
            let mut script = self.lock();
            script.calls.push(ApiCall::Update { id, body });
            script.update.pop_front()
        };
        Box::pin(self.answer(OperationKind::Update, reply, cancel))
    }

    fn delete(&self, id: PostId, cancel: CancellationToken) -> ApiFuture<'_, Option<Value>> {
        let reply = {
            let mut script = self.lock();
            script.calls.push(ApiCall::Delete { id });
            script.delete.pop_front()
        };
        Box::pin(self.answer(OperationKind::Delete, reply, cancel))
    }
}

impl std::fmt::Debug for ScriptedPostsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.lock();
        f.debug_struct("ScriptedPostsApi")
            .field("calls", &script.calls.len())
            .field("aborted", &script.aborted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_and_logs_calls() {
        let api = ScriptedPostsApi::new();
        api.push_create(Reply::ok(Post::new("1", "a")))
            .push_create(Reply::err(ApiError::Transport("down".to_string())));

        let first = api.create(PostDraft::titled("a"), CancellationToken::new()).await;
        let second = api.create(PostDraft::titled("b"), CancellationToken::new()).await;
        let third = api.create(PostDraft::titled("c"), CancellationToken::new()).await;

        assert_eq!(first, Ok(Post::new("1", "a")));
        assert_eq!(second, Err(ApiError::Transport("down".to_string())));
        assert!(matches!(third, Err(ApiError::Transport(_))));
        assert_eq!(api.calls().len(), 3);
        assert_eq!(api.calls()[1], ApiCall::Create(PostDraft::titled("b")));
    }

    #[tokio::test]
    async fn cancellation_cuts_latency_short() {
        let api = ScriptedPostsApi::new();
        api.push_list(Reply::ok(vec![Post::new("1", "a")]).after(Duration::from_secs(30)));

        let cancel = CancellationToken::new();
        let call = api.list(cancel.clone());
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), call).await;
        assert_eq!(result.ok(), Some(Err(ApiError::Cancelled)));
        assert_eq!(api.aborted(), 1);
    }
}
