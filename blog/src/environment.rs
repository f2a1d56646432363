//! Dependencies of the posts reducer.

use crate::api::PostsApi;
use crate::config::MissingTargetPolicy;
use postsync_core::environment::Clock;
use std::sync::Arc;

/// Injected dependencies for [`PostsReducer`](crate::reducer::PostsReducer).
///
/// Production wires an [`HttpPostsApi`](crate::api::HttpPostsApi) and
/// `SystemClock`; tests use a
/// [`ScriptedPostsApi`](crate::api::ScriptedPostsApi) and a fixed clock.
#[derive(Clone)]
pub struct PostsEnvironment {
    api: Arc<dyn PostsApi>,
    clock: Arc<dyn Clock>,
    missing_target: MissingTargetPolicy,
}

impl PostsEnvironment {
    /// Create an environment with the default missing-target policy.
    #[must_use]
    pub fn new(api: Arc<dyn PostsApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            missing_target: MissingTargetPolicy::default(),
        }
    }

    /// Use `policy` for update/delete results without a target.
    #[must_use]
    pub fn with_missing_target_policy(mut self, policy: MissingTargetPolicy) -> Self {
        self.missing_target = policy;
        self
    }

    /// The remote collection service.
    #[must_use]
    pub fn api(&self) -> Arc<dyn PostsApi> {
        Arc::clone(&self.api)
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The missing-target policy.
    #[must_use]
    pub const fn missing_target_policy(&self) -> MissingTargetPolicy {
        self.missing_target
    }
}

impl std::fmt::Debug for PostsEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostsEnvironment")
            .field("missing_target", &self.missing_target)
            .finish_non_exhaustive()
    }
}
