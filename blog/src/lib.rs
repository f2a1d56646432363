//! # Postsync Blog
//!
//! Blog posts kept in sync with a remote collection service.
//!
//! Four operations (list, create, update, delete) run against the service as
//! cancellable effects. Each one reports a `Started` event when triggered and
//! exactly one terminal event (`Succeeded` or `Failed`) when it ends, and the
//! [`PostsReducer`] folds those events into one [`PostsState`]:
//!
//! - successes change the collection, even when a newer operation has taken
//!   over the loading indicator in the meantime;
//! - the loading indicator belongs to the most recently started operation and
//!   only that operation's terminal event releases it;
//! - validation failures on create and update come back as a rejection, not an
//!   error, and never touch the collection;
//! - an aborted operation ends as cancelled and never applies a result.
//!
//! ## Example
//!
//! ```no_run
//! use postsync_blog::{HttpPostsApi, PostsConfig, PostsEnvironment, PostsStore};
//! use postsync_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PostsConfig::from_env();
//! let api = HttpPostsApi::from_config(&config)?;
//! let env = PostsEnvironment::new(Arc::new(api), Arc::new(SystemClock));
//! let store = PostsStore::with_config(env, config.store_config());
//!
//! let list = store.trigger_list().await?;
//! list.outcome().await?;
//! println!("{} posts", store.snapshot().await.posts.len());
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod api;
pub mod config;
pub mod environment;
pub mod error;
pub mod operation;
pub mod reducer;
pub mod state;
pub mod store;
pub mod types;

pub use action::{Completion, Failure, Lifecycle, Operation, OperationKind, Phase, PostsAction};
pub use api::{ApiCall, ApiError, HttpPostsApi, PostsApi, Reply, ScriptedPostsApi};
pub use config::{ConfigError, MissingTargetPolicy, PostsConfig};
pub use environment::PostsEnvironment;
pub use error::PostsError;
pub use reducer::PostsReducer;
pub use state::{PostsState, RequestRegistry, UnmatchedMutation};
pub use store::{OperationHandle, OperationOutcome, PostsStore, PostsView};
pub use types::{Post, PostDraft, PostId, RequestId, ValidationErrors};
