//! Remote collection service.
//!
//! [`PostsApi`] is the seam between the posts reducer and the network. The
//! reducer's effects capture an `Arc<dyn PostsApi>`, so the trait returns boxed
//! futures instead of using `async fn`.

use crate::types::{Post, PostDraft, PostId};
use postsync_core::CancellationToken;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::HttpPostsApi;
pub use mock::{ApiCall, Reply, ScriptedPostsApi};

/// Errors reported by a [`PostsApi`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The service rejected the input (HTTP 422)
    #[error("Validation failed with status {status}: {body}")]
    Validation {
        /// Status code
        status: u16,
        /// Response body
        body: Value,
    },

    /// Any other non-success status
    #[error("Service answered {status}: {body}")]
    Status {
        /// Status code
        status: u16,
        /// Response body
        body: Value,
    },

    /// The request never got an answer
    #[error("Transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The call observed its cancellation token
    #[error("Request cancelled")]
    Cancelled,
}

/// Boxed future returned by [`PostsApi`] calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// The remote collection service.
///
/// Every call receives the token of the operation it serves and must stop
/// waiting for the network once it is cancelled, answering
/// [`ApiError::Cancelled`].
pub trait PostsApi: Send + Sync {
    /// Fetch all posts.
    ///
    /// # Errors
    ///
    /// Transport, status, decode or cancellation errors.
    fn list(&self, cancel: CancellationToken) -> ApiFuture<'_, Vec<Post>>;

    /// Create a post; the service assigns its id.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if the service rejects the draft, otherwise
    /// as for [`PostsApi::list`].
    fn create(&self, draft: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post>;

    /// Replace the post `id`.
    ///
    /// # Errors
    ///
    /// As for [`PostsApi::create`].
    fn update(&self, id: PostId, body: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post>;

    /// Delete the post `id`, returning whatever body the service sent.
    ///
    /// # Errors
    ///
    /// As for [`PostsApi::list`].
    fn delete(&self, id: PostId, cancel: CancellationToken) -> ApiFuture<'_, Option<Value>>;
}
