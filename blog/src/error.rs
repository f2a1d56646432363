//! Errors surfaced by the posts store.

use crate::action::OperationKind;
use postsync_runtime::StoreError;
use thiserror::Error;

/// Errors returned by [`PostsStore`](crate::store::PostsStore) and its operation handles.
///
/// Validation rejections and cancellations are not errors; they are
/// [`OperationOutcome`](crate::store::OperationOutcome)s.
#[derive(Error, Debug)]
pub enum PostsError {
    /// The underlying store refused the action or timed out
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote service failed in a way the posts feature does not handle
    #[error("{kind} failed: {message}")]
    Remote {
        /// Operation that failed
        kind: OperationKind,
        /// What the service or transport reported
        message: String,
    },
}
