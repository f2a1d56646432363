//! Operations, their lifecycle events, and the actions the posts reducer accepts.

use crate::types::{Post, PostDraft, PostId, RequestId, ValidationErrors};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The four kinds of remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Fetch the whole collection
    List,
    /// Create one post
    Create,
    /// Replace one post
    Update,
    /// Delete one post
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// An operation together with its input.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Fetch all posts
    List,
    /// Create a post from a draft
    Create(PostDraft),
    /// Replace the post `id` with `body`
    Update {
        /// Target post
        id: PostId,
        /// New content
        body: PostDraft,
    },
    /// Delete the post `id`
    Delete {
        /// Target post
        id: PostId,
    },
}

impl Operation {
    /// Which kind of operation this is.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::List => OperationKind::List,
            Self::Create(_) => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }
}

/// Phase of an operation's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The operation has been invoked
    Started,
    /// The operation finished with a result
    Succeeded,
    /// The operation finished with an error or was cancelled
    Failed,
}

impl Phase {
    /// Whether this phase ends the operation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Started)
    }
}

/// Successful result of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The whole collection
    Listed(Vec<Post>),
    /// The created post, with its server-assigned id
    Created(Post),
    /// The post as stored after the update
    Updated(Post),
    /// A post was deleted
    Deleted {
        /// The id the delete was invoked with
        id: PostId,
        /// Whatever the service answered, if anything
        response: Option<Value>,
    },
}

impl Completion {
    /// Which kind of operation produced this result.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Listed(_) => OperationKind::List,
            Self::Created(_) => OperationKind::Create,
            Self::Updated(_) => OperationKind::Update,
            Self::Deleted { .. } => OperationKind::Delete,
        }
    }
}

/// Why an operation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The service rejected the input (create and update only)
    Rejected(ValidationErrors),
    /// Anything else the service or transport reported
    Unexpected(String),
    /// The caller cancelled the operation
    Cancelled,
}

/// Lifecycle event of one operation invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    /// The operation was invoked
    Started {
        /// Invocation id
        request_id: RequestId,
        /// What was invoked
        operation: Operation,
    },
    /// The operation produced a result
    Succeeded {
        /// Invocation id
        request_id: RequestId,
        /// The result
        completion: Completion,
    },
    /// The operation failed or was cancelled
    Failed {
        /// Invocation id
        request_id: RequestId,
        /// Which operation failed
        kind: OperationKind,
        /// Why
        failure: Failure,
    },
}

impl Lifecycle {
    /// The lifecycle phase of this event.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Started { .. } => Phase::Started,
            Self::Succeeded { .. } => Phase::Succeeded,
            Self::Failed { .. } => Phase::Failed,
        }
    }

    /// The operation kind this event belongs to.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Started { operation, .. } => operation.kind(),
            Self::Succeeded { completion, .. } => completion.kind(),
            Self::Failed { kind, .. } => *kind,
        }
    }

    /// The invocation this event belongs to.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::Started { request_id, .. }
            | Self::Succeeded { request_id, .. }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

/// Everything the posts reducer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum PostsAction {
    /// Start an operation under a fresh request id
    Dispatch {
        /// Id for this invocation
        request_id: RequestId,
        /// What to run
        operation: Operation,
    },
    /// Cancel the in-flight operation `request_id`
    Abort {
        /// Invocation to cancel
        request_id: RequestId,
    },
    /// Select a post for editing
    BeginEdit {
        /// Post to select
        id: PostId,
    },
    /// Drop the editing selection
    CancelEdit,
    /// Terminal event as reported by a running operation
    ///
    /// Not applied directly: the reducer first checks it against aborts
    /// already applied and re-issues it as [`PostsAction::Lifecycle`].
    Response(Lifecycle),
    /// An operation's lifecycle event
    Lifecycle(Lifecycle),
}
