//! Running one operation against the remote service.

use crate::action::{Completion, Failure, Lifecycle, Operation, OperationKind};
use crate::api::{ApiError, PostsApi};
use crate::types::{RequestId, ValidationErrors};
use postsync_core::CancellationToken;

/// Run `operation` and report its terminal lifecycle event.
///
/// The service sees `token` and gets the first chance to wind down; a service
/// that ignores it is dropped once the token fires. The token is checked once
/// more before reporting: once cancelled, the result is always
/// [`Failure::Cancelled`], even if the service answered in time.
#[tracing::instrument(skip(api, operation, token), fields(kind = %operation.kind()))]
pub async fn run(
    api: &dyn PostsApi,
    request_id: RequestId,
    operation: Operation,
    token: CancellationToken,
) -> Lifecycle {
    let kind = operation.kind();

    let result = tokio::select! {
        biased;
        result = call(api, operation, token.clone()) => result,
        () = token.cancelled() => Err(ApiError::Cancelled),
    };

    if token.is_cancelled() {
        tracing::debug!(%request_id, "Operation cancelled");
        return Lifecycle::Failed {
            request_id,
            kind,
            failure: Failure::Cancelled,
        };
    }

    match result {
        Ok(completion) => {
            tracing::debug!(%request_id, "Operation succeeded");
            Lifecycle::Succeeded {
                request_id,
                completion,
            }
        },
        Err(error) => {
            let failure = classify(kind, error);
            if let Failure::Unexpected(message) = &failure {
                tracing::warn!(%request_id, error = %message, "Operation failed");
            } else {
                tracing::debug!(%request_id, "Operation rejected");
            }
            Lifecycle::Failed {
                request_id,
                kind,
                failure,
            }
        },
    }
}

async fn call(
    api: &dyn PostsApi,
    operation: Operation,
    token: CancellationToken,
) -> Result<Completion, ApiError> {
    match operation {
        Operation::List => api.list(token).await.map(Completion::Listed),
        Operation::Create(draft) => api.create(draft, token).await.map(Completion::Created),
        Operation::Update { id, body } => api.update(id, body, token).await.map(Completion::Updated),
        Operation::Delete { id } => {
            let response = api.delete(id.clone(), token).await?;
            Ok(Completion::Deleted { id, response })
        },
    }
}

/// Sort an API error into the failure the reducer sees.
///
/// Validation errors are a recognised rejection only for create and update;
/// for list and delete they are as unexpected as any other status.
#[must_use]
pub fn classify(kind: OperationKind, error: ApiError) -> Failure {
    match (kind, error) {
        (OperationKind::Create | OperationKind::Update, ApiError::Validation { status, body }) => {
            Failure::Rejected(ValidationErrors::from_body(status, &body))
        },
        (_, ApiError::Cancelled) => Failure::Cancelled,
        (_, error) => Failure::Unexpected(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Reply, ScriptedPostsApi};
    use crate::types::{Post, PostDraft, PostId};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn delete_reports_the_input_id() {
        let api = ScriptedPostsApi::new();
        api.push_delete(Reply::ok(Some(json!({"id": "other"}))));
        let request_id = RequestId::new();

        let event = run(&api, request_id, Operation::Delete { id: PostId::new("42") }, CancellationToken::new()).await;

        assert_eq!(
            event,
            Lifecycle::Succeeded {
                request_id,
                completion: Completion::Deleted {
                    id: PostId::new("42"),
                    response: Some(json!({"id": "other"})),
                },
            }
        );
    }

    #[tokio::test]
    async fn validation_on_create_is_a_rejection() {
        let api = ScriptedPostsApi::new();
        api.push_create(Reply::err(ApiError::Validation {
            status: 422,
            body: json!({"title": ["too short"]}),
        }));

        let event = run(&api, RequestId::new(), Operation::Create(PostDraft::titled("x")), CancellationToken::new()).await;

        match event {
            Lifecycle::Failed { kind, failure: Failure::Rejected(errors), .. } => {
                assert_eq!(kind, OperationKind::Create);
                assert_eq!(errors.messages("title"), ["too short"]);
            },
            other => unreachable!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn validation_on_list_or_delete_is_unexpected() {
        let error = ApiError::Validation {
            status: 422,
            body: json!({}),
        };
        assert!(matches!(classify(OperationKind::List, error.clone()), Failure::Unexpected(_)));
        assert!(matches!(classify(OperationKind::Delete, error), Failure::Unexpected(_)));
        assert!(matches!(
            classify(OperationKind::Update, ApiError::Status { status: 500, body: json!(null) }),
            Failure::Unexpected(_)
        ));
    }

    #[tokio::test]
    async fn cancelled_before_answer_reports_cancelled() {
        let api = ScriptedPostsApi::new();
        api.push_update(Reply::ok(Post::new("1", "late")).after(Duration::from_secs(30)));
        let token = CancellationToken::new();
        let request_id = RequestId::new();

        let running = run(
            &api,
            request_id,
            Operation::Update { id: PostId::new("1"), body: PostDraft::titled("late") },
            token.clone(),
        );
        token.cancel();
        let event = tokio::time::timeout(Duration::from_secs(1), running).await;

        assert_eq!(
            event.ok(),
            Some(Lifecycle::Failed {
                request_id,
                kind: OperationKind::Update,
                failure: Failure::Cancelled,
            })
        );
    }

    #[tokio::test]
    async fn answer_racing_cancellation_is_discarded() {
        // The service answers immediately, but the token is already cancelled
        let api = ScriptedPostsApi::new();
        api.push_list(Reply::ok(vec![Post::new("1", "a")]));
        let token = CancellationToken::new();
        token.cancel();

        let event = run(&api, RequestId::new(), Operation::List, token).await;
        assert!(matches!(event, Lifecycle::Failed { failure: Failure::Cancelled, .. }));
    }
}
