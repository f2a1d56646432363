//! Wire contract of `HttpPostsApi`
//!
//! Each test stands up a local mock server and checks how statuses and
//! bodies come back through the `PostsApi` trait.

#![allow(clippy::unwrap_used)] // Test code

use postsync_blog::{ApiError, HttpPostsApi, Post, PostDraft, PostId, PostsApi};
use postsync_core::CancellationToken;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> HttpPostsApi {
    HttpPostsApi::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_list_decodes_posts_and_keeps_unknown_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "title": "A", "views": 7},
            {"id": "2", "title": "B", "published": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let posts = api_for(&server).list(CancellationToken::new()).await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, PostId::new("1"));
    assert_eq!(posts[0].extra.get("views"), Some(&json!(7)));
    assert!(posts[1].published);
}

#[tokio::test]
async fn test_create_sends_draft_as_camel_case_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(body_json(json!({
            "title": "B",
            "description": "",
            "publishDate": "",
            "featuredImage": "",
            "published": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "2", "title": "B"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = api_for(&server)
        .create(PostDraft::titled("B"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(created, Post::new("2", "B"));
}

#[tokio::test]
async fn test_unprocessable_entity_is_a_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/posts/2"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"title": ["too short"]})))
        .mount(&server)
        .await;

    let result = api_for(&server)
        .update(PostId::new("2"), PostDraft::titled("B"), CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(ApiError::Validation {
            status: 422,
            body: json!({"title": ["too short"]}),
        })
    );
}

#[tokio::test]
async fn test_other_error_status_keeps_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "no such collection"})))
        .mount(&server)
        .await;

    let result = api_for(&server).list(CancellationToken::new()).await;

    assert_eq!(
        result,
        Err(ApiError::Status {
            status: 404,
            body: json!({"error": "no such collection"}),
        })
    );
}

#[tokio::test]
async fn test_non_json_error_body_is_kept_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = api_for(&server).delete(PostId::new("1"), CancellationToken::new()).await;

    assert_eq!(
        result,
        Err(ApiError::Status {
            status: 500,
            body: Value::String("boom".to_string()),
        })
    );
}

#[tokio::test]
async fn test_delete_with_empty_body_has_no_payload() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = api_for(&server).delete(PostId::new("1"), CancellationToken::new()).await;

    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn test_delete_with_json_body_returns_it() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .mount(&server)
        .await;

    let result = api_for(&server).delete(PostId::new("1"), CancellationToken::new()).await;

    assert_eq!(result, Ok(Some(json!({"deleted": true}))));
}

#[tokio::test]
async fn test_cancel_while_waiting_for_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(1), api.list(cancel))
        .await
        .unwrap();

    assert_eq!(result, Err(ApiError::Cancelled));
}

#[tokio::test]
async fn test_undecodable_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = api_for(&server).list(CancellationToken::new()).await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
}
