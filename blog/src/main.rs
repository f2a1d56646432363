//! Posts demo binary
//!
//! Runs list, create, delete and update against a scripted in-memory service,
//! or against a real service with `--remote` (configured through
//! `POSTS_API_BASE_URL` and friends).

use anyhow::Context;
use postsync_blog::{
    ApiError, HttpPostsApi, OperationOutcome, Post, PostDraft, PostId, PostsApi, PostsConfig,
    PostsEnvironment, PostsStore, Reply, ScriptedPostsApi,
};
use postsync_core::environment::SystemClock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postsync_blog=debug,postsync_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PostsConfig::from_env();
    config.validate().context("invalid posts configuration")?;

    let remote = std::env::args().any(|arg| arg == "--remote");
    let api: Arc<dyn PostsApi> = if remote {
        tracing::info!(base_url = %config.api_base_url, "Using remote posts service");
        Arc::new(HttpPostsApi::from_config(&config)?)
    } else {
        tracing::info!("Using scripted posts service");
        Arc::new(scripted_service())
    };

    let env = PostsEnvironment::new(api, Arc::new(SystemClock))
        .with_missing_target_policy(config.missing_target_policy);
    let store = PostsStore::with_config(env, config.store_config());

    println!("=== Posts Example ===\n");

    println!(">>> List");
    let outcome = store.trigger_list().await?.outcome().await?;
    report(&store, &outcome).await;

    println!("\n>>> Create \"B\"");
    let outcome = store.trigger_create(PostDraft::titled("B")).await?.outcome().await?;
    report(&store, &outcome).await;

    println!("\n>>> Delete 1");
    let outcome = store.trigger_delete(PostId::new("1")).await?.outcome().await?;
    report(&store, &outcome).await;

    println!("\n>>> Update 2 with title \"B2\"");
    store.begin_edit(PostId::new("2")).await?;
    let outcome = store
        .trigger_update(PostId::new("2"), PostDraft::titled("B2"))
        .await?
        .outcome()
        .await?;
    report(&store, &outcome).await;
    store.cancel_edit().await?;

    println!("\n>>> List, aborted before it answers");
    let list = store.trigger_list().await?;
    list.abort().await?;
    let outcome = list.outcome().await?;
    report(&store, &outcome).await;

    store
        .shutdown_default()
        .await
        .context("posts store did not shut down cleanly")?;

    println!("\n=== Done ===");
    Ok(())
}

fn scripted_service() -> ScriptedPostsApi {
    let api = ScriptedPostsApi::new();
    api.push_list(Reply::ok(vec![Post::new("1", "A")]).after(Duration::from_millis(50)))
        .push_create(Reply::ok(Post::new("2", "B")).after(Duration::from_millis(20)))
        .push_delete(Reply::ok(Some(json!({}))))
        .push_update(Reply::err(ApiError::Validation {
            status: 422,
            body: json!({"title": ["too short"]}),
        }))
        .push_list(Reply::ok(Vec::new()).after(Duration::from_secs(5)));
    api
}

async fn report(store: &PostsStore, outcome: &OperationOutcome) {
    match outcome {
        OperationOutcome::Completed(completion) => println!("Completed: {completion:?}"),
        OperationOutcome::Rejected(errors) => println!("Rejected: {:?}", errors.fields),
        OperationOutcome::Cancelled => println!("Cancelled"),
    }

    let view = store.snapshot().await;
    let titles: Vec<_> = view.posts.iter().map(|p| format!("{}:{}", p.id, p.title)).collect();
    println!("Posts: [{}]  loading: {}", titles.join(", "), view.loading);
}
