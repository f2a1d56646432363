//! Configuration loaded through a `.env` file
//!
//! Kept in its own test binary since it writes to the process environment.

#![allow(clippy::unwrap_used)] // Test code

use postsync_blog::{MissingTargetPolicy, PostsConfig};
use std::time::Duration;

#[test]
fn test_dotenv_file_feeds_from_env() {
    let path = std::env::temp_dir().join(format!("postsync-{}.env", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        "POSTS_MISSING_TARGET_POLICY=record\nPOSTS_API_TIMEOUT_SECS=3\n# comment\nPOSTS_BROADCAST_CAPACITY=8\n",
    )
    .unwrap();

    let loaded = dotenvy::from_path(&path);
    std::fs::remove_file(&path).unwrap();
    loaded.unwrap();

    let config = PostsConfig::from_env();
    assert_eq!(config.missing_target_policy, MissingTargetPolicy::Record);
    assert_eq!(config.api_timeout(), Duration::from_secs(3));
    assert_eq!(config.store_config().broadcast_capacity, 8);
    assert!(config.validate().is_ok());
}
