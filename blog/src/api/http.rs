//! JSON-over-HTTP implementation of [`PostsApi`].
//!
//! Routes, relative to the base URL:
//!
//! | call     | request              |
//! |----------|----------------------|
//! | `list`   | `GET posts`          |
//! | `create` | `POST posts`         |
//! | `update` | `PUT posts/{id}`     |
//! | `delete` | `DELETE posts/{id}`  |
//!
//! A 422 answer becomes [`ApiError::Validation`]; any other non-success
//! status becomes [`ApiError::Status`].

use super::{ApiError, ApiFuture, PostsApi};
use crate::config::{ConfigError, PostsConfig};
use crate::types::{Post, PostDraft, PostId, ValidationErrors};
use postsync_core::CancellationToken;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// [`PostsApi`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPostsApi {
    client: Client,
    base_url: Url,
}

impl HttpPostsApi {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL does not parse or the client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        // Without a trailing slash `join` would replace the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Create a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpPostsApi::new`].
    pub fn from_config(config: &PostsConfig) -> Result<Self, ConfigError> {
        Self::new(&config.api_base_url, config.api_timeout())
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("invalid request path {path:?}: {e}")))
    }

    fn post_url(&self, id: &PostId) -> Result<Url, ApiError> {
        let mut url = self.url("posts/")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    /// Send `request` and turn non-success statuses into errors.
    async fn execute(request: RequestBuilder, cancel: &CancellationToken) -> Result<Response, ApiError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            sent = request.send() => sent.map_err(|e| ApiError::Transport(e.to_string()))?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            text = response.text() => text.unwrap_or_default(),
        };
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        tracing::debug!(status = status.as_u16(), "Posts service answered with an error status");

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            Err(ApiError::Validation {
                status: ValidationErrors::STATUS,
                body,
            })
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn json<T: DeserializeOwned>(response: Response, cancel: &CancellationToken) -> Result<T, ApiError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ApiError::Cancelled),
            decoded = response.json::<T>() => decoded.map_err(|e| ApiError::Decode(e.to_string())),
        }
    }
}

impl PostsApi for HttpPostsApi {
    fn list(&self, cancel: CancellationToken) -> ApiFuture<'_, Vec<Post>> {
        Box::pin(async move {
            let request = self.client.get(self.url("posts")?);
            let response = Self::execute(request, &cancel).await?;
            Self::json(response, &cancel).await
        })
    }

    fn create(&self, draft: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post> {
        Box::pin(async move {
            let request = self.client.post(self.url("posts")?).json(&draft);
            let response = Self::execute(request, &cancel).await?;
            Self::json(response, &cancel).await
        })
    }

    fn update(&self, id: PostId, body: PostDraft, cancel: CancellationToken) -> ApiFuture<'_, Post> {
        Box::pin(async move {
            let request = self.client.put(self.post_url(&id)?).json(&body);
            let response = Self::execute(request, &cancel).await?;
            Self::json(response, &cancel).await
        })
    }

    fn delete(&self, id: PostId, cancel: CancellationToken) -> ApiFuture<'_, Option<Value>> {
        Box::pin(async move {
            let request = self.client.delete(self.post_url(&id)?);
            let response = Self::execute(request, &cancel).await?;

            let bytes = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ApiError::Cancelled),
                bytes = response.bytes() => bytes.map_err(|e| ApiError::Transport(e.to_string()))?,
            };
            if bytes.is_empty() {
                return Ok(None);
            }
            serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| ApiError::Decode(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)] // Test code
    fn routes_are_relative_to_the_base_path() {
        let api = HttpPostsApi::new("http://localhost:4000/api", Duration::from_secs(1)).unwrap();

        assert_eq!(api.url("posts").unwrap().as_str(), "http://localhost:4000/api/posts");
        assert_eq!(
            api.post_url(&PostId::new("42")).unwrap().as_str(),
            "http://localhost:4000/api/posts/42"
        );
        // Ids are path-encoded
        assert_eq!(
            api.post_url(&PostId::new("a/b")).unwrap().as_str(),
            "http://localhost:4000/api/posts/a%2Fb"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            HttpPostsApi::new("::nope", Duration::from_secs(1)),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)] // Test code
    async fn cancelled_token_short_circuits_the_request() {
        let api = HttpPostsApi::new("http://127.0.0.1:9/", Duration::from_secs(5)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = api.list(cancel).await;
        assert_eq!(result, Err(ApiError::Cancelled));
    }
}
