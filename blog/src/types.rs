//! Domain types for blog posts.

use postsync_core::EffectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identity of a post, assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    /// Create a post id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A blog post as stored by the remote service.
///
/// Fields the service sends that are not modelled here are kept in `extra`
/// and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Server-assigned identity
    pub id: PostId,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Body text
    #[serde(default)]
    pub description: String,
    /// Publication date as sent by the service
    #[serde(default)]
    pub publish_date: String,
    /// Cover image URL
    #[serde(default)]
    pub featured_image: String,
    /// Whether the post is visible to readers
    #[serde(default)]
    pub published: bool,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    /// A post with the given id and title and every other field empty.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::from_draft(PostId::new(id), PostDraft::titled(title))
    }

    /// Attach an identity to a draft.
    #[must_use]
    pub fn from_draft(id: PostId, draft: PostDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            publish_date: draft.publish_date,
            featured_image: draft.featured_image,
            published: draft.published,
            extra: draft.extra,
        }
    }
}

/// Post payload without an id, sent on create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Body text
    #[serde(default)]
    pub description: String,
    /// Publication date
    #[serde(default)]
    pub publish_date: String,
    /// Cover image URL
    #[serde(default)]
    pub featured_image: String,
    /// Whether the post is visible to readers
    #[serde(default)]
    pub published: bool,
    /// Unmodelled fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostDraft {
    /// A draft with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Identifier of one operation invocation.
///
/// Fresh for every trigger; used to tell the operation that owns the loading
/// indicator apart from superseded ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RequestId> for EffectId {
    fn from(id: RequestId) -> Self {
        EffectId::new(format!("posts/{id}"))
    }
}

/// Field-level validation failures reported by the service (HTTP 422).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    /// Status code the service answered with
    pub status: u16,
    /// Messages per field
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Status code used by the service to signal validation failure.
    pub const STATUS: u16 = 422;

    /// Build from a validation response body.
    ///
    /// Accepts a field map at the top level or nested under `error` or
    /// `errors`. A field may carry a single message or a list of them. A body
    /// of any other shape is kept under the empty field name.
    #[must_use]
    pub fn from_body(status: u16, body: &Value) -> Self {
        let map = body
            .get("errors")
            .or_else(|| body.get("error"))
            .and_then(Value::as_object)
            .or_else(|| body.as_object());

        let fields = match map {
            Some(map) => map
                .iter()
                .map(|(field, messages)| (field.clone(), messages_of(messages)))
                .collect(),
            None => BTreeMap::from([(String::new(), messages_of(body))]),
        };

        Self { status, fields }
    }

    /// Single-field helper, mostly for tests and scripted services.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Self::STATUS,
            fields: BTreeMap::from([(field.into(), vec![message.into()])]),
        }
    }

    /// Messages reported for `field`.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[][..], Vec::as_slice)
    }
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
