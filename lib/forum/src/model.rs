//! Wire types for forum posts and comments.
//!
//! A comment is a post with a `parent_id`; the API uses one entity for both.
//! Ordering and `reply_count` are supplied by the server and are
//! authoritative — nothing here re-sorts lists or counts children locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Post/comment identifier assigned by the API.
///
/// Wraps `String` so ids can't be mixed up with other string fields.
/// Serde serializes/deserializes as a plain string (transparent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub String);

impl Id {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Id {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self(String::new())
    }
}

/// Author of a post or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Sender {
    /// Display name as rendered in thread rows.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A post or comment as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id,
    /// Absent on top-level posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    /// May be empty when an attachment is present.
    pub content: String,
    /// URL of an attached image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// URL of an attached file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Number of direct children, per the server. Never derived locally —
    /// children may not be fetched yet.
    pub reply_count: u32,
    pub created_at: String,
    pub sender: Sender,
}

impl Comment {
    /// Whether a "view N replies" affordance applies to this comment.
    pub fn has_replies(&self) -> bool {
        self.reply_count > 0
    }
}

/// An attachment staged for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Size in bytes, as checked against the upload limits.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Request body for creating a comment under a parent.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub parent_id: Id,
    pub forum_id: Id,
    pub content: String,
    pub image: Option<Attachment>,
    pub file: Option<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_and_deref() {
        let id = Id::new("42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(&*id, "42");
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn comment_round_trips_camel_case() {
        let json = r#"{
            "id": "7",
            "parentId": "3",
            "content": "hello",
            "replyCount": 2,
            "createdAt": "2025-11-02T10:00:00Z",
            "sender": {"id": "u1", "firstName": "Ada", "lastName": "Byron"}
        }"#;
        let c: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(c.id.as_str(), "7");
        assert_eq!(c.parent_id.as_deref(), Some("3"));
        assert_eq!(c.reply_count, 2);
        assert_eq!(c.sender.display_name(), "Ada Byron");
        assert!(c.image.is_none());

        let back = serde_json::to_string(&c).unwrap();
        assert!(back.contains("\"parentId\":\"3\""));
        assert!(back.contains("\"replyCount\":2"));
        // Absent attachments are omitted, not null.
        assert!(!back.contains("image"));
    }

    #[test]
    fn top_level_post_has_no_parent() {
        let json = r#"{
            "id": "1",
            "content": "welcome",
            "replyCount": 0,
            "createdAt": "2025-11-02T10:00:00Z",
            "sender": {"id": "u1", "firstName": "Ada", "lastName": "Byron", "avatar": "https://cdn/a.png"}
        }"#;
        let c: Comment = serde_json::from_str(json).unwrap();
        assert!(c.parent_id.is_none());
        assert!(!c.has_replies());
        assert_eq!(c.sender.avatar.as_deref(), Some("https://cdn/a.png"));
    }

    #[test]
    fn attachment_len() {
        let a = Attachment::new("x.png", "image/png", vec![0u8; 1024]);
        assert_eq!(a.len(), 1024);
        assert!(!a.is_empty());
    }
}
