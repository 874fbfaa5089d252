use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::User;

/// What a `Comment` is attached to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    /// A top-level note on the MR, not anchored to any file/line.
    General,
    /// Anchored to a single file and line (or a `[line, end_line]` range).
    Inline,
    /// A summary note posted alongside a whole review run.
    Review,
}

/// Review feedback, in the shape every provider's `create_comment` accepts.
///
/// `line`/`end_line` are 1-based positions on the new-file side. A ranged
/// comment has `end_line > line`; providers without native ranged discussions
/// still anchor at `line` and fold the range into the body text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: CommentType,
    pub body: String,
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub end_line: Option<u32>,
    pub position: Option<String>,
    pub author: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn general(body: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: CommentType::General,
            body: body.into(),
            file_path: None,
            line: None,
            end_line: None,
            position: None,
            author: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn inline(file_path: impl Into<String>, line: u32, body: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: CommentType::Inline,
            body: body.into(),
            file_path: Some(file_path.into()),
            line: Some(line),
            end_line: None,
            position: None,
            author: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn ranged(file_path: impl Into<String>, line: u32, end_line: u32, body: impl Into<String>) -> Self {
        Self {
            end_line: Some(end_line),
            ..Self::inline(file_path, line, body)
        }
    }

    /// `Comment.type = inline ⇒ file_path ≠ ∅ ∧ line > 0`.
    pub fn is_well_formed(&self) -> bool {
        if self.kind != CommentType::Inline {
            return true;
        }
        self.file_path.as_deref().is_some_and(|p| !p.is_empty()) && self.line.is_some_and(|l| l > 0)
    }

    /// Whether this comment spans more than one line.
    pub fn is_ranged(&self) -> bool {
        matches!((self.line, self.end_line), (Some(l), Some(e)) if e > l)
    }

    /// Deduplication key: stable across re-runs even if wording drifts,
    /// derived only from data already in hand.
    pub fn dedup_key(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.body.as_bytes());
        let body_hash = hex::encode(hasher.finalize());
        format!(
            "{}:{}:{}:{}",
            self.file_path.as_deref().unwrap_or(""),
            self.line.unwrap_or(0),
            self.end_line.unwrap_or(0),
            body_hash,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_comment_is_well_formed() {
        let c = Comment::inline("src/lib.rs", 42, "looks off");
        assert!(c.is_well_formed());
        assert!(!c.is_ranged());
    }

    #[test]
    fn inline_comment_without_path_is_malformed() {
        let mut c = Comment::inline("src/lib.rs", 42, "looks off");
        c.file_path = None;
        assert!(!c.is_well_formed());
    }

    #[test]
    fn ranged_comment_is_ranged_when_end_exceeds_start() {
        let c = Comment::ranged("src/lib.rs", 61, 65, "extract this");
        assert!(c.is_ranged());
    }

    #[test]
    fn dedup_key_is_stable_for_identical_inputs() {
        let a = Comment::inline("a.rs", 1, "same body");
        let b = Comment::inline("a.rs", 1, "same body");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_differs_on_body_change() {
        let a = Comment::inline("a.rs", 1, "body one");
        let b = Comment::inline("a.rs", 1, "body two");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
