//! Deduplicates freshly-built comments against what's already posted.
//!
//! Matches by `(file_path, line, end_line, sha256(body))` via
//! `Comment::dedup_key`; an identical comment at the same anchor is skipped,
//! a changed body at an already-commented anchor is updated in place, and
//! anything new is created.

use reviewbot_model::Comment;

#[derive(Debug)]
pub enum CommentAction {
    Create(Comment),
    Update { comment_id: String, body: String },
    Skip,
}

fn anchor_key(c: &Comment) -> (String, u32, u32) {
    (c.file_path.clone().unwrap_or_default(), c.line.unwrap_or(0), c.end_line.unwrap_or(0))
}

pub fn plan_comment_actions(existing: &[Comment], candidates: Vec<Comment>) -> Vec<CommentAction> {
    candidates
        .into_iter()
        .map(|candidate| {
            if existing.iter().any(|e| e.dedup_key() == candidate.dedup_key()) {
                return CommentAction::Skip;
            }
            let anchor = anchor_key(&candidate);
            match existing.iter().find(|e| anchor_key(e) == anchor).and_then(|e| e.id.clone()) {
                Some(comment_id) => CommentAction::Update { comment_id, body: candidate.body },
                None => CommentAction::Create(candidate),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(id: &str, path: &str, line: u32, body: &str) -> Comment {
        Comment {
            id: Some(id.to_string()),
            ..Comment::inline(path, line, body)
        }
    }

    #[test]
    fn identical_anchor_and_body_is_skipped() {
        let existing = vec![existing("1", "a.rs", 10, "same")];
        let candidate = Comment::inline("a.rs", 10, "same");
        let actions = plan_comment_actions(&existing, vec![candidate]);
        assert!(matches!(actions[0], CommentAction::Skip));
    }

    #[test]
    fn same_anchor_different_body_updates_in_place() {
        let existing = vec![existing("1", "a.rs", 10, "old body")];
        let candidate = Comment::inline("a.rs", 10, "new body");
        let actions = plan_comment_actions(&existing, vec![candidate]);
        match &actions[0] {
            CommentAction::Update { comment_id, body } => {
                assert_eq!(comment_id, "1");
                assert_eq!(body, "new body");
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn new_anchor_is_created() {
        let existing = vec![existing("1", "a.rs", 10, "old body")];
        let candidate = Comment::inline("a.rs", 20, "new body");
        let actions = plan_comment_actions(&existing, vec![candidate]);
        assert!(matches!(actions[0], CommentAction::Create(_)));
    }
}
