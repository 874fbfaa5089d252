use serde::{Deserialize, Serialize};

use crate::{MergeRequest, ProjectId, User};

/// Coarse classification of a normalized webhook event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodeEventType {
    MergeRequest,
    Comment,
    Push,
}

/// Normalized action, vendor action strings folded onto a shared vocabulary.
/// GitLab `{open,reopen,update}`, GitHub `{opened,reopened,synchronize,
/// review_requested,ready_for_review}` and Bitbucket `{opened,updated,
/// created,reviewer_added}` all map onto one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodeEventAction {
    Opened,
    Reopened,
    Updated,
    ReviewerAdded,
    ReadyForReview,
    Other,
}

/// Present on comment-triggered events; carries enough of the triggering
/// comment to let the pipeline decide relevance without a second fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRef {
    pub id: String,
    pub body: String,
    pub author: User,
    pub file_path: Option<String>,
    pub line: Option<u32>,
}

/// A webhook payload normalized to the provider-agnostic shape the pipeline
/// consumes. Short-lived: built from a payload, inspected, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEvent {
    #[serde(rename = "type")]
    pub kind: CodeEventType,
    pub action: CodeEventAction,
    pub project_id: ProjectId,
    pub user: User,
    pub merge_request: MergeRequest,
    pub comment_ref: Option<CommentRef>,
}
