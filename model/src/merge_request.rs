use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Iid, ProjectId, User};

/// Lifecycle state of a merge/pull request as reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestState {
    Open,
    Merged,
    Closed,
    Declined,
}

impl MergeRequestState {
    /// Whether an automatic (non-`--force`) review may run against an MR in this state.
    pub fn accepts_automatic_review(self) -> bool {
        matches!(self, MergeRequestState::Open)
    }
}

/// The unit of review: a merge request (GitLab) or pull request (GitHub/Bitbucket).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: String,
    pub iid: Iid,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub head_sha: String,
    pub state: MergeRequestState,
    pub author: User,
    pub reviewers: Vec<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

impl MergeRequest {
    /// Whether `reviewer` is already listed among this MR's reviewers.
    pub fn has_reviewer(&self, username: &str) -> bool {
        self.reviewers.iter().any(|r| r.username == username)
    }
}
