use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::User;

/// Additions/deletions/files-touched summary for a single commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct CommitStats {
    pub additions: u32,
    pub deletions: u32,
    pub total_files: u32,
}

/// An incremental change unit. Immutable once retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub subject: String,
    pub body: Option<String>,
    pub author: User,
    pub committer: User,
    pub timestamp: DateTime<Utc>,
    pub stats: CommitStats,
    pub url: String,
}
