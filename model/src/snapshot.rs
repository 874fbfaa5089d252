use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file's content as seen in a `RepositorySnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryFile {
    pub path: String,
    pub content: String,
    pub size: u64,
    pub is_binary: bool,
}

/// A read-only view of the file tree at a specific SHA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub sha: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<RepositoryFile>,
}

impl RepositorySnapshot {
    pub fn find(&self, path: &str) -> Option<&RepositoryFile> {
        self.files.iter().find(|f| f.path == path)
    }
}
