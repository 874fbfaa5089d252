//! Provider facade without async-trait or dynamic trait objects.
//!
//! `ProviderClient` wraps one of the three concrete implementations and
//! dispatches every capability-surface call to the matched variant. Callers
//! never need to know which vendor they're talking to beyond construction.

use chrono::{DateTime, Utc};
use tracing::debug;

use reviewbot_model::{Comment, Commit, FileDiff, MergeRequest, RepositorySnapshot};

use crate::bitbucket::BitbucketClient;
use crate::errors::ProviderError;
use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::types::{MergeRequestFilter, ProviderConfig, ProviderKind};

#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitLab(GitLabClient),
    GitHub(GitHubClient),
    Bitbucket(BitbucketClient),
}

impl ProviderClient {
    /// Builds a concrete client from configuration, sharing one `reqwest`
    /// client across vendors with a stable user agent.
    pub fn from_config(cfg: ProviderConfig) -> Result<Self, ProviderError> {
        debug!(kind = cfg.kind.label(), base_api = %cfg.base_api, "initializing provider client");

        let http = reqwest::Client::builder()
            .user_agent("reviewbot/0.1")
            .build()
            .map_err(crate::errors::transport(cfg.kind.label()))?;

        Ok(match cfg.kind {
            ProviderKind::GitLab => ProviderClient::GitLab(GitLabClient::new(http, cfg.base_api, cfg.token)),
            ProviderKind::GitHub => ProviderClient::GitHub(GitHubClient::new(http, cfg.base_api, cfg.token)),
            ProviderKind::Bitbucket => {
                ProviderClient::Bitbucket(BitbucketClient::new(http, cfg.base_api, cfg.token))
            }
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitLab(_) => ProviderKind::GitLab,
            Self::GitHub(_) => ProviderKind::GitHub,
            Self::Bitbucket(_) => ProviderKind::Bitbucket,
        }
    }

    pub async fn get_merge_request(&self, project_id: &str, iid: u64) -> Result<MergeRequest, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_merge_request(project_id, iid).await,
            Self::GitHub(c) => c.get_merge_request(project_id, iid).await,
            Self::Bitbucket(c) => c.get_merge_request(project_id, iid).await,
        }
    }

    /// Fetches per-file diffs. On GitLab, falls back to splitting the raw
    /// combined diff when the structured `/diffs` endpoint comes back empty
    /// for a changeset the merge request metadata says isn't empty — GitLab
    /// truncates `/diffs` beyond its configured size limits.
    pub async fn get_merge_request_diffs(&self, project_id: &str, iid: u64) -> Result<Vec<FileDiff>, ProviderError> {
        match self {
            Self::GitLab(c) => {
                let files = c.get_merge_request_diffs(project_id, iid).await?;
                if files.is_empty() {
                    c.enrich_diffs_from_raw(project_id, iid).await
                } else {
                    Ok(files)
                }
            }
            Self::GitHub(c) => c.get_merge_request_diffs(project_id, iid).await,
            Self::Bitbucket(c) => c.get_merge_request_diffs(project_id, iid).await,
        }
    }

    pub async fn get_merge_request_commits(&self, project_id: &str, iid: u64) -> Result<Vec<Commit>, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_merge_request_commits(project_id, iid).await,
            Self::GitHub(c) => c.get_merge_request_commits(project_id, iid).await,
            Self::Bitbucket(c) => c.get_merge_request_commits(project_id, iid).await,
        }
    }

    pub async fn get_commit_details(&self, project_id: &str, sha: &str) -> Result<Commit, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_commit_details(project_id, sha).await,
            Self::GitHub(c) => c.get_commit_details(project_id, sha).await,
            Self::Bitbucket(c) => c.get_commit_details(project_id, sha).await,
        }
    }

    pub async fn get_commit_diffs(&self, project_id: &str, sha: &str) -> Result<Vec<FileDiff>, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_commit_diffs(project_id, sha).await,
            Self::GitHub(c) => c.get_commit_diffs(project_id, sha).await,
            Self::Bitbucket(c) => c.get_commit_diffs(project_id, sha).await,
        }
    }

    pub async fn get_file_content(&self, project_id: &str, path: &str, sha: &str) -> Result<Option<String>, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_file_content(project_id, path, sha).await,
            Self::GitHub(c) => c.get_file_content(project_id, path, sha).await,
            Self::Bitbucket(c) => c.get_file_content(project_id, path, sha).await,
        }
    }

    pub async fn get_repository_snapshot(&self, project_id: &str, sha: &str) -> Result<RepositorySnapshot, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_repository_snapshot(project_id, sha).await,
            Self::GitHub(c) => c.get_repository_snapshot(project_id, sha).await,
            Self::Bitbucket(c) => c.get_repository_snapshot(project_id, sha).await,
        }
    }

    pub async fn list_merge_requests(
        &self,
        project_id: &str,
        filter: &MergeRequestFilter,
    ) -> Result<Vec<MergeRequest>, ProviderError> {
        match self {
            Self::GitLab(c) => c.list_merge_requests(project_id, filter).await,
            Self::GitHub(c) => c.list_merge_requests(project_id, filter).await,
            Self::Bitbucket(c) => c.list_merge_requests(project_id, filter).await,
        }
    }

    pub async fn get_merge_request_updates(
        &self,
        project_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MergeRequest>, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_merge_request_updates(project_id, since).await,
            Self::GitHub(c) => c.get_merge_request_updates(project_id, since).await,
            Self::Bitbucket(c) => c.get_merge_request_updates(project_id, since).await,
        }
    }

    pub async fn get_comments(&self, project_id: &str, iid: u64) -> Result<Vec<Comment>, ProviderError> {
        match self {
            Self::GitLab(c) => c.get_comments(project_id, iid).await,
            Self::GitHub(c) => c.get_comments(project_id, iid).await,
            Self::Bitbucket(c) => c.get_comments(project_id, iid).await,
        }
    }

    pub async fn create_comment(&self, project_id: &str, iid: u64, comment: &Comment) -> Result<Comment, ProviderError> {
        if !comment.is_well_formed() {
            return Err(ProviderError::BadRequest {
                vendor: self.kind().label(),
                detail: "inline comment missing file_path or line".to_string(),
            });
        }
        match self {
            Self::GitLab(c) => c.create_comment(project_id, iid, comment).await,
            Self::GitHub(c) => c.create_comment(project_id, iid, comment).await,
            Self::Bitbucket(c) => c.create_comment(project_id, iid, comment).await,
        }
    }

    pub async fn update_comment(&self, project_id: &str, iid: u64, comment_id: &str, body: &str) -> Result<(), ProviderError> {
        match self {
            Self::GitLab(c) => c.update_comment(project_id, iid, comment_id, body).await,
            Self::GitHub(c) => c.update_comment(project_id, iid, comment_id, body).await,
            Self::Bitbucket(c) => c.update_comment(project_id, iid, comment_id, body).await,
        }
    }

    pub async fn update_merge_request_description(
        &self,
        project_id: &str,
        iid: u64,
        description: &str,
    ) -> Result<(), ProviderError> {
        match self {
            Self::GitLab(c) => c.update_merge_request_description(project_id, iid, description).await,
            Self::GitHub(c) => c.update_merge_request_description(project_id, iid, description).await,
            Self::Bitbucket(c) => c.update_merge_request_description(project_id, iid, description).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_builds_matching_variant() {
        let cfg = ProviderConfig {
            kind: ProviderKind::GitHub,
            base_api: "https://api.github.com".to_string(),
            token: "Bearer x".to_string(),
            webhook_secret: None,
            bot_username: "reviewbot".to_string(),
        };
        let client = ProviderClient::from_config(cfg).unwrap();
        assert_eq!(client.kind(), ProviderKind::GitHub);
    }
}
