//! GitHub provider (REST v3).
//!
//! Endpoints used:
//! - GET  /repos/:owner/:repo/pulls/:number
//! - GET  /repos/:owner/:repo/pulls/:number/commits
//! - GET  /repos/:owner/:repo/pulls/:number/files
//! - GET  /repos/:owner/:repo/commits/:sha
//! - GET  /repos/:owner/:repo/contents/:path?ref=:sha
//! - GET  /repos/:owner/:repo/git/trees/:sha?recursive=1
//! - GET  /repos/:owner/:repo/pulls?state=...
//! - GET  /repos/:owner/:repo/pulls/:number/comments
//! - POST /repos/:owner/:repo/pulls/:number/comments
//! - PATCH /repos/:owner/:repo/pulls/:number/comments/:id
//! - PATCH /repos/:owner/:repo/pulls/:number

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reviewbot_model::{
    CodeEvent, CodeEventAction, CodeEventType, Comment, CommentType, Commit, CommitStats, FileDiff,
    MergeRequest, MergeRequestState, RepositoryFile, RepositorySnapshot, User,
};

use crate::errors::{map_status, transport, ProviderError};
use crate::types::{MergeRequestFilter, PAGE_CAP};

const VENDOR: &str = "github";

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: String,
}

impl GitHubClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    fn split_owner_repo(project_id: &str) -> Result<(&str, &str), ProviderError> {
        let mut parts = project_id.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(o), Some(r)) if !o.is_empty() && !r.is_empty() => Ok((o, r)),
            _ => Err(ProviderError::InvalidProjectId(project_id.to_string())),
        }
    }

    pub async fn get_merge_request(&self, project_id: &str, iid: u64) -> Result<MergeRequest, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/pulls/{}", self.base_api, owner, repo, iid);
        let resp: GitHubPr = self.get_json(&url).await?;
        Ok(merge_request_from(project_id, iid, resp))
    }

    pub async fn get_merge_request_diffs(&self, project_id: &str, iid: u64) -> Result<Vec<FileDiff>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let mut out = Vec::new();
        for page in 1..=PAGE_CAP {
            let url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page=100&page={}",
                self.base_api, owner, repo, iid, page
            );
            let files: Vec<GitHubFile> = self.get_json(&url).await?;
            let got = files.len();
            out.extend(files.into_iter().map(file_diff_from));
            if got < 100 {
                break;
            }
        }
        Ok(out)
    }

    pub async fn get_merge_request_commits(&self, project_id: &str, iid: u64) -> Result<Vec<Commit>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/pulls/{}/commits?per_page=100", self.base_api, owner, repo, iid);
        let raw: Vec<GitHubPrCommit> = self.get_json(&url).await?;
        Ok(raw.into_iter().map(commit_from).collect())
    }

    pub async fn get_commit_details(&self, project_id: &str, sha: &str) -> Result<Commit, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/commits/{}", self.base_api, owner, repo, sha);
        let raw: GitHubCommitDetail = self.get_json(&url).await?;
        Ok(Commit {
            sha: raw.sha,
            subject: raw.commit.message.lines().next().unwrap_or("").to_string(),
            body: Some(raw.commit.message),
            author: User::new(String::new(), String::new(), raw.commit.author.as_ref().map(|a| a.name.clone()).unwrap_or_default()),
            committer: User::new(String::new(), String::new(), raw.commit.author.as_ref().map(|a| a.name.clone()).unwrap_or_default()),
            timestamp: raw.commit.author.map(|a| a.date).unwrap_or_default(),
            stats: CommitStats {
                additions: raw.stats.as_ref().map(|s| s.additions).unwrap_or(0),
                deletions: raw.stats.as_ref().map(|s| s.deletions).unwrap_or(0),
                total_files: raw.files.as_ref().map(|f| f.len() as u32).unwrap_or(0),
            },
            url: raw.html_url,
        })
    }

    pub async fn get_commit_diffs(&self, project_id: &str, sha: &str) -> Result<Vec<FileDiff>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/commits/{}", self.base_api, owner, repo, sha);
        let raw: GitHubCommitDetail = self.get_json(&url).await?;
        Ok(raw.files.unwrap_or_default().into_iter().map(file_diff_from).collect())
    }

    pub async fn get_file_content(&self, project_id: &str, path: &str, sha: &str) -> Result<Option<String>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/contents/{}?ref={}", self.base_api, owner, repo, path, sha);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3.raw")
            .send()
            .await
            .map_err(transport(VENDOR))?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(VENDOR, status, body));
        }
        resp.text().await.map(Some).map_err(transport(VENDOR))
    }

    pub async fn get_repository_snapshot(&self, project_id: &str, sha: &str) -> Result<RepositorySnapshot, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/git/trees/{}?recursive=1", self.base_api, owner, repo, sha);
        let tree: GitHubTree = self.get_json(&url).await?;

        let mut files = Vec::new();
        for entry in tree.tree.into_iter().filter(|e| e.entry_type == "blob") {
            let content = self.get_file_content(project_id, &entry.path, sha).await?;
            let (content, is_binary) = match content {
                Some(c) => (c, false),
                None => (String::new(), true),
            };
            files.push(RepositoryFile {
                size: entry.size.unwrap_or(content.len() as u64),
                path: entry.path,
                content,
                is_binary,
            });
        }

        Ok(RepositorySnapshot {
            sha: sha.to_string(),
            timestamp: Utc::now(),
            files,
        })
    }

    pub async fn list_merge_requests(&self, project_id: &str, filter: &MergeRequestFilter) -> Result<Vec<MergeRequest>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let state = filter.state.map(state_query).unwrap_or("open");
        let mut out = Vec::new();
        for page in 1..=PAGE_CAP {
            let mut url = format!(
                "{}/repos/{}/{}/pulls?state={}&per_page=100&page={}",
                self.base_api, owner, repo, state, page
            );
            if let Some(branch) = &filter.target_branch {
                url.push_str(&format!("&base={}", urlencoding::encode(branch)));
            }
            let raw: Vec<GitHubPr> = self.get_json(&url).await?;
            let got = raw.len();
            out.extend(raw.into_iter().map(|pr| {
                let number = pr.number;
                merge_request_from(project_id, number, pr)
            }));
            if got < 100 {
                break;
            }
        }
        if let Some(author) = &filter.author {
            out.retain(|mr| &mr.author.username == author);
        }
        Ok(out)
    }

    pub async fn get_merge_request_updates(&self, project_id: &str, since: DateTime<Utc>) -> Result<Vec<MergeRequest>, ProviderError> {
        let all = self
            .list_merge_requests(project_id, &MergeRequestFilter { state: None, ..Default::default() })
            .await?;
        Ok(all.into_iter().filter(|mr| mr.updated_at >= since).collect())
    }

    pub async fn get_comments(&self, project_id: &str, iid: u64) -> Result<Vec<Comment>, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/pulls/{}/comments?per_page=100", self.base_api, owner, repo, iid);
        let raw: Vec<GitHubReviewComment> = self.get_json(&url).await?;
        Ok(raw.into_iter().map(comment_from).collect())
    }

    /// Ranged comments use GitHub's native `start_line`+`line` with `side=RIGHT`.
    pub async fn create_comment(&self, project_id: &str, iid: u64, comment: &Comment) -> Result<Comment, ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        match (&comment.file_path, comment.line) {
            (Some(path), Some(start)) => {
                let pr = self.get_merge_request(project_id, iid).await?;
                let url = format!("{}/repos/{}/{}/pulls/{}/comments", self.base_api, owner, repo, iid);
                // GitHub wants `line` as the last line of the range and
                // `start_line` as the first; only set `start_line` when the
                // comment actually spans more than one line.
                let end = comment.end_line.filter(|end| *end > start);
                let payload = GitHubCommentCreate {
                    body: &comment.body,
                    commit_id: &pr.head_sha,
                    path,
                    line: end.unwrap_or(start),
                    start_line: end.map(|_| start),
                    side: "RIGHT",
                };
                let created: GitHubReviewComment = self.post_json(&url, &payload).await?;
                Ok(Comment {
                    id: Some(created.id.to_string()),
                    ..comment.clone()
                })
            }
            _ => {
                let url = format!("{}/repos/{}/{}/issues/{}/comments", self.base_api, owner, repo, iid);
                let created: GitHubIssueComment = self.post_json(&url, &IssueCommentCreate { body: &comment.body }).await?;
                Ok(Comment {
                    id: Some(created.id.to_string()),
                    ..comment.clone()
                })
            }
        }
    }

    pub async fn update_comment(&self, project_id: &str, iid: u64, comment_id: &str, body: &str) -> Result<(), ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/pulls/comments/{}", self.base_api, owner, repo, comment_id);
        let _ = iid;
        self.patch_json(&url, &NoteUpdate { body }).await
    }

    pub async fn update_merge_request_description(&self, project_id: &str, iid: u64, description: &str) -> Result<(), ProviderError> {
        let (owner, repo) = Self::split_owner_repo(project_id)?;
        let url = format!("{}/repos/{}/{}/pulls/{}", self.base_api, owner, repo, iid);
        self.patch_json(&url, &PrUpdate { body: description }).await
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(%url, "GitHub GET");
        let resp = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(transport(VENDOR))?;
        self.decode(resp).await
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, ProviderError> {
        let resp = self
            .http
            .post(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .json(body)
            .send()
            .await
            .map_err(transport(VENDOR))?;
        self.decode(resp).await
    }

    async fn patch_json<B: Serialize>(&self, url: &str, body: &B) -> Result<(), ProviderError> {
        let resp = self
            .http
            .patch(url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/vnd.github+json")
            .json(body)
            .send()
            .await
            .map_err(transport(VENDOR))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(VENDOR, status, body));
        }
        Ok(())
    }

    async fn decode<T: serde::de::DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, ProviderError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(VENDOR, status, body));
        }
        resp.json().await.map_err(|e| ProviderError::ParseError {
            vendor: VENDOR,
            reason: e.to_string(),
        })
    }
}

fn state_query(state: MergeRequestState) -> &'static str {
    match state {
        MergeRequestState::Open => "open",
        _ => "closed",
    }
}

fn state_from(s: &str, merged: bool) -> MergeRequestState {
    if merged {
        MergeRequestState::Merged
    } else if s == "closed" {
        MergeRequestState::Closed
    } else {
        MergeRequestState::Open
    }
}

fn merge_request_from(project_id: &str, number: u64, pr: GitHubPr) -> MergeRequest {
    MergeRequest {
        id: pr.id.to_string(),
        iid: number,
        project_id: project_id.to_string(),
        title: pr.title,
        description: pr.body,
        source_branch: pr.head.r#ref,
        target_branch: pr.base.r#ref,
        head_sha: pr.head.sha,
        state: state_from(&pr.state, pr.merged_at.is_some()),
        author: User {
            id: pr.user.id.to_string(),
            username: pr.user.login.clone(),
            name: pr.user.login,
            email: None,
        },
        reviewers: pr
            .requested_reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| User {
                id: u.id.to_string(),
                username: u.login.clone(),
                name: u.login,
                email: None,
            })
            .collect(),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        url: pr.html_url,
    }
}

fn file_diff_from(f: GitHubFile) -> FileDiff {
    let is_binary = f.patch.is_none();
    let (old_path, new_path, is_new, is_deleted, is_renamed) = match f.status.as_str() {
        "added" => (None, Some(f.filename.clone()), true, false, false),
        "removed" => (Some(f.filename.clone()), None, false, true, false),
        "renamed" => (f.previous_filename.clone(), Some(f.filename.clone()), false, false, true),
        _ => (Some(f.filename.clone()), Some(f.filename), false, false, false),
    };
    FileDiff {
        old_path,
        new_path,
        diff: f.patch.unwrap_or_default(),
        is_new,
        is_deleted,
        is_renamed,
        is_binary,
    }
}

fn commit_from(c: GitHubPrCommit) -> Commit {
    Commit {
        sha: c.sha,
        subject: c.commit.message.lines().next().unwrap_or("").to_string(),
        body: Some(c.commit.message),
        author: User::new(String::new(), String::new(), c.commit.author.as_ref().map(|a| a.name.clone()).unwrap_or_default()),
        committer: User::new(String::new(), String::new(), c.commit.author.as_ref().map(|a| a.name.clone()).unwrap_or_default()),
        timestamp: c.commit.author.map(|a| a.date).unwrap_or_default(),
        stats: CommitStats::default(),
        url: c.html_url,
    }
}

fn comment_from(c: GitHubReviewComment) -> Comment {
    Comment {
        id: Some(c.id.to_string()),
        kind: CommentType::Inline,
        body: c.body,
        file_path: Some(c.path),
        line: c.line,
        end_line: c.start_line,
        position: None,
        author: c.user.map(|u| User {
            id: u.id.to_string(),
            username: u.login.clone(),
            name: u.login,
            email: None,
        }),
        created_at: Some(c.created_at),
        updated_at: c.updated_at,
    }
}

/// Parses a GitHub `pull_request` webhook payload.
pub fn parse_webhook_payload(event_hint: Option<&str>, payload: &[u8]) -> Result<CodeEvent, ProviderError> {
    if event_hint.is_some_and(|h| h != "pull_request") {
        return Err(ProviderError::Unsupported);
    }

    let hook: GitHubPrHook = serde_json::from_slice(payload).map_err(|e| ProviderError::ParseError {
        vendor: VENDOR,
        reason: e.to_string(),
    })?;

    let action = match hook.action.as_str() {
        "opened" => CodeEventAction::Opened,
        "reopened" => CodeEventAction::Reopened,
        "synchronize" | "review_requested" => CodeEventAction::Updated,
        "ready_for_review" => CodeEventAction::ReadyForReview,
        _ => CodeEventAction::Other,
    };

    let number = hook.pull_request.number;
    let merge_request = merge_request_from(&hook.repository.full_name, number, hook.pull_request);

    Ok(CodeEvent {
        kind: CodeEventType::MergeRequest,
        action,
        project_id: hook.repository.full_name,
        user: merge_request.author.clone(),
        merge_request,
        comment_ref: None,
    })
}

#[derive(Debug, Deserialize)]
struct GitHubPr {
    id: u64,
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    html_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    user: GitHubUser,
    base: GitHubRef,
    head: GitHubRef,
    #[serde(default)]
    requested_reviewers: Option<Vec<GitHubUser>>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: u64,
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    r#ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPrCommit {
    sha: String,
    html_url: String,
    commit: GitHubCommitInner,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitInner {
    message: String,
    author: Option<GitHubCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitAuthor {
    name: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    sha: String,
    html_url: String,
    commit: GitHubCommitInner,
    #[serde(default)]
    stats: Option<GitHubCommitStats>,
    #[serde(default)]
    files: Option<Vec<GitHubFile>>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitStats {
    additions: u32,
    deletions: u32,
}

#[derive(Debug, Deserialize)]
struct GitHubFile {
    filename: String,
    #[serde(default)]
    previous_filename: Option<String>,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GitHubTreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GitHubReviewComment {
    id: u64,
    body: String,
    path: String,
    line: Option<u32>,
    start_line: Option<u32>,
    user: Option<GitHubUser>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GitHubIssueComment {
    id: u64,
}

#[derive(Debug, Serialize)]
struct GitHubCommentCreate<'a> {
    body: &'a str,
    commit_id: &'a str,
    path: &'a str,
    line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_line: Option<u32>,
    side: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueCommentCreate<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct NoteUpdate<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct PrUpdate<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitHubRepoHook {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPrHook {
    action: String,
    pull_request: GitHubPr,
    repository: GitHubRepoHook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_owner_repo() {
        assert_eq!(GitHubClient::split_owner_repo("octo/hello").unwrap(), ("octo", "hello"));
        assert!(GitHubClient::split_owner_repo("octo").is_err());
    }

    #[test]
    fn parses_opened_pull_request_hook() {
        let payload = serde_json::json!({
            "action": "opened",
            "pull_request": {
                "id": 1, "number": 7, "title": "t", "body": null, "state": "open",
                "html_url": "https://github.com/o/r/pull/7",
                "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z",
                "merged_at": null,
                "user": {"id": 2, "login": "alice"},
                "base": {"ref": "main", "sha": "base"},
                "head": {"ref": "feat", "sha": "headsha"}
            },
            "repository": {"full_name": "o/r"}
        })
        .to_string();

        let event = parse_webhook_payload(Some("pull_request"), payload.as_bytes()).unwrap();
        assert_eq!(event.action, CodeEventAction::Opened);
        assert_eq!(event.merge_request.head_sha, "headsha");
        assert_eq!(event.project_id, "o/r");
    }

    #[test]
    fn non_pull_request_event_hint_is_rejected() {
        let err = parse_webhook_payload(Some("issues"), b"{}").unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported));
    }
}
