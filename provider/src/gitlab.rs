//! GitLab provider (REST v4).
//!
//! Endpoints used:
//! - GET  /projects/:id/merge_requests/:iid
//! - GET  /projects/:id/merge_requests/:iid/commits
//! - GET  /projects/:id/merge_requests/:iid/diffs
//! - GET  /projects/:id/merge_requests/:iid/raw_diffs      (enrichment)
//! - GET  /projects/:id/merge_requests                     (list)
//! - GET  /projects/:id/merge_requests/:iid/notes
//! - POST /projects/:id/merge_requests/:iid/notes           (general comment)
//! - POST /projects/:id/merge_requests/:iid/discussions     (inline comment)
//! - PUT  /projects/:id/merge_requests/:iid                 (description)
//! - PUT  /projects/:id/merge_requests/:iid/notes/:note_id  (edit)
//! - GET  /projects/:id/repository/commits/:sha
//! - GET  /projects/:id/repository/commits/:sha/diff
//! - GET  /projects/:id/repository/files/:path/raw?ref=:sha
//! - GET  /projects/:id/repository/tree?ref=:sha&recursive=true

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reviewbot_model::{
    CodeEvent, CodeEventAction, CodeEventType, Comment, CommentType, Commit, CommitStats, FileDiff,
    MergeRequest, MergeRequestState, RepositoryFile, RepositorySnapshot, User,
};

use crate::diffsplit::split_combined_diff;
use crate::errors::{map_status, transport, ProviderError};
use crate::types::{MergeRequestFilter, PAGE_CAP};

const VENDOR: &str = "gitlab";

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String,
    token: String,
}

impl GitLabClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    fn project_segment(project_id: &str) -> String {
        urlencoding::encode(project_id).into_owned()
    }

    pub async fn get_merge_request(&self, project_id: &str, iid: u64) -> Result<MergeRequest, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        debug!(%url, "GitLab get_merge_request");
        let resp: GitLabMr = self.get_json(&url).await?;
        Ok(merge_request_from(project_id, resp))
    }

    pub async fn get_merge_request_diffs(&self, project_id: &str, iid: u64) -> Result<Vec<FileDiff>, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/diffs",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        let files: Vec<GitLabDiffFile> = self.get_json(&url).await?;
        Ok(files.into_iter().map(file_diff_from).collect())
    }

    /// Best-effort enrichment for MRs where `/diffs` came back truncated:
    /// re-fetches the combined raw diff and splits it ourselves.
    pub async fn enrich_diffs_from_raw(&self, project_id: &str, iid: u64) -> Result<Vec<FileDiff>, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/raw_diffs",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        let raw = self.get_text(&url).await?;
        Ok(split_combined_diff(&raw))
    }

    pub async fn get_merge_request_commits(&self, project_id: &str, iid: u64) -> Result<Vec<Commit>, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/commits",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        let raw: Vec<GitLabCommit> = self.get_json(&url).await?;
        Ok(raw.into_iter().map(commit_from).collect())
    }

    pub async fn get_commit_details(&self, project_id: &str, sha: &str) -> Result<Commit, ProviderError> {
        let url = format!(
            "{}/projects/{}/repository/commits/{}",
            self.base_api,
            Self::project_segment(project_id),
            sha
        );
        let raw: GitLabCommit = self.get_json(&url).await?;
        Ok(commit_from(raw))
    }

    pub async fn get_commit_diffs(&self, project_id: &str, sha: &str) -> Result<Vec<FileDiff>, ProviderError> {
        let url = format!(
            "{}/projects/{}/repository/commits/{}/diff",
            self.base_api,
            Self::project_segment(project_id),
            sha
        );
        let files: Vec<GitLabDiffFile> = self.get_json(&url).await?;
        Ok(files.into_iter().map(file_diff_from).collect())
    }

    pub async fn get_file_content(
        &self,
        project_id: &str,
        path: &str,
        sha: &str,
    ) -> Result<Option<String>, ProviderError> {
        let url = format!(
            "{}/projects/{}/repository/files/{}/raw?ref={}",
            self.base_api,
            Self::project_segment(project_id),
            urlencoding::encode(path),
            urlencoding::encode(sha)
        );
        self.get_text_optional(&url).await
    }

    pub async fn get_repository_snapshot(
        &self,
        project_id: &str,
        sha: &str,
    ) -> Result<RepositorySnapshot, ProviderError> {
        let tree_url = format!(
            "{}/projects/{}/repository/tree?ref={}&recursive=true&per_page=100",
            self.base_api,
            Self::project_segment(project_id),
            urlencoding::encode(sha)
        );
        let entries: Vec<GitLabTreeEntry> = self.get_json(&tree_url).await?;

        let mut files = Vec::new();
        for entry in entries.into_iter().filter(|e| e.entry_type == "blob") {
            let content = self.get_file_content(project_id, &entry.path, sha).await?;
            let (content, is_binary) = match content {
                Some(c) => (c.clone(), false),
                None => (String::new(), true),
            };
            files.push(RepositoryFile {
                size: content.len() as u64,
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

    pub async fn list_merge_requests(
        &self,
        project_id: &str,
        filter: &MergeRequestFilter,
    ) -> Result<Vec<MergeRequest>, ProviderError> {
        let mut out = Vec::new();
        for page in 1..=PAGE_CAP {
            let mut url = format!(
                "{}/projects/{}/merge_requests?per_page=100&page={}",
                self.base_api,
                Self::project_segment(project_id),
                page
            );
            if let Some(state) = filter.state {
                url.push_str(&format!("&state={}", state_query(state)));
            }
            if let Some(branch) = &filter.source_branch {
                url.push_str(&format!("&source_branch={}", urlencoding::encode(branch)));
            }
            if let Some(branch) = &filter.target_branch {
                url.push_str(&format!("&target_branch={}", urlencoding::encode(branch)));
            }
            if let Some(author) = &filter.author {
                url.push_str(&format!("&author_username={}", urlencoding::encode(author)));
            }

            let raw: Vec<GitLabMr> = self.get_json(&url).await?;
            let got = raw.len();
            out.extend(raw.into_iter().map(|mr| merge_request_from(project_id, mr)));
            if got < 100 {
                break;
            }
        }
        Ok(out)
    }

    pub async fn get_merge_request_updates(
        &self,
        project_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MergeRequest>, ProviderError> {
        let mut out = Vec::new();
        for page in 1..=PAGE_CAP {
            let url = format!(
                "{}/projects/{}/merge_requests?per_page=100&page={}&order_by=updated_at&sort=desc&updated_after={}",
                self.base_api,
                Self::project_segment(project_id),
                page,
                since.to_rfc3339()
            );
            let raw: Vec<GitLabMr> = self.get_json(&url).await?;
            let got = raw.len();
            out.extend(raw.into_iter().map(|mr| merge_request_from(project_id, mr)));
            if got < 100 {
                break;
            }
        }
        Ok(out)
    }

    pub async fn get_comments(&self, project_id: &str, iid: u64) -> Result<Vec<Comment>, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/notes?per_page=100",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        let raw: Vec<GitLabNote> = self.get_json(&url).await?;
        Ok(raw.into_iter().filter(|n| !n.system).map(comment_from).collect())
    }

    /// GitLab has no native ranged-discussion API: the start line anchors the
    /// discussion and the range is folded into the body as `*(lines A-B)*`.
    pub async fn create_comment(
        &self,
        project_id: &str,
        iid: u64,
        comment: &Comment,
    ) -> Result<Comment, ProviderError> {
        match (&comment.file_path, comment.line) {
            (Some(path), Some(line)) => {
                let mr = self.get_merge_request_meta_refs(project_id, iid).await?;
                let body = annotate_range(&comment.body, comment.line, comment.end_line);
                let url = format!(
                    "{}/projects/{}/merge_requests/{}/discussions",
                    self.base_api,
                    Self::project_segment(project_id),
                    iid
                );
                let payload = DiscussionCreate {
                    body: &body,
                    position: DiscussionPosition {
                        position_type: "text",
                        base_sha: &mr.base_sha,
                        start_sha: mr.start_sha.as_deref().unwrap_or(&mr.base_sha),
                        head_sha: &mr.head_sha,
                        new_path: path,
                        new_line: line,
                    },
                };
                let created: GitLabDiscussion = self.post_json(&url, &payload).await?;
                let note_id = created.notes.first().map(|n| n.id.to_string()).unwrap_or_default();
                Ok(Comment {
                    id: Some(format!("{}/{}", created.id, note_id)),
                    ..comment.clone()
                })
            }
            _ => {
                let url = format!(
                    "{}/projects/{}/merge_requests/{}/notes",
                    self.base_api,
                    Self::project_segment(project_id),
                    iid
                );
                let payload = NoteCreate { body: &comment.body };
                let created: GitLabNote = self.post_json(&url, &payload).await?;
                Ok(Comment {
                    id: Some(created.id.to_string()),
                    ..comment.clone()
                })
            }
        }
    }

    pub async fn update_comment(&self, project_id: &str, iid: u64, comment_id: &str, body: &str) -> Result<(), ProviderError> {
        let url = if let Some((discussion_id, note_id)) = comment_id.split_once('/') {
            format!(
                "{}/projects/{}/merge_requests/{}/discussions/{}/notes/{}",
                self.base_api,
                Self::project_segment(project_id),
                iid,
                discussion_id,
                note_id
            )
        } else {
            format!(
                "{}/projects/{}/merge_requests/{}/notes/{}",
                self.base_api,
                Self::project_segment(project_id),
                iid,
                comment_id
            )
        };
        self.put_json(&url, &NoteUpdate { body }).await
    }

    pub async fn update_merge_request_description(
        &self,
        project_id: &str,
        iid: u64,
        description: &str,
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        self.put_json(&url, &MrUpdate { description }).await
    }

    async fn get_merge_request_meta_refs(&self, project_id: &str, iid: u64) -> Result<GitLabDiffRefs, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_api,
            Self::project_segment(project_id),
            iid
        );
        let resp: GitLabMr = self.get_json(&url).await?;
        Ok(resp.diff_refs)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let resp = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(transport(VENDOR))?;
        self.decode(resp).await
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        let resp = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(transport(VENDOR))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(map_status(VENDOR, status, body));
        }
        resp.text().await.map_err(transport(VENDOR))
    }

    async fn get_text_optional(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let resp = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
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

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(&self, url: &str, body: &B) -> Result<T, ProviderError> {
        let resp = self
            .http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(body)
            .send()
            .await
            .map_err(transport(VENDOR))?;
        self.decode(resp).await
    }

    async fn put_json<B: Serialize>(&self, url: &str, body: &B) -> Result<(), ProviderError> {
        let resp = self
            .http
            .put(url)
            .header("PRIVATE-TOKEN", &self.token)
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

fn annotate_range(body: &str, line: Option<u32>, end_line: Option<u32>) -> String {
    match (line, end_line) {
        (Some(start), Some(end)) if end > start => format!("{body}\n\n*(lines {start}-{end})*"),
        _ => body.to_string(),
    }
}

fn state_query(state: MergeRequestState) -> &'static str {
    match state {
        MergeRequestState::Open => "opened",
        MergeRequestState::Merged => "merged",
        MergeRequestState::Closed => "closed",
        MergeRequestState::Declined => "closed",
    }
}

fn state_from(s: &str) -> MergeRequestState {
    match s {
        "merged" => MergeRequestState::Merged,
        "closed" => MergeRequestState::Closed,
        _ => MergeRequestState::Open,
    }
}

fn merge_request_from(project_id: &str, resp: GitLabMr) -> MergeRequest {
    MergeRequest {
        id: resp.id.to_string(),
        iid: resp.iid,
        project_id: project_id.to_string(),
        title: resp.title,
        description: resp.description,
        source_branch: resp.source_branch,
        target_branch: resp.target_branch,
        head_sha: resp.diff_refs.head_sha.clone(),
        state: state_from(&resp.state),
        author: User {
            id: resp.author.id.to_string(),
            username: resp.author.username,
            name: resp.author.name,
            email: None,
        },
        reviewers: resp
            .reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| User {
                id: u.id.to_string(),
                username: u.username,
                name: u.name,
                email: None,
            })
            .collect(),
        created_at: resp.created_at,
        updated_at: resp.updated_at,
        url: resp.web_url,
    }
}

fn file_diff_from(f: GitLabDiffFile) -> FileDiff {
    FileDiff {
        old_path: Some(f.old_path),
        new_path: Some(f.new_path),
        diff: f.diff.unwrap_or_default(),
        is_new: f.new_file,
        is_deleted: f.deleted_file,
        is_renamed: f.renamed_file,
        is_binary: false,
    }
}

fn commit_from(c: GitLabCommit) -> Commit {
    let author = User::new(String::new(), String::new(), c.author_name.clone());
    Commit {
        sha: c.id,
        subject: c.title,
        body: Some(c.message),
        committer: User::new(String::new(), String::new(), c.committer_name.unwrap_or(c.author_name)),
        author,
        timestamp: c.authored_date.unwrap_or(c.created_at),
        stats: CommitStats {
            additions: c.stats.as_ref().map(|s| s.additions).unwrap_or(0),
            deletions: c.stats.as_ref().map(|s| s.deletions).unwrap_or(0),
            total_files: 0,
        },
        url: c.web_url.unwrap_or_default(),
    }
}

fn comment_from(n: GitLabNote) -> Comment {
    Comment {
        id: Some(n.id.to_string()),
        kind: CommentType::General,
        body: n.body,
        file_path: None,
        line: None,
        end_line: None,
        position: None,
        author: Some(User {
            id: n.author.id.to_string(),
            username: n.author.username,
            name: n.author.name,
            email: None,
        }),
        created_at: Some(n.created_at),
        updated_at: n.updated_at,
    }
}

/// Parses a GitLab "Merge Request Hook" webhook payload.
pub fn parse_webhook_payload(payload: &[u8]) -> Result<CodeEvent, ProviderError> {
    let hook: GitLabMrHook = serde_json::from_slice(payload).map_err(|e| ProviderError::ParseError {
        vendor: VENDOR,
        reason: e.to_string(),
    })?;

    let action = match hook.object_attributes.action.as_deref() {
        Some("open") => CodeEventAction::Opened,
        Some("reopen") => CodeEventAction::Reopened,
        Some("update") => CodeEventAction::Updated,
        _ => CodeEventAction::Other,
    };

    let state = state_from(&hook.object_attributes.state);
    let project_id = hook.project.id.to_string();

    let merge_request = MergeRequest {
        id: hook.object_attributes.id.to_string(),
        iid: hook.object_attributes.iid,
        project_id: project_id.clone(),
        title: hook.object_attributes.title,
        description: hook.object_attributes.description,
        source_branch: hook.object_attributes.source_branch,
        target_branch: hook.object_attributes.target_branch,
        head_sha: hook
            .object_attributes
            .last_commit
            .map(|c| c.id)
            .unwrap_or_default(),
        state,
        author: User {
            id: hook.user.id.to_string(),
            username: hook.user.username.clone(),
            name: hook.user.name.clone(),
            email: None,
        },
        reviewers: hook
            .reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| User {
                id: u.id.to_string(),
                username: u.username,
                name: u.name,
                email: None,
            })
            .collect(),
        created_at: hook.object_attributes.created_at,
        updated_at: hook.object_attributes.updated_at,
        url: hook.object_attributes.url,
    };

    Ok(CodeEvent {
        kind: CodeEventType::MergeRequest,
        action,
        project_id,
        user: User {
            id: hook.user.id.to_string(),
            username: hook.user.username,
            name: hook.user.name,
            email: None,
        },
        merge_request,
        comment_ref: None,
    })
}

#[derive(Debug, Deserialize)]
struct GitLabMr {
    id: u64,
    iid: u64,
    title: String,
    description: Option<String>,
    web_url: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    source_branch: String,
    target_branch: String,
    diff_refs: GitLabDiffRefs,
    author: GitLabUser,
    #[serde(default)]
    reviewers: Option<Vec<GitLabUser>>,
}

#[derive(Debug, Deserialize, Clone)]
struct GitLabDiffRefs {
    base_sha: String,
    head_sha: String,
    start_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    id: u64,
    username: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
    title: String,
    message: String,
    author_name: String,
    committer_name: Option<String>,
    created_at: DateTime<Utc>,
    authored_date: Option<DateTime<Utc>>,
    web_url: Option<String>,
    stats: Option<GitLabCommitStats>,
}

#[derive(Debug, Deserialize)]
struct GitLabCommitStats {
    additions: u32,
    deletions: u32,
}

#[derive(Debug, Deserialize)]
struct GitLabDiffFile {
    old_path: String,
    new_path: String,
    new_file: bool,
    renamed_file: bool,
    deleted_file: bool,
    #[serde(default)]
    diff: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabTreeEntry {
    #[serde(rename = "type")]
    entry_type: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct GitLabNote {
    id: u64,
    body: String,
    author: GitLabUser,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    system: bool,
}

#[derive(Debug, Deserialize)]
struct GitLabDiscussion {
    id: String,
    notes: Vec<GitLabNote>,
}

#[derive(Debug, Serialize)]
struct NoteCreate<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct NoteUpdate<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct MrUpdate<'a> {
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct DiscussionCreate<'a> {
    body: &'a str,
    position: DiscussionPosition<'a>,
}

#[derive(Debug, Serialize)]
struct DiscussionPosition<'a> {
    #[serde(rename = "position_type")]
    position_type: &'a str,
    base_sha: &'a str,
    start_sha: &'a str,
    head_sha: &'a str,
    new_path: &'a str,
    new_line: u32,
}

#[derive(Debug, Deserialize)]
struct GitLabMrHook {
    object_attributes: GitLabHookAttrs,
    user: GitLabUser,
    project: GitLabHookProject,
    #[serde(default)]
    reviewers: Option<Vec<GitLabUser>>,
}

#[derive(Debug, Deserialize)]
struct GitLabHookProject {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabHookAttrs {
    id: u64,
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    action: Option<String>,
    source_branch: String,
    target_branch: String,
    url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_commit: Option<GitLabHookCommit>,
}

#[derive(Debug, Deserialize)]
struct GitLabHookCommit {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_range_adds_line_span_for_ranged_comment() {
        let out = annotate_range("looks risky", Some(10), Some(14));
        assert!(out.contains("*(lines 10-14)*"));
    }

    #[test]
    fn annotate_range_leaves_single_line_body_untouched() {
        let out = annotate_range("looks risky", Some(10), None);
        assert_eq!(out, "looks risky");
    }

    #[test]
    fn parses_open_merge_request_hook() {
        let payload = serde_json::json!({
            "object_attributes": {
                "id": 1, "iid": 5, "title": "t", "description": null,
                "state": "opened", "action": "open",
                "source_branch": "feat", "target_branch": "main",
                "url": "https://gitlab.example/mr/5",
                "created_at": "2026-01-01T00:00:00Z",
                "updated_at": "2026-01-01T00:00:00Z",
                "last_commit": {"id": "deadbeef"}
            },
            "user": {"id": 9, "username": "alice", "name": "Alice"},
            "project": {"id": 42}
        })
        .to_string();

        let event = parse_webhook_payload(payload.as_bytes()).unwrap();
        assert_eq!(event.action, CodeEventAction::Opened);
        assert_eq!(event.merge_request.head_sha, "deadbeef");
        assert_eq!(event.project_id, "42");
    }

    #[tokio::test]
    async fn get_merge_request_sends_private_token_and_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/projects/grp%2Fproj/merge_requests/7")
            .match_header("PRIVATE-TOKEN", "s3cr3t")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "id": 1, "iid": 7, "title": "t", "description": null,
                    "web_url": "https://gitlab.example/mr/7",
                    "state": "opened",
                    "created_at": "2026-01-01T00:00:00Z",
                    "updated_at": "2026-01-01T00:00:00Z",
                    "source_branch": "feat", "target_branch": "main",
                    "diff_refs": {"base_sha": "base", "head_sha": "head", "start_sha": "start"},
                    "author": {"id": 9, "username": "alice", "name": "Alice"},
                    "reviewers": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GitLabClient::new(Client::new(), server.url(), "s3cr3t".to_string());
        let mr = client.get_merge_request("grp/proj", 7).await.unwrap();

        mock.assert_async().await;
        assert_eq!(mr.iid, 7);
        assert_eq!(mr.head_sha, "head");
        assert_eq!(mr.project_id, "grp/proj");
    }

    #[tokio::test]
    async fn get_merge_request_maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/projects/grp%2Fproj/merge_requests/9").with_status(404).create_async().await;

        let client = GitLabClient::new(Client::new(), server.url(), "s3cr3t".to_string());
        let err = client.get_merge_request("grp/proj", 9).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }
}
