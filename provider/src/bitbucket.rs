//! Bitbucket Cloud provider (REST v2).
//!
//! Endpoints used:
//! - GET  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id
//! - GET  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id/commits
//! - GET  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id/diff
//! - GET  /2.0/repositories/:workspace/:repo_slug/commit/:sha
//! - GET  /2.0/repositories/:workspace/:repo_slug/diff/:sha
//! - GET  /2.0/repositories/:workspace/:repo_slug/src/:ref/:path
//! - GET  /2.0/repositories/:workspace/:repo_slug/src/:ref/?max_depth=...
//! - GET  /2.0/repositories/:workspace/:repo_slug/pullrequests?state=...
//! - GET  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id/comments
//! - POST /2.0/repositories/:workspace/:repo_slug/pullrequests/:id/comments
//! - PUT  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id/comments/:cid
//! - PUT  /2.0/repositories/:workspace/:repo_slug/pullrequests/:id

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
use crate::types::MergeRequestFilter;

const VENDOR: &str = "bitbucket";

#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: Client,
    base_api: String,
    token: String,
}

impl BitbucketClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self { http, base_api, token }
    }

    fn split_workspace_repo(project_id: &str) -> Result<(&str, &str), ProviderError> {
        let mut parts = project_id.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(w), Some(r)) if !w.is_empty() && !r.is_empty() => Ok((w, r)),
            _ => Err(ProviderError::InvalidProjectId(project_id.to_string())),
        }
    }

    pub async fn get_merge_request(&self, project_id: &str, iid: u64) -> Result<MergeRequest, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/pullrequests/{}", self.base_api, workspace, repo, iid);
        let resp: BitbucketPr = self.get_json(&url).await?;
        Ok(merge_request_from(project_id, iid, resp))
    }

    pub async fn get_merge_request_diffs(&self, project_id: &str, iid: u64) -> Result<Vec<FileDiff>, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/pullrequests/{}/diff", self.base_api, workspace, repo, iid);
        let raw = self.get_text(&url).await?;
        Ok(split_combined_diff(&raw))
    }

    pub async fn get_merge_request_commits(&self, project_id: &str, iid: u64) -> Result<Vec<Commit>, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let mut commits = Vec::new();
        let mut url = Some(format!("{}/repositories/{}/{}/pullrequests/{}/commits", self.base_api, workspace, repo, iid));
        while let Some(u) = url {
            let page: BitbucketPage<BitbucketCommit> = self.get_json(&u).await?;
            commits.extend(page.values.into_iter().map(commit_from));
            url = page.next;
        }
        Ok(commits)
    }

    pub async fn get_commit_details(&self, project_id: &str, sha: &str) -> Result<Commit, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/commit/{}", self.base_api, workspace, repo, sha);
        let raw: BitbucketCommit = self.get_json(&url).await?;
        Ok(commit_from(raw))
    }

    pub async fn get_commit_diffs(&self, project_id: &str, sha: &str) -> Result<Vec<FileDiff>, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/diff/{}", self.base_api, workspace, repo, sha);
        let raw = self.get_text(&url).await?;
        Ok(split_combined_diff(&raw))
    }

    pub async fn get_file_content(&self, project_id: &str, path: &str, sha: &str) -> Result<Option<String>, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/src/{}/{}", self.base_api, workspace, repo, sha, path);
        self.get_text_optional(&url).await
    }

    pub async fn get_repository_snapshot(&self, project_id: &str, sha: &str) -> Result<RepositorySnapshot, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let mut files = Vec::new();
        let mut url = Some(format!(
            "{}/repositories/{}/{}/src/{}/?max_depth=50&pagelen=100",
            self.base_api, workspace, repo, sha
        ));
        while let Some(u) = url {
            let page: BitbucketPage<BitbucketSrcEntry> = self.get_json(&u).await?;
            for entry in page.values.into_iter().filter(|e| e.entry_type == "commit_file") {
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
            url = page.next;
        }
        Ok(RepositorySnapshot {
            sha: sha.to_string(),
            timestamp: Utc::now(),
            files,
        })
    }

    pub async fn list_merge_requests(&self, project_id: &str, filter: &MergeRequestFilter) -> Result<Vec<MergeRequest>, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let state = filter.state.map(state_query).unwrap_or("OPEN");
        let mut out = Vec::new();
        let mut url = Some(format!(
            "{}/repositories/{}/{}/pullrequests?state={}&pagelen=50",
            self.base_api, workspace, repo, state
        ));
        while let Some(u) = url {
            let page: BitbucketPage<BitbucketPr> = self.get_json(&u).await?;
            out.extend(page.values.into_iter().map(|pr| {
                let id = pr.id;
                merge_request_from(project_id, id, pr)
            }));
            url = page.next;
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
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let mut out = Vec::new();
        let mut url = Some(format!(
            "{}/repositories/{}/{}/pullrequests/{}/comments?pagelen=100",
            self.base_api, workspace, repo, iid
        ));
        while let Some(u) = url {
            let page: BitbucketPage<BitbucketComment> = self.get_json(&u).await?;
            out.extend(page.values.into_iter().filter(|c| !c.deleted).map(comment_from));
            url = page.next;
        }
        Ok(out)
    }

    /// Bitbucket Cloud's ranged comments use `from`/`to` on the inline block;
    /// removed-line anchors are skipped in favor of a general PR comment, as
    /// Bitbucket's old-side semantics are unreliable across API versions.
    pub async fn create_comment(&self, project_id: &str, iid: u64, comment: &Comment) -> Result<Comment, ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/pullrequests/{}/comments", self.base_api, workspace, repo, iid);

        let inline = match (&comment.file_path, comment.line) {
            (Some(path), Some(start)) => {
                // Bitbucket anchors the comment on `to` (the last line of the
                // range) and gives the first line as `from` only when ranged.
                let end = comment.end_line.filter(|end| *end > start);
                Some(BitbucketInline {
                    path,
                    to: Some(end.unwrap_or(start) as i64),
                    from: end.map(|_| start as i64),
                })
            }
            _ => None,
        };

        let payload = BitbucketCommentCreate {
            content: BitbucketContent { raw: &comment.body },
            inline,
        };
        let created: BitbucketComment = self.post_json(&url, &payload).await?;
        Ok(Comment {
            id: Some(created.id.to_string()),
            ..comment.clone()
        })
    }

    pub async fn update_comment(&self, project_id: &str, iid: u64, comment_id: &str, body: &str) -> Result<(), ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!(
            "{}/repositories/{}/{}/pullrequests/{}/comments/{}",
            self.base_api, workspace, repo, iid, comment_id
        );
        let payload = BitbucketCommentCreate {
            content: BitbucketContent { raw: body },
            inline: None,
        };
        self.put_json(&url, &payload).await
    }

    pub async fn update_merge_request_description(&self, project_id: &str, iid: u64, description: &str) -> Result<(), ProviderError> {
        let (workspace, repo) = Self::split_workspace_repo(project_id)?;
        let url = format!("{}/repositories/{}/{}/pullrequests/{}", self.base_api, workspace, repo, iid);
        self.put_json(&url, &BitbucketPrUpdate { description }).await
    }

    fn auth_header(&self) -> &str {
        &self.token
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(%url, "Bitbucket GET");
        let resp = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(transport(VENDOR))?;
        self.decode(resp).await
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", self.auth_header())
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
            .header("Authorization", self.auth_header())
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
            .header("Authorization", self.auth_header())
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
            .header("Authorization", self.auth_header())
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
        MergeRequestState::Open => "OPEN",
        MergeRequestState::Merged => "MERGED",
        MergeRequestState::Closed | MergeRequestState::Declined => "DECLINED",
    }
}

fn state_from(s: &str) -> MergeRequestState {
    match s {
        "MERGED" => MergeRequestState::Merged,
        "DECLINED" => MergeRequestState::Declined,
        "SUPERSEDED" => MergeRequestState::Closed,
        _ => MergeRequestState::Open,
    }
}

fn merge_request_from(project_id: &str, iid: u64, pr: BitbucketPr) -> MergeRequest {
    MergeRequest {
        id: iid.to_string(),
        iid,
        project_id: project_id.to_string(),
        title: pr.title,
        description: pr.description,
        source_branch: pr.source.branch.name,
        target_branch: pr.destination.branch.name,
        head_sha: pr.source.commit.hash,
        state: state_from(&pr.state),
        author: User {
            id: pr.author.uuid.clone().unwrap_or_else(|| pr.author.display_name.clone()),
            username: pr.author.nickname.unwrap_or_default(),
            name: pr.author.display_name,
            email: None,
        },
        reviewers: pr
            .reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| User {
                id: u.uuid.clone().unwrap_or_else(|| u.display_name.clone()),
                username: u.nickname.unwrap_or_default(),
                name: u.display_name,
                email: None,
            })
            .collect(),
        created_at: pr.created_on,
        updated_at: pr.updated_on.unwrap_or(pr.created_on),
        url: pr.links.html.map(|l| l.href).unwrap_or_default(),
    }
}

fn commit_from(c: BitbucketCommit) -> Commit {
    let author_name = c.author.as_ref().map(|a| a.user.display_name.clone()).unwrap_or_default();
    Commit {
        sha: c.hash,
        subject: c.summary.raw.lines().next().unwrap_or("").to_string(),
        body: Some(c.summary.raw),
        author: User::new(String::new(), String::new(), author_name.clone()),
        committer: User::new(String::new(), String::new(), author_name),
        timestamp: c.date,
        stats: CommitStats::default(),
        url: c.links.html.map(|l| l.href).unwrap_or_default(),
    }
}

fn comment_from(c: BitbucketComment) -> Comment {
    let (file_path, line, end_line) = match c.inline {
        Some(i) => (Some(i.path.to_string()), i.to.map(|v| v as u32), i.from.map(|v| v as u32)),
        None => (None, None, None),
    };
    Comment {
        id: Some(c.id.to_string()),
        kind: if file_path.is_some() { CommentType::Inline } else { CommentType::General },
        body: c.content.raw,
        file_path,
        line,
        end_line,
        position: None,
        author: c.user.map(|u| User {
            id: u.uuid.clone().unwrap_or_else(|| u.display_name.clone()),
            username: u.nickname.unwrap_or_default(),
            name: u.display_name,
            email: None,
        }),
        created_at: Some(c.created_on),
        updated_at: c.updated_on,
    }
}

/// Parses a Bitbucket `pullrequest:*` webhook payload. The action isn't
/// carried in the body; it comes from the `X-Event-Key` header, handed in
/// as `event_hint`.
pub fn parse_webhook_payload(event_hint: Option<&str>, payload: &[u8]) -> Result<CodeEvent, ProviderError> {
    let hook: BitbucketPrHook = serde_json::from_slice(payload).map_err(|e| ProviderError::ParseError {
        vendor: VENDOR,
        reason: e.to_string(),
    })?;

    let action = match event_hint.unwrap_or_default() {
        "pullrequest:created" => CodeEventAction::Opened,
        "pullrequest:updated" => CodeEventAction::Updated,
        "pullrequest:reviewer_added" => CodeEventAction::ReviewerAdded,
        _ => CodeEventAction::Other,
    };

    let project_id = hook.repository.full_name.clone();
    let iid = hook.pullrequest.id;
    let merge_request = merge_request_from(&project_id, iid, hook.pullrequest);

    Ok(CodeEvent {
        kind: CodeEventType::MergeRequest,
        action,
        project_id,
        user: hook.actor.map(|a| User {
            id: a.uuid.clone().unwrap_or_else(|| a.display_name.clone()),
            username: a.nickname.unwrap_or_default(),
            name: a.display_name,
            email: None,
        }).unwrap_or_else(|| merge_request.author.clone()),
        merge_request,
        comment_ref: None,
    })
}

#[derive(Debug, Deserialize)]
struct BitbucketPr {
    id: u64,
    title: String,
    description: Option<String>,
    state: String,
    created_on: DateTime<Utc>,
    updated_on: Option<DateTime<Utc>>,
    author: BitbucketUser,
    source: BitbucketPrBranch,
    destination: BitbucketPrBranch,
    links: BitbucketLinks,
    #[serde(default)]
    reviewers: Option<Vec<BitbucketUser>>,
}

#[derive(Debug, Deserialize)]
struct BitbucketUser {
    display_name: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketPrBranch {
    branch: BitbucketBranch,
    commit: BitbucketCommitRef,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketLinks {
    html: Option<BitbucketLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketLink {
    href: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPage<T> {
    values: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommit {
    hash: String,
    summary: BitbucketSummary,
    date: DateTime<Utc>,
    author: Option<BitbucketCommitAuthor>,
    links: BitbucketLinks,
}

#[derive(Debug, Deserialize)]
struct BitbucketSummary {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitAuthor {
    user: BitbucketUser,
}

#[derive(Debug, Deserialize)]
struct BitbucketSrcEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BitbucketComment {
    id: u64,
    content: BitbucketContentOwned,
    #[serde(default)]
    inline: Option<BitbucketInlineOwned>,
    user: Option<BitbucketUser>,
    created_on: DateTime<Utc>,
    #[serde(default)]
    updated_on: Option<DateTime<Utc>>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct BitbucketContentOwned {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketInlineOwned {
    path: String,
    to: Option<i64>,
    from: Option<i64>,
}

#[derive(Debug, Serialize)]
struct BitbucketCommentCreate<'a> {
    content: BitbucketContent<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline: Option<BitbucketInline<'a>>,
}

#[derive(Debug, Serialize)]
struct BitbucketContent<'a> {
    raw: &'a str,
}

#[derive(Debug, Serialize)]
struct BitbucketInline<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<i64>,
}

#[derive(Debug, Serialize)]
struct BitbucketPrUpdate<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct BitbucketRepoHook {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPrHook {
    pullrequest: BitbucketPr,
    repository: BitbucketRepoHook,
    #[serde(default)]
    actor: Option<BitbucketUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_workspace_repo() {
        assert_eq!(BitbucketClient::split_workspace_repo("ws/repo").unwrap(), ("ws", "repo"));
        assert!(BitbucketClient::split_workspace_repo("ws").is_err());
    }

    #[test]
    fn parses_reviewer_added_hook() {
        let payload = serde_json::json!({
            "pullrequest": {
                "id": 3, "title": "t", "description": null, "state": "OPEN",
                "created_on": "2026-01-01T00:00:00Z", "updated_on": null,
                "author": {"display_name": "Alice", "nickname": "alice", "uuid": "{a}"},
                "source": {"branch": {"name": "feat"}, "commit": {"hash": "headsha"}},
                "destination": {"branch": {"name": "main"}, "commit": {"hash": "basesha"}},
                "links": {"html": {"href": "https://bitbucket.org/ws/repo/pull-requests/3"}},
                "reviewers": [{"display_name": "Bot", "nickname": "bot-user", "uuid": "{b}"}]
            },
            "repository": {"full_name": "ws/repo"},
            "actor": {"display_name": "Alice", "nickname": "alice", "uuid": "{a}"}
        })
        .to_string();

        let event = parse_webhook_payload(Some("pullrequest:reviewer_added"), payload.as_bytes()).unwrap();
        assert_eq!(event.action, CodeEventAction::ReviewerAdded);
        assert!(event.merge_request.has_reviewer("bot-user"));
    }
}
