//! `POST /webhook/{provider}` — signature validation, event classification
//! and dispatch into the review pipeline.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use reviewbot_pipeline::RunSummary;
use reviewbot_provider::{is_merge_request_event, parse_webhook_event, validate_webhook, ProviderKind};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummaryBody>,
}

#[derive(Serialize)]
pub struct RunSummaryBody {
    pub files_considered: usize,
    pub files_reviewed: usize,
    pub comments_created: usize,
    pub comments_updated: usize,
    pub comments_skipped: usize,
    pub description_updated: bool,
    pub timed_out: bool,
}

impl From<&RunSummary> for RunSummaryBody {
    fn from(s: &RunSummary) -> Self {
        Self {
            files_considered: s.files_considered,
            files_reviewed: s.files_reviewed,
            comments_created: s.comments_created,
            comments_updated: s.comments_updated,
            comments_skipped: s.comments_skipped,
            description_updated: s.description_updated,
            timed_out: s.timed_out,
        }
    }
}

fn ignored(message: impl Into<String>) -> (StatusCode, Json<WebhookResponse>) {
    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "ignored".into(),
            message: Some(message.into()),
            summary: None,
        }),
    )
}

fn queued(project_id: &str, iid: u64) -> (StatusCode, Json<WebhookResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(WebhookResponse {
            status: "queued".into(),
            message: Some(format!("{project_id}!{iid}")),
            summary: None,
        }),
    )
}

fn completed(summary: &RunSummary) -> (StatusCode, Json<WebhookResponse>) {
    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "completed".into(),
            message: None,
            summary: Some(summary.into()),
        }),
    )
}

fn failed(message: impl Into<String>) -> (StatusCode, Json<WebhookResponse>) {
    (
        StatusCode::OK,
        Json(WebhookResponse {
            status: "failed".into(),
            message: Some(message.into()),
            summary: None,
        }),
    )
}

/// The header carrying the vendor signature, one per provider kind.
fn signature_header<'a>(kind: ProviderKind, headers: &'a HeaderMap) -> &'a str {
    let name = match kind {
        ProviderKind::GitHub => "x-hub-signature-256",
        ProviderKind::Bitbucket => "x-hub-signature",
        ProviderKind::GitLab => "x-gitlab-token",
    };
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// The header carrying the vendor event type, consulted only where the body
/// itself doesn't classify the action (Bitbucket).
fn event_hint_header<'a>(kind: ProviderKind, headers: &'a HeaderMap) -> Option<&'a str> {
    let name = match kind {
        ProviderKind::GitHub => "x-github-event",
        ProviderKind::Bitbucket => "x-event-key",
        ProviderKind::GitLab => "x-gitlab-event",
    };
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    let kind = ProviderKind::from_label(&provider).ok_or_else(|| AppError::UnknownProvider(provider.clone()))?;
    if kind != state.provider_kind {
        return Err(AppError::UnknownProvider(provider));
    }

    let signature = signature_header(kind, &headers);
    validate_webhook(kind, state.webhook_secret.as_deref(), &body, signature)
        .map_err(|_| AppError::Unauthorized)?;

    let event_hint = event_hint_header(kind, &headers);
    let event =
        parse_webhook_event(kind, event_hint, &body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !is_merge_request_event(&event, &state.bot_username) {
        return Ok(ignored("event does not require review"));
    }

    let project_id = event.project_id.clone();
    let iid = event.merge_request.iid;

    if !state.runner.has_capacity() {
        warn!(%project_id, iid, "rejecting webhook: admission queue saturated");
        return Err(AppError::Saturated);
    }

    info!(%project_id, iid, action = ?event.action, "admitting merge request review");

    if state.synchronous {
        return Ok(match state.runner.run(&state.table, &project_id, iid).await {
            Ok(summary) => completed(&summary),
            Err(e) => {
                warn!(%project_id, iid, error = %e, "review run failed");
                failed(e.to_string())
            }
        });
    }

    let runner = state.runner.clone();
    let table = state.table.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.run(&table, &project_id, iid).await {
            warn!(%project_id, iid, error = %e, "review run failed");
        }
    });
    Ok(queued(&event.project_id, iid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, value.parse().unwrap());
        headers
    }

    #[test]
    fn github_signature_header_is_case_insensitive_hub_signature_256() {
        let headers = headers_with("X-Hub-Signature-256", "sha256=deadbeef");
        assert_eq!(signature_header(ProviderKind::GitHub, &headers), "sha256=deadbeef");
    }

    #[test]
    fn gitlab_signature_header_is_the_bare_token() {
        let headers = headers_with("X-Gitlab-Token", "t0ken");
        assert_eq!(signature_header(ProviderKind::GitLab, &headers), "t0ken");
    }

    #[test]
    fn missing_signature_header_is_empty_string() {
        let headers = HeaderMap::new();
        assert_eq!(signature_header(ProviderKind::Bitbucket, &headers), "");
    }

    #[test]
    fn bitbucket_event_hint_reads_x_event_key() {
        let headers = headers_with("X-Event-Key", "pullrequest:created");
        assert_eq!(event_hint_header(ProviderKind::Bitbucket, &headers), Some("pullrequest:created"));
    }

    #[test]
    fn gitlab_has_no_event_hint_when_header_absent() {
        let headers = HeaderMap::new();
        assert_eq!(event_hint_header(ProviderKind::GitLab, &headers), None);
    }
}
