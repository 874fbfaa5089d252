//! Webhook signature validation and relevance classification.
//!
//! Validation and classification are both pure with respect to network I/O:
//! given a payload and a secret (or a parsed event and a bot username) they
//! return an answer with no `.await` in sight. Only `parse_webhook_event`
//! touches vendor-specific JSON shapes, and even that never calls out.

use hmac::{Hmac, Mac};
use reviewbot_model::{CodeEvent, CodeEventAction, CodeEventType};
use sha2::Sha256;

use crate::errors::ProviderError;
use crate::ProviderKind;
use crate::{bitbucket, github, gitlab};

type HmacSha256 = Hmac<Sha256>;

/// Verifies a webhook signature against the configured secret.
///
/// When no secret is configured, validation is skipped by design (a
/// deliberately permissive default for self-hosted setups that trust their
/// network perimeter instead of a shared secret).
pub fn validate_webhook(
    kind: ProviderKind,
    secret: Option<&str>,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), ProviderError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let ok = match kind {
        ProviderKind::GitHub => verify_hmac_sha256(secret, payload, signature_header, "sha256="),
        ProviderKind::Bitbucket => {
            let candidate = signature_header.strip_prefix("sha256=").unwrap_or(signature_header);
            verify_hmac_sha256(secret, payload, candidate, "")
        }
        ProviderKind::GitLab => constant_time_eq(secret.as_bytes(), signature_header.as_bytes()),
    };

    if ok {
        Ok(())
    } else {
        Err(ProviderError::InvalidSignature)
    }
}

fn verify_hmac_sha256(secret: &str, payload: &[u8], signature_hex: &str, prefix: &str) -> bool {
    let Some(hex_digits) = signature_hex.strip_prefix(prefix).or(Some(signature_hex)) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digits) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Constant-time byte comparison so secret comparison never leaks timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parses a vendor webhook body into the normalized event shape.
///
/// `event_hint` is the vendor event-type header (`X-GitHub-Event`,
/// `X-Event-Key`, `X-Gitlab-Event`) where the vendor's own body doesn't
/// carry enough information to classify the action (Bitbucket).
pub fn parse_webhook_event(
    kind: ProviderKind,
    event_hint: Option<&str>,
    payload: &[u8],
) -> Result<CodeEvent, ProviderError> {
    match kind {
        ProviderKind::GitLab => gitlab::parse_webhook_payload(payload),
        ProviderKind::GitHub => github::parse_webhook_payload(event_hint, payload),
        ProviderKind::Bitbucket => bitbucket::parse_webhook_payload(event_hint, payload),
    }
}

/// Pure classification: should this event enter the review pipeline?
///
/// Actions already carry normalized vendor semantics (see `CodeEventAction`),
/// so the only vendor-specific rule left here is the reviewer-added check,
/// and even that is expressed purely in terms of the normalized event.
pub fn is_merge_request_event(event: &CodeEvent, bot_username: &str) -> bool {
    if event.kind != CodeEventType::MergeRequest {
        return false;
    }
    if event.user.username == bot_username {
        return false;
    }
    if !event.merge_request.state.accepts_automatic_review() {
        return false;
    }
    match event.action {
        CodeEventAction::Opened
        | CodeEventAction::Reopened
        | CodeEventAction::Updated
        | CodeEventAction::ReadyForReview => true,
        CodeEventAction::ReviewerAdded => event.merge_request.has_reviewer(bot_username),
        CodeEventAction::Other => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_secret_configured_always_passes() {
        assert!(validate_webhook(ProviderKind::GitHub, None, b"body", "garbage").is_ok());
    }

    #[test]
    fn github_valid_hmac_passes() {
        let secret = "shhh";
        let body = b"{\"a\":1}";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        assert!(validate_webhook(ProviderKind::GitHub, Some(secret), body, &sig).is_ok());
    }

    #[test]
    fn github_tampered_body_fails() {
        let secret = "shhh";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"{\"a\":1}");
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        let err = validate_webhook(ProviderKind::GitHub, Some(secret), b"{\"a\":2}", &sig).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature));
    }

    #[test]
    fn gitlab_bare_token_constant_time_compare() {
        assert!(validate_webhook(ProviderKind::GitLab, Some("t0ken"), b"irrelevant", "t0ken").is_ok());
        assert!(validate_webhook(ProviderKind::GitLab, Some("t0ken"), b"irrelevant", "wrong").is_err());
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
