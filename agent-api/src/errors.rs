use reqwest::StatusCode;
use thiserror::Error;

/// Trims an error body to a bounded, loggable snippet.
pub fn make_snippet(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        body.to_string()
    } else {
        format!("{}…", &body[..MAX])
    }
}

#[derive(Debug, Error)]
pub enum AgentApiError {
    #[error("transport error calling {vendor}: {source}")]
    Transport {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{vendor} rejected credentials (401)")]
    Unauthorized { vendor: &'static str },
    #[error("{vendor} denied the request (403)")]
    Forbidden { vendor: &'static str },
    #[error("{vendor} endpoint not found (404)")]
    NotFound { vendor: &'static str },
    #[error("{vendor} rate limited the request (429)")]
    RateLimited { vendor: &'static str },
    #[error("{vendor} rejected the request: {snippet}")]
    BadRequest { vendor: &'static str, snippet: String },
    #[error("{vendor} server error ({status}): {snippet}")]
    Server {
        vendor: &'static str,
        status: u16,
        snippet: String,
    },
    #[error("{vendor} response could not be decoded: {reason}")]
    Decode { vendor: &'static str, reason: String },
    #[error("{vendor} returned an empty response")]
    EmptyResponse { vendor: &'static str },
    #[error("request to {vendor} timed out")]
    Timeout { vendor: &'static str },
}

/// Maps an HTTP status plus a response-body snippet onto the typed taxonomy.
/// Vendor-specific callers may refine ambiguous statuses (Gemini's 400)
/// before falling back to this.
pub fn map_status(vendor: &'static str, status: StatusCode, snippet: String) -> AgentApiError {
    match status {
        StatusCode::UNAUTHORIZED => AgentApiError::Unauthorized { vendor },
        StatusCode::FORBIDDEN => AgentApiError::Forbidden { vendor },
        StatusCode::NOT_FOUND => AgentApiError::NotFound { vendor },
        StatusCode::TOO_MANY_REQUESTS => AgentApiError::RateLimited { vendor },
        s if s.is_server_error() => AgentApiError::Server {
            vendor,
            status: s.as_u16(),
            snippet,
        },
        _ => AgentApiError::BadRequest { vendor, snippet },
    }
}
