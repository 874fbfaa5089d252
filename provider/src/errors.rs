//! Error taxonomy for the VCS provider layer.
//!
//! Mirrors the shape the agent-api crate uses for vendor transports: typed
//! variants for the status codes the pipeline reacts to differently, one
//! catch-all for everything else, and a `From<reqwest::Error>` conversion so
//! call sites can use `?` without hand-rolled status matching.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("[{vendor}] transport error: {source}")]
    Transport {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{vendor}] unauthorized")]
    Unauthorized { vendor: &'static str },

    #[error("[{vendor}] forbidden")]
    Forbidden { vendor: &'static str },

    #[error("[{vendor}] not found")]
    NotFound { vendor: &'static str },

    #[error("[{vendor}] rate limited")]
    RateLimited {
        vendor: &'static str,
        retry_after_secs: Option<u64>,
    },

    #[error("[{vendor}] bad request: {detail}")]
    BadRequest { vendor: &'static str, detail: String },

    #[error("[{vendor}] server error (status {status})")]
    ProviderUnavailable { vendor: &'static str, status: u16 },

    #[error("[{vendor}] could not parse response: {reason}")]
    ParseError { vendor: &'static str, reason: String },

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid project identifier '{0}'")]
    InvalidProjectId(String),

    #[error("unsupported operation for this provider")]
    Unsupported,
}

/// Maps a failed response's status into a typed `ProviderError`.
///
/// `4xx` other than 401/403/404/429 becomes `BadRequest`; `5xx` becomes
/// `ProviderUnavailable`, which the pipeline's retry budget escalates to
/// after exhausting its own retries.
pub fn map_status(vendor: &'static str, status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 => ProviderError::Unauthorized { vendor },
        403 => ProviderError::Forbidden { vendor },
        404 => ProviderError::NotFound { vendor },
        429 => ProviderError::RateLimited {
            vendor,
            retry_after_secs: None,
        },
        500..=599 => ProviderError::ProviderUnavailable {
            vendor,
            status: status.as_u16(),
        },
        _ => ProviderError::BadRequest { vendor, detail: body },
    }
}

pub(crate) fn transport(vendor: &'static str) -> impl Fn(reqwest::Error) -> ProviderError {
    move |source| ProviderError::Transport { vendor, source }
}
