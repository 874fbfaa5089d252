use thiserror::Error;

use crate::json_recovery::JsonRecoveryError;
use reviewbot_agent_api::AgentApiError;

/// Root error type for agent-level operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] AgentApiError),

    #[error("agent returned an empty response")]
    EmptyResponse,

    #[error("no JSON object found in response")]
    NoJson,

    #[error("could not parse agent response as JSON: {reason}; payload: {snippet}")]
    ParseError { reason: String, snippet: String },
}

impl From<JsonRecoveryError> for AgentError {
    fn from(_: JsonRecoveryError) -> Self {
        AgentError::NoJson
    }
}

/// Trims a payload to a bounded size for diagnostics without leaking
/// unbounded model output into logs.
pub fn trimmed_snippet(payload: &str) -> String {
    const MAX: usize = 2000;
    if payload.len() <= MAX {
        payload.to_string()
    } else {
        format!("{}…", &payload[..MAX])
    }
}
