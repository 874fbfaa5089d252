//! Error taxonomy for the review pipeline.

use thiserror::Error;

use reviewbot_agent::AgentError;
use reviewbot_provider::ProviderError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("the merge request's head moved while this run was in flight")]
    Superseded,

    #[error("run exceeded its deadline")]
    Timeout,

    #[error("run was cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Transient errors are retried by the caller with backoff; everything
    /// else is either permanent (drop the file, keep going) or terminal for
    /// this run (`Superseded`/`Timeout`/`Cancelled`).
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Provider(e) => matches!(
                e,
                ProviderError::Transport { .. } | ProviderError::RateLimited { .. } | ProviderError::ProviderUnavailable { .. }
            ),
            PipelineError::Agent(AgentError::Transport(api_err)) => matches!(
                api_err,
                reviewbot_agent_api::AgentApiError::Timeout { .. }
                    | reviewbot_agent_api::AgentApiError::Transport { .. }
                    | reviewbot_agent_api::AgentApiError::RateLimited { .. }
                    | reviewbot_agent_api::AgentApiError::Server { .. }
            ),
            _ => false,
        }
    }

    pub fn is_terminal_for_run(&self) -> bool {
        matches!(self, PipelineError::Superseded | PipelineError::Timeout | PipelineError::Cancelled)
    }
}
