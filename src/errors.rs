//! Top-level error taxonomy for the binary: the only place that distinguishes
//! a configuration failure (fatal, exit 1) from everything else (exit 2).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] reviewbot_provider::ProviderError),

    #[error(transparent)]
    Agent(#[from] reviewbot_agent::AgentError),

    #[error(transparent)]
    Pipeline(#[from] reviewbot_pipeline::PipelineError),

    #[error("failed to bind {0}: {1}")]
    Bind(String, #[source] std::io::Error),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("merge/pull request {0}!{1} is closed or merged; pass --force to review it anyway")]
    RefusedClosedMergeRequest(String, u64),
}
