//! Builds the runtime object graph (agent, provider client, pipeline
//! runner) from a loaded `AppConfig`. Kept separate from `config.rs` so
//! parsing/validation stays pure and this module is the only place that
//! touches the concrete crates being wired together.

use std::sync::Arc;

use reviewbot_agent::{Agent, AgentConfig};
use reviewbot_agent_api::{AgentApiClient, TransportConfig, Vendor};
use reviewbot_pipeline::{MrStateTable, PipelineConfig, ReviewRunner};
use reviewbot_provider::{ProviderClient, ProviderConfig, ProviderKind};

use crate::config::AppConfig;
use crate::errors::RuntimeError;

pub fn parse_vendor(s: &str) -> Option<Vendor> {
    match s {
        "gemini" => Some(Vendor::Gemini),
        "openai" => Some(Vendor::OpenAi),
        "claude" => Some(Vendor::Claude),
        _ => None,
    }
}

fn default_base_api(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::GitLab => "https://gitlab.com/api/v4",
        ProviderKind::GitHub => "https://api.github.com",
        ProviderKind::Bitbucket => "https://api.bitbucket.org/2.0",
    }
}

/// Everything `main.rs` needs to serve webhooks, poll, or run a one-shot
/// review: the provider client, the pipeline runner and its state table.
pub struct Wired {
    pub provider_kind: ProviderKind,
    pub provider: Arc<ProviderClient>,
    pub runner: Arc<ReviewRunner>,
    pub table: Arc<MrStateTable>,
    pub webhook_secret: Option<String>,
    pub bot_username: String,
}

pub fn build(cfg: &AppConfig) -> Result<Wired, RuntimeError> {
    let vendor = parse_vendor(&cfg.agent.kind)
        .expect("validated at config load time");
    let transport = TransportConfig {
        vendor,
        api_key: cfg.agent.api_key.clone(),
        model: cfg.agent.model.clone(),
        base_url: cfg.agent.base_url.clone(),
        proxy_url: cfg.agent.proxy_url.clone(),
        timeout: cfg.agent.timeout(),
        user_agent: cfg.agent.user_agent.clone(),
    };
    let api = AgentApiClient::new(transport).map_err(reviewbot_agent::AgentError::from)?;
    let agent = Agent::new(
        api,
        AgentConfig {
            language: cfg.agent.language.clone(),
            max_tokens: cfg.agent.max_tokens,
            temperature: cfg.agent.temperature,
            json_recovery: cfg.agent.json_recovery,
        },
    );

    let provider_kind = ProviderKind::from_label(&cfg.provider.kind).expect("validated at config load time");
    let provider_cfg = ProviderConfig {
        kind: provider_kind,
        base_api: cfg
            .provider
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_api(provider_kind).to_string()),
        token: cfg.provider.token.clone(),
        webhook_secret: cfg.provider.webhook_secret.clone(),
        bot_username: cfg.provider.bot_username.clone(),
    };
    let provider = Arc::new(ProviderClient::from_config(provider_cfg)?);

    let pipeline_cfg = PipelineConfig {
        max_concurrency: cfg.pipeline.max_concurrency,
        agent_timeout: cfg.pipeline.agent_timeout(),
        run_timeout: cfg.pipeline.run_timeout(),
        max_page_count: cfg.pipeline.max_page_count,
        rate_limit_wait: cfg.provider.rate_limit_wait(),
        max_retries: cfg.agent.max_retries,
        retry_delay: cfg.agent.retry_delay(),
    };
    let runner = Arc::new(ReviewRunner::new(provider.clone(), Arc::new(agent), pipeline_cfg));
    let table = Arc::new(MrStateTable::new());

    Ok(Wired {
        provider_kind,
        provider,
        runner,
        table,
        webhook_secret: cfg.provider.webhook_secret.clone(),
        bot_username: cfg.provider.bot_username.clone(),
    })
}
