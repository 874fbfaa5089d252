//! Layered YAML + environment configuration.
//!
//! The YAML file (default `./reviewbot.yaml`) is read first; environment
//! variables prefixed `REVIEWBOT__` then override it field by field, `__`
//! mirroring the section path (e.g. `REVIEWBOT__AGENT__API_KEY`).

use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;

fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    10_000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_user_agent() -> String {
    "reviewbot/0.1".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_true() -> bool {
    true
}
fn default_rate_limit_wait_secs() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    4
}
fn default_agent_timeout_secs() -> u64 {
    30
}
fn default_run_timeout_secs() -> u64 {
    600
}
fn default_max_page_count() -> u32 {
    50
}
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_webhook_path_prefix() -> String {
    "/webhook".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(rename = "type")]
    pub kind: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub base_url: Option<String>,
    pub proxy_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default = "default_true")]
    pub json_recovery: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    #[serde(rename = "type")]
    pub kind: String,
    pub base_url: Option<String>,
    pub token: String,
    pub webhook_secret: Option<String>,
    pub bot_username: String,
    #[serde(default = "default_rate_limit_wait_secs")]
    pub rate_limit_wait: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout: u64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout: u64,
    #[serde(default = "default_max_page_count")]
    pub max_page_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_webhook_path_prefix")]
    pub webhook_path_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub provider: ProviderSection,
    #[serde(default = "pipeline_default")]
    pub pipeline: PipelineSection,
    #[serde(default = "server_default")]
    pub server: ServerSection,
}

fn pipeline_default() -> PipelineSection {
    PipelineSection {
        max_concurrency: default_max_concurrency(),
        agent_timeout: default_agent_timeout_secs(),
        run_timeout: default_run_timeout_secs(),
        max_page_count: default_max_page_count(),
    }
}

fn server_default() -> ServerSection {
    ServerSection {
        bind_addr: default_bind_addr(),
        webhook_path_prefix: default_webhook_path_prefix(),
    }
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(config::File::from(std::path::Path::new(path)).required(false))
            .add_source(config::Environment::with_prefix("REVIEWBOT").separator("__"))
            .build()?;
        let cfg: AppConfig = raw.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("agent.api_key must not be empty".into()));
        }
        if self.provider.token.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.token must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.agent.temperature) {
            return Err(ConfigError::Invalid("agent.temperature must be in [0, 1]".into()));
        }
        if crate::wiring::parse_vendor(&self.agent.kind).is_none() {
            return Err(ConfigError::Invalid(format!("unknown agent.type '{}'", self.agent.kind)));
        }
        if reviewbot_provider::ProviderKind::from_label(&self.provider.kind).is_none() {
            return Err(ConfigError::Invalid(format!("unknown provider.type '{}'", self.provider.kind)));
        }
        Ok(())
    }
}

impl AgentSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

impl ProviderSection {
    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait)
    }
}

impl PipelineSection {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout)
    }
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout)
    }
}
