//! Wraps the prompt builder and the vendor transport behind four
//! task-level operations, owning JSON parsing/repair and token accounting.

mod errors;
mod json_recovery;

pub use errors::AgentError;
pub use json_recovery::{JsonRecoveryError, recover_json};

use std::sync::atomic::{AtomicU64, Ordering};

use reviewbot_agent_api::{AgentApiClient, ApiRequest, ResponseType};
use reviewbot_model::{FileChangeInfo, FileReviewResult};
use reviewbot_prompt::{Operation, PromptInput, build};

/// `max_tokens = 0` in configuration means "vendor default"; no vendor in
/// this stack accepts an explicit absence of the field, so a generous
/// conventional ceiling stands in for it.
const VENDOR_DEFAULT_MAX_TOKENS: u32 = 4096;

/// Tunables the pipeline sets once at startup from configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub language: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Disabling this turns malformed JSON into a hard `ParseError` instead
    /// of attempting repair.
    pub json_recovery: bool,
}

impl AgentConfig {
    fn effective_max_tokens(&self) -> u32 {
        if self.max_tokens == 0 {
            VENDOR_DEFAULT_MAX_TOKENS
        } else {
            self.max_tokens
        }
    }

    fn effective_temperature(&self) -> f32 {
        if (0.0..=1.0).contains(&self.temperature) {
            self.temperature
        } else {
            0.5
        }
    }
}

/// Running token totals across every operation this agent has performed.
#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
    total: AtomicU64,
}

/// A snapshot of `TokenUsage` at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsageSnapshot {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    fn record(&self, prompt: u32, completion: u32, total: u32) {
        self.prompt.fetch_add(prompt as u64, Ordering::Relaxed);
        self.completion.fetch_add(completion as u64, Ordering::Relaxed);
        self.total.fetch_add(total as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TokenUsageSnapshot {
        TokenUsageSnapshot {
            prompt_tokens: self.prompt.load(Ordering::Relaxed),
            completion_tokens: self.completion.load(Ordering::Relaxed),
            total_tokens: self.total.load(Ordering::Relaxed),
        }
    }
}

/// The four task-level operations the pipeline drives, plus per-MR token
/// accounting. Safe to share across concurrent reviews via `Arc`.
pub struct Agent {
    api: AgentApiClient,
    config: AgentConfig,
    usage: TokenUsage,
}

impl Agent {
    pub fn new(api: AgentApiClient, config: AgentConfig) -> Self {
        Self {
            api,
            config,
            usage: TokenUsage::default(),
        }
    }

    pub fn token_usage(&self) -> TokenUsageSnapshot {
        self.usage.snapshot()
    }

    async fn call(&self, input: PromptInput<'_>, op: Operation, response_type: ResponseType) -> Result<String, AgentError> {
        let rendered = build(op, &self.config.language, &input);
        let request = ApiRequest {
            prompt: rendered.user_prompt,
            system_prompt: Some(rendered.system_prompt),
            max_tokens: self.config.effective_max_tokens(),
            temperature: self.config.effective_temperature(),
            response_type,
        };
        let response = self.api.call(&request).await?;
        if response.content.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        self.usage.record(
            response.prompt_tokens,
            response.completion_tokens,
            response.total_tokens,
        );
        Ok(response.content)
    }

    async fn call_json(&self, input: PromptInput<'_>, op: Operation) -> Result<String, AgentError> {
        let content = self.call(input, op, ResponseType::ApplicationJson).await?;
        if !self.config.json_recovery {
            return Ok(content);
        }
        match recover_json(&content) {
            Ok(recovered) => Ok(recovered),
            Err(_) => Err(AgentError::NoJson),
        }
    }

    pub async fn generate_description(&self, diff: &str) -> Result<String, AgentError> {
        self.call(
            PromptInput::Description { diff },
            Operation::Description,
            ResponseType::TextPlain,
        )
        .await
    }

    pub async fn generate_changes_overview(&self, diff: &str) -> Result<Vec<FileChangeInfo>, AgentError> {
        let raw = self
            .call_json(PromptInput::ChangesOverview { diff }, Operation::ChangesOverview)
            .await?;
        deserialize(&raw)
    }

    pub async fn generate_architecture_review(&self, diff: &str) -> Result<String, AgentError> {
        self.call(
            PromptInput::ArchitectureReview { diff },
            Operation::ArchitectureReview,
            ResponseType::TextPlain,
        )
        .await
    }

    pub async fn review_code(
        &self,
        filename: &str,
        full_file_content: &str,
        clean_diff: &str,
    ) -> Result<FileReviewResult, AgentError> {
        let raw = self
            .call_json(
                PromptInput::ReviewCode {
                    filename,
                    full_file_content,
                    clean_diff,
                },
                Operation::ReviewCode,
            )
            .await?;
        deserialize(&raw)
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    serde_json::from_str(raw).map_err(|e| AgentError::ParseError {
        reason: e.to_string(),
        snippet: errors::trimmed_snippet(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentConfig {
        AgentConfig {
            language: "en".into(),
            max_tokens: 0,
            temperature: 5.0,
            json_recovery: true,
        }
    }

    #[test]
    fn zero_max_tokens_means_vendor_default() {
        assert_eq!(config().effective_max_tokens(), VENDOR_DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn out_of_range_temperature_clamps_to_default() {
        assert_eq!(config().effective_temperature(), 0.5);
    }

    #[test]
    fn in_range_temperature_passes_through() {
        let mut cfg = config();
        cfg.temperature = 0.2;
        assert_eq!(cfg.effective_temperature(), 0.2);
    }

    #[test]
    fn token_usage_accumulates_across_calls() {
        let usage = TokenUsage::default();
        usage.record(10, 5, 15);
        usage.record(3, 2, 5);
        let snapshot = usage.snapshot();
        assert_eq!(snapshot.prompt_tokens, 13);
        assert_eq!(snapshot.completion_tokens, 7);
        assert_eq!(snapshot.total_tokens, 20);
    }
}
