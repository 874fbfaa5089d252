use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::common::build_http_client;
use crate::errors::{AgentApiError, make_snippet, map_status};
use crate::types::{ApiRequest, ApiResponse, ResponseType, TransportConfig};

const VENDOR: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug)]
pub struct OpenAiClient {
    client: reqwest::Client,
    cfg: TransportConfig,
    url: String,
}

impl OpenAiClient {
    pub fn new(cfg: TransportConfig) -> Result<Self, AgentApiError> {
        let client = build_http_client(&cfg).map_err(|source| AgentApiError::Transport {
            vendor: VENDOR,
            source,
        })?;
        let base = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));
        Ok(Self { client, cfg, url })
    }

    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, AgentApiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        let response_format = matches!(request.response_type, ResponseType::ApplicationJson)
            .then_some(ResponseFormat { kind: "json_object" });

        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format,
        };

        debug!(model = %self.cfg.model, "POST {}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| AgentApiError::Transport {
                vendor: VENDOR,
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(%status, %snippet, "openai chat completion returned non-success status");
            return Err(map_status(VENDOR, status, snippet));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| AgentApiError::Decode {
            vendor: VENDOR,
            reason: e.to_string(),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(AgentApiError::EmptyResponse { vendor: VENDOR })?;

        if content.is_empty() {
            return Err(AgentApiError::EmptyResponse { vendor: VENDOR });
        }

        let usage = parsed.usage.unwrap_or_default();
        Ok(ApiResponse {
            create_time: chrono::Utc::now(),
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base_url: String) -> TransportConfig {
        TransportConfig {
            vendor: crate::types::Vendor::OpenAi,
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            base_url: Some(base_url),
            proxy_url: None,
            timeout: std::time::Duration::from_secs(5),
            user_agent: "reviewbot-test".into(),
        }
    }

    fn request() -> ApiRequest {
        ApiRequest {
            prompt: "review this".into(),
            system_prompt: Some("be terse".into()),
            max_tokens: 256,
            temperature: 0.2,
            response_type: ResponseType::TextPlain,
        }
    }

    #[tokio::test]
    async fn parses_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"content":"looks fine"}}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
            )
            .create_async()
            .await;

        let client = OpenAiClient::new(cfg(server.url())).unwrap();
        let resp = client.call(&request()).await.unwrap();
        assert_eq!(resp.content, "looks fine");
        assert_eq!(resp.total_tokens, 15);
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let client = OpenAiClient::new(cfg(server.url())).unwrap();
        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(err, AgentApiError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn empty_choices_is_a_hard_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(cfg(server.url())).unwrap();
        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(err, AgentApiError::EmptyResponse { .. }));
    }
}
