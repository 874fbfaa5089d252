use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::common::build_http_client;
use crate::errors::{AgentApiError, make_snippet, map_status};
use crate::types::{ApiRequest, ApiResponse, TransportConfig};

const VENDOR: &str = "claude";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct ClaudeClient {
    client: reqwest::Client,
    cfg: TransportConfig,
    url: String,
}

impl ClaudeClient {
    pub fn new(cfg: TransportConfig) -> Result<Self, AgentApiError> {
        let client = build_http_client(&cfg).map_err(|source| AgentApiError::Transport {
            vendor: VENDOR,
            source,
        })?;
        let base = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let url = format!("{}/v1/messages", base.trim_end_matches('/'));
        Ok(Self { client, cfg, url })
    }

    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, AgentApiError> {
        let body = MessagesRequest {
            model: &self.cfg.model,
            system: request.system_prompt.clone(),
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.cfg.model, "POST {}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.cfg.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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
            error!(%status, %snippet, "claude messages call returned non-success status");
            return Err(map_status(VENDOR, status, snippet));
        }

        let parsed: MessagesResponse = resp.json().await.map_err(|e| AgentApiError::Decode {
            vendor: VENDOR,
            reason: e.to_string(),
        })?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| (block.kind == "text").then_some(block.text))
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(AgentApiError::EmptyResponse { vendor: VENDOR });
        }

        let usage = parsed.usage.unwrap_or_default();
        Ok(ApiResponse {
            create_time: chrono::Utc::now(),
            content,
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base_url: String) -> TransportConfig {
        TransportConfig {
            vendor: crate::types::Vendor::Claude,
            api_key: "sk-ant-test".into(),
            model: "claude-3-5-sonnet".into(),
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
            response_type: crate::types::ResponseType::TextPlain,
        }
    }

    #[tokio::test]
    async fn concatenates_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(
                r#"{"content":[{"type":"text","text":"part one "},{"type":"text","text":"part two"}],"usage":{"input_tokens":4,"output_tokens":6}}"#,
            )
            .create_async()
            .await;

        let client = ClaudeClient::new(cfg(server.url())).unwrap();
        let resp = client.call(&request()).await.unwrap();
        assert_eq!(resp.content, "part one part two");
        assert_eq!(resp.total_tokens, 10);
    }

    #[tokio::test]
    async fn maps_401_to_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let client = ClaudeClient::new(cfg(server.url())).unwrap();
        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(err, AgentApiError::Unauthorized { .. }));
    }
}
