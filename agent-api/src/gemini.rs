use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::common::build_http_client;
use crate::errors::{AgentApiError, make_snippet, map_status};
use crate::types::{ApiRequest, ApiResponse, ResponseType, TransportConfig};

const VENDOR: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    cfg: TransportConfig,
    base_url: String,
}

impl GeminiClient {
    pub fn new(cfg: TransportConfig) -> Result<Self, AgentApiError> {
        let client = build_http_client(&cfg).map_err(|source| AgentApiError::Transport {
            vendor: VENDOR,
            source,
        })?;
        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            cfg,
            base_url,
        })
    }

    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, AgentApiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.cfg.model
        );

        let mime_type = match request.response_type {
            ResponseType::ApplicationJson => "application/json",
            ResponseType::TextPlain => "text/plain",
        };

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: request.prompt.clone() }],
            }],
            system_instruction: request.system_prompt.as_ref().map(|text| Content {
                role: "user",
                parts: vec![Part { text: text.clone() }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: mime_type,
            },
        };

        debug!(model = %self.cfg.model, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.cfg.api_key.as_str())])
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
            error!(%status, %snippet, "gemini generateContent returned non-success status");
            return Err(refine_gemini_error(status, &text, snippet));
        }

        let parsed: GenerateContentResponse = resp.json().await.map_err(|e| AgentApiError::Decode {
            vendor: VENDOR,
            reason: e.to_string(),
        })?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or(AgentApiError::EmptyResponse { vendor: VENDOR })?;

        if content.is_empty() {
            return Err(AgentApiError::EmptyResponse { vendor: VENDOR });
        }

        let usage = parsed.usage_metadata.unwrap_or_default();
        Ok(ApiResponse {
            create_time: chrono::Utc::now(),
            content,
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        })
    }
}

/// Gemini sometimes returns 400 for both genuinely bad requests and region
/// restrictions; scan the body for vendor-specific markers before falling
/// back to the generic status mapping.
fn refine_gemini_error(status: reqwest::StatusCode, body: &str, snippet: String) -> AgentApiError {
    if status == reqwest::StatusCode::BAD_REQUEST {
        if body.contains("RESOURCE_EXHAUSTED") || body.contains("rate limit") {
            return AgentApiError::RateLimited { vendor: VENDOR };
        }
        if body.contains("API_KEY_INVALID") || body.contains("PERMISSION_DENIED") {
            return AgentApiError::Unauthorized { vendor: VENDOR };
        }
        if body.contains("location is not supported") || body.contains("FAILED_PRECONDITION") {
            return AgentApiError::Forbidden { vendor: VENDOR };
        }
    }
    map_status(VENDOR, status, snippet)
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig<'a> {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Default)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(base_url: String) -> TransportConfig {
        TransportConfig {
            vendor: crate::types::Vendor::Gemini,
            api_key: "test-key".into(),
            model: "gemini-1.5-flash".into(),
            base_url: Some(base_url),
            proxy_url: None,
            timeout: std::time::Duration::from_secs(5),
            user_agent: "reviewbot-test".into(),
        }
    }

    fn request() -> ApiRequest {
        ApiRequest {
            prompt: "review this".into(),
            system_prompt: None,
            max_tokens: 256,
            temperature: 0.2,
            response_type: ResponseType::TextPlain,
        }
    }

    #[tokio::test]
    async fn parses_successful_generate_content() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/v1beta/models/{}:generateContent", "gemini-1.5-flash");
        let _m = server
            .mock("POST", path.as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"looks fine"}]}}],"usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":2,"totalTokenCount":5}}"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::new(cfg(server.url())).unwrap();
        let resp = client.call(&request()).await.unwrap();
        assert_eq!(resp.content, "looks fine");
        assert_eq!(resp.total_tokens, 5);
    }

    #[tokio::test]
    async fn ambiguous_400_with_resource_exhausted_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/v1beta/models/{}:generateContent", "gemini-1.5-flash");
        let _m = server
            .mock("POST", path.as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED","message":"quota"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(cfg(server.url())).unwrap();
        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(err, AgentApiError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn ordinary_400_maps_to_bad_request() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/v1beta/models/{}:generateContent", "gemini-1.5-flash");
        let _m = server
            .mock("POST", path.as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"status":"INVALID_ARGUMENT","message":"bad field"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(cfg(server.url())).unwrap();
        let err = client.call(&request()).await.unwrap_err();
        assert!(matches!(err, AgentApiError::BadRequest { .. }));
    }
}
