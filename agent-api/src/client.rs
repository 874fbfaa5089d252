use crate::claude::ClaudeClient;
use crate::errors::AgentApiError;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;
use crate::types::{ApiRequest, ApiResponse, TransportConfig, Vendor};

/// One capability surface over three model vendors, dispatched by tag rather
/// than a trait object so each vendor's request/response shape stays a
/// private implementation detail of its own module.
#[derive(Debug)]
pub enum AgentApiClient {
    Gemini(GeminiClient),
    OpenAi(OpenAiClient),
    Claude(ClaudeClient),
}

impl AgentApiClient {
    pub fn new(cfg: TransportConfig) -> Result<Self, AgentApiError> {
        Ok(match cfg.vendor {
            Vendor::Gemini => AgentApiClient::Gemini(GeminiClient::new(cfg)?),
            Vendor::OpenAi => AgentApiClient::OpenAi(OpenAiClient::new(cfg)?),
            Vendor::Claude => AgentApiClient::Claude(ClaudeClient::new(cfg)?),
        })
    }

    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, AgentApiError> {
        match self {
            AgentApiClient::Gemini(c) => c.call(request).await,
            AgentApiClient::OpenAi(c) => c.call(request).await,
            AgentApiClient::Claude(c) => c.call(request).await,
        }
    }
}
