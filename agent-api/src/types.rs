use chrono::{DateTime, Utc};

/// How the caller wants the response content shaped. `ApplicationJson`
/// signals the vendor adapter to ask for a JSON-constrained response where
/// the vendor API supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    TextPlain,
    ApplicationJson,
}

/// A vendor-agnostic request to the Agent API transport.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_type: ResponseType,
}

/// A vendor-agnostic response from the Agent API transport.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub create_time: DateTime<Utc>,
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The three supported model vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Gemini,
    OpenAi,
    Claude,
}

impl Vendor {
    pub fn label(self) -> &'static str {
        match self {
            Vendor::Gemini => "gemini",
            Vendor::OpenAi => "openai",
            Vendor::Claude => "claude",
        }
    }
}

/// Transport-level settings shared by every vendor adapter.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub vendor: Vendor,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub proxy_url: Option<String>,
    pub timeout: std::time::Duration,
    pub user_agent: String,
}
