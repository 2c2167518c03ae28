//! Anthropic messages backend. Replies are delivered as a single fragment.

use futures::stream::{self, LocalBoxStream, StreamExt};
use platform_host::{GenerationError, GenerationRequest, ModelInfo, ProviderTag};
use serde::{Deserialize, Serialize};

use super::openai::ensure_success;

/// Hosted Anthropic API root.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
/// Model used when a request names none.
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-2";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequestBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Models offered for the Anthropic provider.
pub fn anthropic_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "claude-2".to_string(),
            name: "Claude 2".to_string(),
            provider: ProviderTag::Anthropic,
        },
        ModelInfo {
            id: "claude-instant-1".to_string(),
            name: "Claude Instant".to_string(),
            provider: ProviderTag::Anthropic,
        },
    ]
}

fn first_text(response: MessagesResponse) -> Result<String, String> {
    response
        .content
        .into_iter()
        .next()
        .and_then(|block| block.text)
        .ok_or_else(|| "response contained no text content".to_string())
}

/// Connection to the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicBackend {
    /// Creates a backend; `base_url` overrides the hosted API root.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or(ANTHROPIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.into(),
        }
    }

    /// Sends one `POST /messages` call and returns the first text block.
    ///
    /// # Errors
    ///
    /// Returns the transport, HTTP status, or decoding failure text.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, String> {
        let body = MessagesRequestBody {
            model: request.model.as_deref().unwrap_or(ANTHROPIC_DEFAULT_MODEL),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![MessageBody {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-dangerous-direct-browser-access", "true")
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let response = ensure_success(response).await?;
        let parsed: MessagesResponse = response.json().await.map_err(|err| err.to_string())?;
        first_text(parsed)
    }

    /// Runs the request and yields the reply as one fragment.
    pub fn stream(
        &self,
        request: GenerationRequest,
    ) -> LocalBoxStream<'static, Result<String, GenerationError>> {
        let backend = self.clone();
        stream::once(async move {
            backend
                .complete(&request)
                .await
                .map_err(GenerationError::Generation)
        })
        .boxed_local()
    }
}
