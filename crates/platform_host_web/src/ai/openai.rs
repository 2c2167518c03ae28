//! OpenAI chat-completions backend, also used for OpenAI-compatible custom endpoints.

use futures::{
    stream::{self, LocalBoxStream},
    StreamExt,
};
use platform_host::{GenerationError, GenerationRequest, ModelInfo, ProviderTag};
use serde::{Deserialize, Serialize};

use super::sse::sse_fragments;

/// Hosted OpenAI API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Model used when a request names none.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize)]
struct ChatMessageBody<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessageBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts `choices[0].delta.content` from one streamed chunk payload.
pub fn parse_stream_chunk(payload: &str) -> Option<String> {
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content),
        Err(err) => {
            tracing::debug!(%err, payload, "skipping unparseable completion chunk");
            None
        }
    }
}

/// Connection to an OpenAI-style chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    provider: ProviderTag,
}

impl OpenAiBackend {
    /// Creates a backend for `provider` rooted at `base_url`.
    pub fn new(
        client: reqwest::Client,
        provider: ProviderTag,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            provider,
        }
    }

    /// Returns the normalized API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Lists models via `GET /models`.
    ///
    /// # Errors
    ///
    /// Returns the transport or HTTP status failure text.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, String> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let response = ensure_success(response).await?;
        let listing: ModelListResponse = response.json().await.map_err(|err| err.to_string())?;
        Ok(listing
            .data
            .into_iter()
            .map(|entry| ModelInfo::named_by_id(entry.id, self.provider))
            .collect())
    }

    async fn send_completion(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, String> {
        let body = ChatCompletionBody {
            model: request.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL),
            messages: vec![ChatMessageBody {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        ensure_success(response).await
    }

    /// Runs a non-streaming completion and returns `choices[0].message.content`.
    ///
    /// # Errors
    ///
    /// Returns the transport, HTTP status, or decoding failure text.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, String> {
        let response = self.send_completion(request, false).await?;
        let completion: CompletionResponse =
            response.json().await.map_err(|err| err.to_string())?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Starts a completion and yields text fragments.
    ///
    /// Non-streaming requests yield the whole reply as a single fragment.
    pub fn stream(
        &self,
        request: GenerationRequest,
    ) -> LocalBoxStream<'static, Result<String, GenerationError>> {
        let backend = self.clone();
        if !request.stream {
            return stream::once(async move {
                backend
                    .complete(&request)
                    .await
                    .map_err(GenerationError::Generation)
            })
            .boxed_local();
        }

        stream::once(async move { backend.send_completion(&request, true).await })
            .map(|opened| match opened {
                Ok(response) => sse_fragments(response.bytes_stream(), parse_stream_chunk),
                Err(err) => stream::once(async move { Err(GenerationError::Generation(err)) })
                    .boxed_local(),
            })
            .flatten()
            .boxed_local()
    }
}

/// Converts non-2xx responses into an error carrying status and body text.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(format!("{status}: {body}"))
}
