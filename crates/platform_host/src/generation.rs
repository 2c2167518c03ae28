//! Text-generation provider contracts shared by the chat engine and network adapters.
//!
//! A [`GenerationService`] is configured with one [`ProviderConfig`] at a time and exposes model
//! enumeration plus streamed text generation. Fragments arrive through a [`GenerationStream`];
//! the stream ending is the completion signal and an `Err` item is the failure signal, which
//! lets consumers wrap the stream for cancellation without touching adapters.

use std::{cell::RefCell, collections::VecDeque, fmt, future::Future, pin::Pin, rc::Rc, str::FromStr};

use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Preference key under which hosts mirror the active provider configuration.
pub const AI_SERVICE_CONFIG_KEY: &str = "ai_service_config";
/// Placeholder key sent to custom endpoints configured without one.
pub const CUSTOM_PROVIDER_PLACEHOLDER_KEY: &str = "not-needed";

/// Object-safe boxed future used by [`GenerationService`] async methods.
pub type GenerationFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Ordered stream of generated text fragments.
pub type GenerationStream<'a> = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + 'a>>;

/// Backend selector for text generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// Hosted OpenAI API.
    #[default]
    OpenAi,
    /// Hosted Anthropic API.
    Anthropic,
    /// Any OpenAI-compatible endpoint reachable at a configured base URL.
    Custom,
}

impl ProviderTag {
    /// Returns the stable lowercase token used in persisted configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTag {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown provider `{other}`")),
        }
    }
}

/// Connection settings for one generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Selected backend.
    pub provider: ProviderTag,
    /// API credential; may be empty for custom endpoints.
    #[serde(default)]
    pub api_key: String,
    /// Endpoint base URL; required for [`ProviderTag::Custom`].
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Creates a configuration without a base URL.
    pub fn new(provider: ProviderTag, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Sets the endpoint base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns the trimmed base URL when one is set and non-empty.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Checks the per-provider required fields.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MissingBaseUrl`] for a custom provider without a base URL and
    /// [`GenerationError::MissingApiKey`] for hosted providers without a key.
    pub fn validate(&self) -> Result<(), GenerationError> {
        match self.provider {
            ProviderTag::Custom => {
                if self.base_url().is_none() {
                    return Err(GenerationError::MissingBaseUrl);
                }
            }
            ProviderTag::OpenAi | ProviderTag::Anthropic => {
                if self.api_key.trim().is_empty() {
                    return Err(GenerationError::MissingApiKey(self.provider));
                }
            }
        }
        Ok(())
    }
}

/// Model advertised by a configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider-side model identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Provider that serves the model.
    pub provider: ProviderTag,
}

impl ModelInfo {
    /// Creates a model entry whose display name equals its id.
    pub fn named_by_id(id: impl Into<String>, provider: ProviderTag) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider,
        }
    }
}

/// One single-prompt generation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationRequest {
    /// User prompt text.
    pub prompt: String,
    /// Model override; adapters fall back to a provider default.
    pub model: Option<String>,
    /// Completion token ceiling.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Whether the caller wants incremental fragments.
    pub stream: bool,
}

impl GenerationRequest {
    /// Creates a non-streaming request for `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Targets a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Caps completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Requests incremental delivery.
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Failures reported by generation providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// A custom provider was configured without an endpoint.
    #[error("Base URL is required for custom provider")]
    MissingBaseUrl,
    /// A hosted provider was configured without a credential.
    #[error("API key is required for {0} provider")]
    MissingApiKey(ProviderTag),
    /// No backend has been configured yet.
    #[error("No AI provider configured")]
    NotConfigured,
    /// The backend rejected the configuration or could not be reached while configuring.
    #[error("Failed to configure AI service: {0}")]
    Configuration(String),
    /// The backend failed while enumerating models.
    #[error("Failed to fetch models: {0}")]
    Models(String),
    /// The backend failed while generating.
    #[error("AI generation failed: {0}")]
    Generation(String),
}

/// Host service wrapping the configured text-generation backend.
pub trait GenerationService {
    /// Replaces the active backend with one built from `config`.
    fn configure<'a>(
        &'a self,
        config: &'a ProviderConfig,
    ) -> GenerationFuture<'a, Result<(), GenerationError>>;

    /// Returns whether a backend is configured.
    fn is_configured(&self) -> bool;

    /// Returns the configured provider tag.
    fn provider(&self) -> Option<ProviderTag>;

    /// Enumerates models offered by the configured backend.
    fn list_models<'a>(&'a self) -> GenerationFuture<'a, Result<Vec<ModelInfo>, GenerationError>>;

    /// Starts a generation and yields text fragments in arrival order.
    fn stream_text<'a>(&'a self, request: GenerationRequest) -> GenerationStream<'a>;

    /// Runs a generation to completion and returns the concatenated text.
    fn generate_text<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> GenerationFuture<'a, Result<String, GenerationError>> {
        Box::pin(async move {
            let mut fragments = self.stream_text(request);
            let mut text = String::new();
            while let Some(fragment) = fragments.next().await {
                text.push_str(&fragment?);
            }
            Ok(text)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Generation service for hosts without any backend; every call reports `NotConfigured`.
pub struct NoopGenerationService;

impl GenerationService for NoopGenerationService {
    fn configure<'a>(
        &'a self,
        _config: &'a ProviderConfig,
    ) -> GenerationFuture<'a, Result<(), GenerationError>> {
        Box::pin(async {
            Err(GenerationError::Configuration(
                "no generation backend available on this host".to_string(),
            ))
        })
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn provider(&self) -> Option<ProviderTag> {
        None
    }

    fn list_models<'a>(&'a self) -> GenerationFuture<'a, Result<Vec<ModelInfo>, GenerationError>> {
        Box::pin(async { Err(GenerationError::NotConfigured) })
    }

    fn stream_text<'a>(&'a self, _request: GenerationRequest) -> GenerationStream<'a> {
        Box::pin(stream::once(async { Err(GenerationError::NotConfigured) }))
    }
}

/// Canned response consumed by one [`ScriptedGenerationService`] generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Emit every fragment, then complete.
    Tokens(Vec<String>),
    /// Emit the fragments, then fail with `error`.
    Failure {
        /// Fragments delivered before the failure.
        tokens: Vec<String>,
        /// Terminal error.
        error: GenerationError,
    },
    /// Emit the fragments, then never complete.
    Stall(Vec<String>),
}

#[derive(Debug, Default)]
struct ScriptedState {
    config: Option<ProviderConfig>,
    models: Vec<ModelInfo>,
    replies: VecDeque<ScriptedReply>,
    requests: Vec<GenerationRequest>,
    configure_error: Option<GenerationError>,
    models_error: Option<GenerationError>,
}

#[derive(Debug, Clone, Default)]
/// Deterministic in-memory generation service that replays queued replies.
///
/// Clones share the same script and request log, so a test can keep a handle while the store
/// under test owns another.
pub struct ScriptedGenerationService {
    inner: Rc<RefCell<ScriptedState>>,
}

impl ScriptedGenerationService {
    /// Sets the model list returned by [`GenerationService::list_models`].
    pub fn with_models(self, models: Vec<ModelInfo>) -> Self {
        self.inner.borrow_mut().models = models;
        self
    }

    /// Marks the service as configured without going through [`GenerationService::configure`].
    pub fn preconfigured(self, config: ProviderConfig) -> Self {
        self.inner.borrow_mut().config = Some(config);
        self
    }

    /// Queues a reply that streams `tokens` and completes.
    pub fn push_tokens<I, T>(&self, tokens: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.push_reply(ScriptedReply::Tokens(
            tokens.into_iter().map(Into::into).collect(),
        ));
    }

    /// Queues an arbitrary reply.
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.inner.borrow_mut().replies.push_back(reply);
    }

    /// Makes the next `configure` call fail with `error`.
    pub fn fail_next_configure(&self, error: GenerationError) {
        self.inner.borrow_mut().configure_error = Some(error);
    }

    /// Makes the next `list_models` call fail with `error`.
    pub fn fail_next_list_models(&self, error: GenerationError) {
        self.inner.borrow_mut().models_error = Some(error);
    }

    /// Returns every generation request received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.inner.borrow().requests.clone()
    }

    /// Returns the configuration last accepted.
    pub fn config(&self) -> Option<ProviderConfig> {
        self.inner.borrow().config.clone()
    }
}

impl GenerationService for ScriptedGenerationService {
    fn configure<'a>(
        &'a self,
        config: &'a ProviderConfig,
    ) -> GenerationFuture<'a, Result<(), GenerationError>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if let Some(error) = state.configure_error.take() {
                return Err(error);
            }
            state.config = Some(config.clone());
            Ok(())
        })
    }

    fn is_configured(&self) -> bool {
        self.inner.borrow().config.is_some()
    }

    fn provider(&self) -> Option<ProviderTag> {
        self.inner.borrow().config.as_ref().map(|c| c.provider)
    }

    fn list_models<'a>(&'a self) -> GenerationFuture<'a, Result<Vec<ModelInfo>, GenerationError>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if let Some(error) = state.models_error.take() {
                return Err(error);
            }
            if state.config.is_none() {
                return Err(GenerationError::NotConfigured);
            }
            Ok(state.models.clone())
        })
    }

    fn stream_text<'a>(&'a self, request: GenerationRequest) -> GenerationStream<'a> {
        let reply = {
            let mut state = self.inner.borrow_mut();
            state.requests.push(request);
            if state.config.is_none() {
                None
            } else {
                Some(state.replies.pop_front().unwrap_or_else(|| {
                    ScriptedReply::Failure {
                        tokens: Vec::new(),
                        error: GenerationError::Generation("no scripted reply queued".to_string()),
                    }
                }))
            }
        };

        match reply {
            None => Box::pin(stream::once(async { Err(GenerationError::NotConfigured) })),
            Some(ScriptedReply::Tokens(tokens)) => Box::pin(stream::iter(tokens.into_iter().map(Ok))),
            Some(ScriptedReply::Failure { tokens, error }) => Box::pin(
                stream::iter(tokens.into_iter().map(Ok)).chain(stream::once(async move { Err(error) })),
            ),
            Some(ScriptedReply::Stall(tokens)) => {
                Box::pin(stream::iter(tokens.into_iter().map(Ok)).chain(stream::pending()))
            }
        }
    }
}
