//! Provider-selecting [`GenerationService`] facade.

use std::{cell::RefCell, rc::Rc};

use futures::{stream, StreamExt};
use platform_host::{
    load_pref_with, save_pref_with, GenerationError, GenerationFuture, GenerationRequest,
    GenerationService, GenerationStream, ModelInfo, PrefsStore, ProviderConfig, ProviderTag,
    AI_SERVICE_CONFIG_KEY, CUSTOM_PROVIDER_PLACEHOLDER_KEY,
};

use super::{
    anthropic::{anthropic_models, AnthropicBackend},
    openai::{OpenAiBackend, OPENAI_BASE_URL},
};

#[derive(Debug, Clone)]
enum Backend {
    OpenAi(OpenAiBackend),
    Custom(OpenAiBackend),
    Anthropic(AnthropicBackend),
}

impl Backend {
    fn tag(&self) -> ProviderTag {
        match self {
            Self::OpenAi(_) => ProviderTag::OpenAi,
            Self::Custom(_) => ProviderTag::Custom,
            Self::Anthropic(_) => ProviderTag::Anthropic,
        }
    }
}

/// Model entry reported when a custom endpoint cannot enumerate its models.
pub fn custom_fallback_model() -> ModelInfo {
    ModelInfo {
        id: "default-model".to_string(),
        name: "Default Model".to_string(),
        provider: ProviderTag::Custom,
    }
}

/// Generation service holding at most one configured backend.
///
/// Accepted configurations are mirrored into the prefs store under
/// [`AI_SERVICE_CONFIG_KEY`] so [`AiService::restore_saved_config`] can rebuild the backend on the
/// next start.
pub struct AiService {
    client: reqwest::Client,
    backend: RefCell<Option<Backend>>,
    prefs: Option<Rc<dyn PrefsStore>>,
}

impl Default for AiService {
    fn default() -> Self {
        Self::new()
    }
}

impl AiService {
    /// Creates an unconfigured service that does not persist its configuration.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            backend: RefCell::new(None),
            prefs: None,
        }
    }

    /// Mirrors accepted configurations into `prefs`.
    pub fn with_prefs(mut self, prefs: Rc<dyn PrefsStore>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    /// Reconfigures from the mirrored preference, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns the configuration error when the saved settings are rejected.
    pub async fn restore_saved_config(&self) -> Result<Option<ProviderConfig>, GenerationError> {
        let Some(prefs) = self.prefs.as_ref() else {
            return Ok(None);
        };
        let saved = match load_pref_with::<_, ProviderConfig>(prefs.as_ref(), AI_SERVICE_CONFIG_KEY)
            .await
        {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(%err, "load saved provider configuration failed");
                None
            }
        };
        match saved {
            Some(config) => {
                self.configure(&config).await?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    async fn build_backend(&self, config: &ProviderConfig) -> Result<Backend, String> {
        config.validate().map_err(|err| err.to_string())?;
        match config.provider {
            ProviderTag::OpenAi => {
                let backend = OpenAiBackend::new(
                    self.client.clone(),
                    ProviderTag::OpenAi,
                    config.base_url().unwrap_or(OPENAI_BASE_URL),
                    config.api_key.trim(),
                );
                backend.list_models().await?;
                Ok(Backend::OpenAi(backend))
            }
            ProviderTag::Custom => {
                let api_key = match config.api_key.trim() {
                    "" => CUSTOM_PROVIDER_PLACEHOLDER_KEY,
                    key => key,
                };
                let base_url = config
                    .base_url()
                    .ok_or_else(|| GenerationError::MissingBaseUrl.to_string())?;
                Ok(Backend::Custom(OpenAiBackend::new(
                    self.client.clone(),
                    ProviderTag::Custom,
                    base_url,
                    api_key,
                )))
            }
            ProviderTag::Anthropic => Ok(Backend::Anthropic(AnthropicBackend::new(
                self.client.clone(),
                config.api_key.trim(),
                config.base_url(),
            ))),
        }
    }

    fn current(&self) -> Option<Backend> {
        self.backend.borrow().clone()
    }
}

impl GenerationService for AiService {
    fn configure<'a>(
        &'a self,
        config: &'a ProviderConfig,
    ) -> GenerationFuture<'a, Result<(), GenerationError>> {
        Box::pin(async move {
            let backend = self
                .build_backend(config)
                .await
                .map_err(GenerationError::Configuration)?;
            tracing::info!(provider = %config.provider, "generation provider configured");
            *self.backend.borrow_mut() = Some(backend);

            if let Some(prefs) = self.prefs.as_ref() {
                if let Err(err) = save_pref_with(prefs.as_ref(), AI_SERVICE_CONFIG_KEY, config).await
                {
                    tracing::warn!(%err, "persist provider configuration failed");
                }
            }
            Ok(())
        })
    }

    fn is_configured(&self) -> bool {
        self.backend.borrow().is_some()
    }

    fn provider(&self) -> Option<ProviderTag> {
        self.backend.borrow().as_ref().map(Backend::tag)
    }

    fn list_models<'a>(&'a self) -> GenerationFuture<'a, Result<Vec<ModelInfo>, GenerationError>> {
        Box::pin(async move {
            match self.current() {
                None => Err(GenerationError::NotConfigured),
                Some(Backend::OpenAi(backend)) => {
                    backend.list_models().await.map_err(GenerationError::Models)
                }
                Some(Backend::Custom(backend)) => match backend.list_models().await {
                    Ok(models) => Ok(models),
                    Err(err) => {
                        tracing::warn!(%err, "custom endpoint model listing failed; using fallback model");
                        Ok(vec![custom_fallback_model()])
                    }
                },
                Some(Backend::Anthropic(_)) => Ok(anthropic_models()),
            }
        })
    }

    fn stream_text<'a>(&'a self, request: GenerationRequest) -> GenerationStream<'a> {
        match self.current() {
            None => Box::pin(stream::once(async { Err(GenerationError::NotConfigured) })),
            Some(Backend::OpenAi(backend)) | Some(Backend::Custom(backend)) => {
                backend.stream(request).boxed_local()
            }
            Some(Backend::Anthropic(backend)) => backend.stream(request).boxed_local(),
        }
    }
}
