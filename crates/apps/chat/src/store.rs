//! Async chat store orchestrating generation rounds over a [`GenerationService`].
//!
//! [`ChatStore`] is a cheap-to-clone handle; clones share state. All mutations go through
//! [`ChatState::apply`], notify subscribers synchronously, and (for durable changes) persist the
//! durable subset afterwards. Streamed fragments notify but do not persist; the round is persisted
//! once when it ends.

use std::{cell::RefCell, rc::Rc};

use futures::{
    future::AbortHandle,
    stream::{abortable, StreamExt},
};
use platform_host::{
    next_monotonic_timestamp_ms, AppStateStore, GenerationRequest, GenerationService,
    ProviderConfig,
};
use uuid::Uuid;

use crate::{
    engine::{
        title_prompt, ChatAction, RoundEnd, TITLE_FALLBACK_MODEL, TITLE_MAX_TOKENS,
        TITLE_TEMPERATURE,
    },
    model::{ChatError, ChatState, GenerationOutcome, SystemStats},
    persistence::{load_chat_state, save_chat_state, PersistedChatState},
};

/// Message recorded when chat starts without a configured provider.
pub const NOT_CONFIGURED_MESSAGE: &str = "AI service not configured";

/// Listener invoked with the new state after every change.
pub type ChatListener = Rc<dyn Fn(&ChatState)>;

/// Handle returned by [`ChatStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatSubscriptionId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ChatSubscriptionId, ChatListener)>,
}

/// Shared chat engine handle.
#[derive(Clone)]
pub struct ChatStore {
    state: Rc<RefCell<ChatState>>,
    generation: Rc<dyn GenerationService>,
    app_state: Rc<dyn AppStateStore>,
    listeners: Rc<RefCell<Listeners>>,
    abort: Rc<RefCell<Option<AbortHandle>>>,
}

impl ChatStore {
    /// Creates a store with empty state.
    pub fn new(generation: Rc<dyn GenerationService>, app_state: Rc<dyn AppStateStore>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ChatState::default())),
            generation,
            app_state,
            listeners: Rc::new(RefCell::new(Listeners::default())),
            abort: Rc::new(RefCell::new(None)),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> ChatState {
        self.state.borrow().clone()
    }

    /// Reads state without cloning it.
    pub fn with_state<R>(&self, read: impl FnOnce(&ChatState) -> R) -> R {
        read(&self.state.borrow())
    }

    /// Returns whether a round is in flight.
    pub fn is_generating(&self) -> bool {
        self.state.borrow().is_generating
    }

    /// Registers a change listener.
    pub fn subscribe(&self, listener: ChatListener) -> ChatSubscriptionId {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next_id += 1;
        let id = ChatSubscriptionId(listeners.next_id);
        listeners.entries.push((id, listener));
        id
    }

    /// Removes a listener.
    pub fn unsubscribe(&self, id: ChatSubscriptionId) {
        self.listeners
            .borrow_mut()
            .entries
            .retain(|(entry_id, _)| *entry_id != id);
    }

    fn dispatch(&self, action: ChatAction) -> bool {
        let changed = self
            .state
            .borrow_mut()
            .apply(action, next_monotonic_timestamp_ms());
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        let listeners = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect::<Vec<_>>();
        let snapshot = self.snapshot();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    async fn persist(&self) {
        let payload = PersistedChatState::from_state(&self.state.borrow());
        if let Err(err) = save_chat_state(self.app_state.as_ref(), &payload).await {
            tracing::warn!(%err, "persist chat state failed");
        }
    }

    async fn dispatch_durable(&self, action: ChatAction) -> bool {
        let changed = self.dispatch(action);
        if changed {
            self.persist().await;
        }
        changed
    }

    /// Restores persisted history, model selection, and provider settings.
    ///
    /// A saved provider configuration is re-applied to the generation service; if it is
    /// rejected the failure is recorded in `error` and the rest of the state is still restored.
    pub async fn hydrate(&self) {
        let saved = match load_chat_state(self.app_state.as_ref()).await {
            Ok(Some(saved)) => saved,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(%err, "load chat state failed");
                return;
            }
        };

        {
            let mut state = self.state.borrow_mut();
            state.chat_history = saved.chat_history;
            state.active_model_id = saved.active_model_id;
            state.provider_config = saved.provider.clone();
            if let Some(current) = state.current_chat_id.clone() {
                if state.session(&current).is_none() {
                    state.current_chat_id = None;
                    state.messages.clear();
                }
            }
        }
        self.notify();

        if let Some(config) = saved.provider {
            if let Err(err) = self.generation.configure(&config).await {
                tracing::warn!(%err, "restoring provider configuration failed");
                self.dispatch(ChatAction::ModelsFailed(err.to_string()));
            }
        }
    }

    /// Starts a new empty session, makes it current, and returns its id.
    pub async fn create_new_chat(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.dispatch_durable(ChatAction::CreateChat { id: id.clone() })
            .await;
        id
    }

    /// Makes `chat_id` current. Unknown ids are ignored.
    pub fn load_chat(&self, chat_id: &str) -> bool {
        self.dispatch(ChatAction::LoadChat {
            id: chat_id.to_string(),
        })
    }

    /// Deletes a session. Unknown ids are ignored.
    pub async fn delete_chat(&self, chat_id: &str) -> bool {
        self.dispatch_durable(ChatAction::DeleteChat {
            id: chat_id.to_string(),
        })
        .await
    }

    /// Retitles a session. Blank titles are ignored; others are trimmed.
    pub async fn update_chat_title(&self, chat_id: &str, title: &str) -> bool {
        self.dispatch_durable(ChatAction::RenameChat {
            id: chat_id.to_string(),
            title: title.to_string(),
        })
        .await
    }

    /// Empties the current session's transcript.
    pub async fn clear_chat(&self) -> bool {
        self.dispatch_durable(ChatAction::ClearCurrent).await
    }

    /// Selects the model used for new rounds.
    pub async fn set_active_model(&self, model_id: &str) {
        self.dispatch_durable(ChatAction::SetActiveModel(model_id.to_string()))
            .await;
    }

    /// Replaces the resource monitor snapshot.
    pub fn update_system_stats(&self, stats: SystemStats) {
        self.dispatch(ChatAction::SetSystemStats(stats));
    }

    /// Lists models when a provider is configured; otherwise records the missing configuration.
    pub async fn initialize_chat(&self) {
        if !self.generation.is_configured() {
            self.dispatch(ChatAction::ModelsFailed(NOT_CONFIGURED_MESSAGE.to_string()));
            return;
        }
        match self.generation.list_models().await {
            Ok(models) => {
                self.dispatch(ChatAction::ModelsLoaded(models));
            }
            Err(err) => {
                tracing::warn!(%err, "initializing chat models failed");
                self.dispatch(ChatAction::ModelsFailed(err.to_string()));
            }
        }
    }

    /// Validates and applies provider settings, persists them, and lists models.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Provider`] when validation, configuration, or model listing fails;
    /// the message is also recorded in `error`.
    pub async fn set_api_key(&self, config: ProviderConfig) -> Result<(), ChatError> {
        let applied = async {
            config.validate()?;
            self.generation.configure(&config).await?;
            self.generation.list_models().await
        }
        .await;

        match applied {
            Ok(models) => {
                self.dispatch(ChatAction::SetProvider(config));
                self.dispatch(ChatAction::ModelsLoaded(models));
                self.persist().await;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, provider = %config.provider, "provider connection failed");
                self.dispatch(ChatAction::ModelsFailed(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Sends `content` in the current session and streams the reply into the transcript.
    ///
    /// Provider failures do not return `Err`: they end the round with
    /// [`GenerationOutcome::Failed`] after appending an error message. After the first completed
    /// exchange of a session a title is generated for it.
    ///
    /// # Errors
    ///
    /// Returns the first unmet precondition before the transcript is touched.
    pub async fn chat(&self, content: &str) -> Result<GenerationOutcome, ChatError> {
        let model = self
            .state
            .borrow()
            .check_round(self.generation.is_configured())?;
        self.dispatch(ChatAction::BeginRound(content.to_string()));
        self.persist().await;
        let Some(round_chat_id) = self.state.borrow().round_chat_id().map(str::to_string) else {
            return Ok(GenerationOutcome::Cancelled);
        };

        let request = GenerationRequest::new(content)
            .with_model(model)
            .streaming();
        let (mut fragments, handle) = abortable(self.generation.stream_text(request));
        *self.abort.borrow_mut() = Some(handle);

        let mut failure = None;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(fragment) => {
                    self.dispatch(ChatAction::AppendFragment(fragment));
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        let cancelled = self.abort.borrow_mut().take().is_none();

        let outcome = match failure {
            Some(err) => {
                tracing::warn!(%err, "chat generation failed");
                self.dispatch(ChatAction::FinishRound(RoundEnd::Failed(err.to_string())));
                GenerationOutcome::Failed(err)
            }
            None if cancelled => {
                self.dispatch(ChatAction::FinishRound(RoundEnd::Cancelled));
                GenerationOutcome::Cancelled
            }
            None => {
                self.dispatch(ChatAction::FinishRound(RoundEnd::Completed));
                GenerationOutcome::Completed
            }
        };
        self.persist().await;

        if outcome == GenerationOutcome::Completed {
            let needs_title = self
                .state
                .borrow()
                .title_candidate(&round_chat_id)
                .is_some();
            if needs_title {
                self.summarize_and_title_chat(&round_chat_id).await;
            }
        }
        Ok(outcome)
    }

    /// Stops the in-flight round, keeping the partial reply. Returns whether a round was running.
    pub fn cancel_generation(&self) -> bool {
        match self.abort.borrow_mut().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Asks the provider for a short title and applies it. Failures are logged only.
    pub async fn summarize_and_title_chat(&self, chat_id: &str) {
        let (prompt, model) = {
            let state = self.state.borrow();
            let Some(chat) = state.session(chat_id).filter(|chat| chat.messages.len() >= 2)
            else {
                return;
            };
            let model = state
                .active_model_id
                .clone()
                .unwrap_or_else(|| TITLE_FALLBACK_MODEL.to_string());
            (title_prompt(chat), model)
        };

        let request = GenerationRequest::new(prompt)
            .with_model(model)
            .with_max_tokens(TITLE_MAX_TOKENS)
            .with_temperature(TITLE_TEMPERATURE);
        match self.generation.generate_text(request).await {
            Ok(raw) => {
                self.dispatch_durable(ChatAction::ApplyGeneratedTitle {
                    id: chat_id.to_string(),
                    raw,
                })
                .await;
            }
            Err(err) => tracing::warn!(%err, chat_id, "generating chat title failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::{
        executor::{block_on, LocalPool},
        task::LocalSpawnExt,
    };
    use platform_host::{
        GenerationError, MemoryAppStateStore, ModelInfo, ProviderTag, ScriptedGenerationService,
        ScriptedReply, CHAT_STATE_NAMESPACE,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ChatMessage, MessageRole};

    struct Harness {
        store: ChatStore,
        provider: ScriptedGenerationService,
        app_state: MemoryAppStateStore,
    }

    fn harness() -> Harness {
        let provider = ScriptedGenerationService::default()
            .with_models(vec![ModelInfo::named_by_id("m1", ProviderTag::OpenAi)])
            .preconfigured(ProviderConfig::new(ProviderTag::OpenAi, "sk-test"));
        let app_state = MemoryAppStateStore::default();
        let store = ChatStore::new(Rc::new(provider.clone()), Rc::new(app_state.clone()));
        Harness {
            store,
            provider,
            app_state,
        }
    }

    fn transcript(store: &ChatStore) -> Vec<(MessageRole, String)> {
        store.with_state(|state| {
            state
                .messages
                .iter()
                .map(|message: &ChatMessage| (message.role, message.content.clone()))
                .collect()
        })
    }

    #[test]
    fn first_exchange_streams_reply_and_requests_title() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        let chat_id = block_on(h.store.create_new_chat());
        h.provider.push_tokens(["Hi", " there"]);
        h.provider.push_tokens(["\"Friendly Greeting\""]);

        let outcome = block_on(h.store.chat("Hello")).expect("chat");

        assert_eq!(outcome, GenerationOutcome::Completed);
        assert_eq!(
            transcript(&h.store),
            vec![
                (MessageRole::User, "Hello".to_string()),
                (MessageRole::Assistant, "Hi there".to_string()),
            ]
        );
        let requests = h.provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model.as_deref(), Some("m1"));
        assert!(requests[0].stream);
        assert!(requests[1]
            .prompt
            .starts_with("Please provide a very brief title (maximum 4-5 words)"));
        assert_eq!(requests[1].max_tokens, Some(20));
        assert_eq!(requests[1].temperature, Some(0.7));
        assert!(!requests[1].stream);

        let title = h
            .store
            .with_state(|state| state.session(&chat_id).map(|chat| chat.title.clone()));
        assert_eq!(title.as_deref(), Some("Friendly Greeting"));
        assert!(!h.store.is_generating());
    }

    #[test]
    fn later_exchanges_do_not_retitle() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        block_on(h.store.create_new_chat());
        h.provider.push_tokens(["one"]);
        h.provider.push_tokens(["Title"]);
        block_on(h.store.chat("first")).expect("first");
        h.provider.push_tokens(["two"]);
        block_on(h.store.chat("second")).expect("second");

        assert_eq!(h.provider.requests().len(), 3);
        assert_eq!(transcript(&h.store).len(), 4);
    }

    #[test]
    fn title_failure_is_swallowed() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        let chat_id = block_on(h.store.create_new_chat());
        h.provider.push_tokens(["reply"]);

        let outcome = block_on(h.store.chat("Hello")).expect("chat");
        assert_eq!(outcome, GenerationOutcome::Completed);
        assert_eq!(h.store.snapshot().error, None);
        let title = h
            .store
            .with_state(|state| state.session(&chat_id).map(|chat| chat.title.clone()));
        assert_eq!(title.as_deref(), Some("New Chat"));
    }

    #[test]
    fn chat_without_model_is_rejected_before_mutation() {
        let h = harness();
        block_on(h.store.create_new_chat());

        assert_eq!(
            block_on(h.store.chat("Hello")),
            Err(ChatError::NoModelSelected)
        );
        assert!(transcript(&h.store).is_empty());
        assert!(h.provider.requests().is_empty());
    }

    #[test]
    fn chat_without_provider_or_session_is_rejected() {
        let app_state = MemoryAppStateStore::default();
        let unconfigured = ChatStore::new(
            Rc::new(ScriptedGenerationService::default()),
            Rc::new(app_state),
        );
        assert_eq!(
            block_on(unconfigured.chat("x")),
            Err(ChatError::NotConfigured)
        );

        let h = harness();
        block_on(h.store.set_active_model("m1"));
        assert_eq!(block_on(h.store.chat("x")), Err(ChatError::NoActiveChat));
    }

    #[test]
    fn provider_failure_appends_error_message() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        block_on(h.store.create_new_chat());
        h.provider.push_reply(ScriptedReply::Failure {
            tokens: vec!["par".to_string()],
            error: GenerationError::Generation("rate limited".to_string()),
        });

        let outcome = block_on(h.store.chat("Hello")).expect("chat");

        assert_eq!(
            outcome,
            GenerationOutcome::Failed(GenerationError::Generation("rate limited".to_string()))
        );
        assert_eq!(
            transcript(&h.store),
            vec![
                (MessageRole::User, "Hello".to_string()),
                (MessageRole::Assistant, "par".to_string()),
                (
                    MessageRole::Error,
                    "AI generation failed: rate limited".to_string()
                ),
            ]
        );
        let state = h.store.snapshot();
        assert_eq!(state.error.as_deref(), Some("AI generation failed: rate limited"));
        assert!(!state.is_generating);
        assert_eq!(h.provider.requests().len(), 1);
    }

    #[test]
    fn cancel_keeps_partial_reply() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        block_on(h.store.create_new_chat());
        h.provider
            .push_reply(ScriptedReply::Stall(vec!["partial".to_string()]));

        let mut pool = LocalPool::new();
        let outcome = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&outcome);
        let store = h.store.clone();
        pool.spawner()
            .spawn_local(async move {
                *sink.borrow_mut() = Some(store.chat("Hello").await);
            })
            .expect("spawn");

        pool.run_until_stalled();
        assert!(h.store.is_generating());
        assert_eq!(
            transcript(&h.store)[1],
            (MessageRole::Assistant, "partial".to_string())
        );

        assert!(h.store.cancel_generation());
        pool.run_until_stalled();

        assert_eq!(
            outcome.borrow_mut().take(),
            Some(Ok(GenerationOutcome::Cancelled))
        );
        assert!(!h.store.is_generating());
        assert_eq!(transcript(&h.store).len(), 2);
        assert!(!h.store.cancel_generation());
        assert_eq!(h.provider.requests().len(), 1);
    }

    #[test]
    fn second_round_is_rejected_while_first_streams() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        block_on(h.store.create_new_chat());
        h.provider.push_reply(ScriptedReply::Stall(Vec::new()));

        let mut pool = LocalPool::new();
        let store = h.store.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = store.chat("first").await;
            })
            .expect("spawn");
        pool.run_until_stalled();

        assert_eq!(
            block_on(h.store.chat("second")),
            Err(ChatError::GenerationInProgress)
        );
        h.store.cancel_generation();
        pool.run_until_stalled();
    }

    #[test]
    fn listeners_see_every_fragment() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        block_on(h.store.create_new_chat());
        h.provider.push_tokens(["a", "b", "c"]);
        h.provider.push_tokens(["T"]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = h.store.subscribe(Rc::new(move |state: &ChatState| {
            if let Some(last) = state.messages.last() {
                sink.borrow_mut().push(last.content.clone());
            }
        }));
        block_on(h.store.chat("go")).expect("chat");
        h.store.unsubscribe(id);

        let seen = seen.borrow();
        assert!(seen.contains(&"a".to_string()));
        assert!(seen.contains(&"ab".to_string()));
        assert!(seen.contains(&"abc".to_string()));
    }

    #[test]
    fn set_api_key_validates_and_persists_configuration() {
        let h = harness();
        let err = block_on(h.store.set_api_key(ProviderConfig::new(ProviderTag::Custom, "")))
            .expect_err("missing base url");
        assert_eq!(err, ChatError::Provider(GenerationError::MissingBaseUrl));
        let state = h.store.snapshot();
        assert_eq!(state.model_status, crate::model::ModelStatus::Error);
        assert_eq!(
            state.error.as_deref(),
            Some("Base URL is required for custom provider")
        );

        let config = ProviderConfig::new(ProviderTag::OpenAi, "sk-new");
        block_on(h.store.set_api_key(config.clone())).expect("configure");
        let state = h.store.snapshot();
        assert_eq!(state.model_status, crate::model::ModelStatus::Ready);
        assert_eq!(state.error, None);
        assert_eq!(state.available_models.len(), 1);
        assert_eq!(h.provider.config(), Some(config.clone()));

        let saved = block_on(load_chat_state(&h.app_state))
            .expect("load")
            .expect("saved");
        assert_eq!(saved.provider, Some(config));
    }

    #[test]
    fn set_api_key_surfaces_configure_failure() {
        let h = harness();
        h.provider.fail_next_configure(GenerationError::Configuration(
            "401 Unauthorized".to_string(),
        ));
        let err = block_on(h.store.set_api_key(ProviderConfig::new(ProviderTag::OpenAi, "bad")))
            .expect_err("rejected");
        assert_eq!(
            err.to_string(),
            "Failed to configure AI service: 401 Unauthorized"
        );
        assert_eq!(
            h.store.snapshot().model_status,
            crate::model::ModelStatus::Error
        );
    }

    #[test]
    fn set_api_key_surfaces_model_listing_failure() {
        let provider = ScriptedGenerationService::default();
        let app_state = MemoryAppStateStore::default();
        let store = ChatStore::new(Rc::new(provider.clone()), Rc::new(app_state.clone()));
        provider.fail_next_list_models(GenerationError::Models("boom".to_string()));

        let err = block_on(store.set_api_key(ProviderConfig::new(ProviderTag::OpenAi, "k")))
            .expect_err("listing fails");

        assert_eq!(
            err,
            ChatError::Provider(GenerationError::Models("boom".to_string()))
        );
        let state = store.snapshot();
        assert_eq!(state.model_status, crate::model::ModelStatus::Error);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch models: boom"));
        assert_eq!(state.provider_config, None);
        assert!(provider.is_configured());
        assert_eq!(app_state.envelope(CHAT_STATE_NAMESPACE), None);
    }

    #[test]
    fn initialize_chat_records_model_listing_failure() {
        let h = harness();
        h.provider
            .fail_next_list_models(GenerationError::Models("offline".to_string()));

        block_on(h.store.initialize_chat());

        let state = h.store.snapshot();
        assert_eq!(state.model_status, crate::model::ModelStatus::Error);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch models: offline"));
        assert!(state.available_models.is_empty());

        block_on(h.store.initialize_chat());
        assert_eq!(h.store.snapshot().model_status, crate::model::ModelStatus::Ready);
    }

    #[test]
    fn initialize_chat_reports_missing_provider() {
        let store = ChatStore::new(
            Rc::new(ScriptedGenerationService::default()),
            Rc::new(MemoryAppStateStore::default()),
        );
        block_on(store.initialize_chat());
        let state = store.snapshot();
        assert_eq!(state.model_status, crate::model::ModelStatus::Error);
        assert_eq!(state.error.as_deref(), Some(NOT_CONFIGURED_MESSAGE));

        let h = harness();
        block_on(h.store.initialize_chat());
        assert_eq!(h.store.snapshot().model_status, crate::model::ModelStatus::Ready);
    }

    #[test]
    fn hydrate_restores_history_and_reconfigures_provider() {
        let h = harness();
        block_on(h.store.set_active_model("m1"));
        let chat_id = block_on(h.store.create_new_chat());
        block_on(h.store.update_chat_title(&chat_id, "Kept"));
        block_on(h.store.set_api_key(ProviderConfig::new(ProviderTag::Anthropic, "sk-ant")))
            .expect("configure");
        assert!(h.app_state.envelope(CHAT_STATE_NAMESPACE).is_some());

        let fresh_provider = ScriptedGenerationService::default();
        let restored = ChatStore::new(
            Rc::new(fresh_provider.clone()),
            Rc::new(h.app_state.clone()),
        );
        block_on(restored.hydrate());

        let state = restored.snapshot();
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].title, "Kept");
        assert_eq!(state.active_model_id.as_deref(), Some("m1"));
        assert_eq!(state.current_chat_id, None);
        assert_eq!(
            fresh_provider.config().map(|config| config.provider),
            Some(ProviderTag::Anthropic)
        );
    }

    #[test]
    fn system_stats_notify_without_persisting() {
        let h = harness();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        h.store.subscribe(Rc::new(move |_: &ChatState| {
            counter.set(counter.get() + 1);
        }));
        h.store.update_system_stats(SystemStats {
            cpu: 12.5,
            memory: 40.0,
            temperature: 55.0,
            requests: 3,
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(h.store.snapshot().system_stats.requests, 3);
        assert!(h.app_state.envelope(CHAT_STATE_NAMESPACE).is_none());
    }
}
