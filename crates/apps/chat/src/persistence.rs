//! Durable chat state: history, model selection, and provider settings.
//!
//! Stored as one app-state envelope under [`CHAT_STATE_NAMESPACE`]. Schema 0 is the flat
//! camel-cased layout written by earlier builds; it is migrated on load.

use platform_host::{
    load_app_state_with_migration, migrate_envelope_payload, save_app_state_with,
    AppStateEnvelope, AppStateStore, ProviderConfig, ProviderTag, CHAT_STATE_NAMESPACE,
};
use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, ChatSession, ChatState};

/// Current schema of the persisted chat payload.
pub const CHAT_STATE_SCHEMA_VERSION: u32 = 1;

/// Subset of [`ChatState`] that survives reloads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedChatState {
    /// Every stored session.
    #[serde(default)]
    pub chat_history: Vec<ChatSession>,
    /// Model selected for new rounds.
    #[serde(default)]
    pub active_model_id: Option<String>,
    /// Provider settings last accepted.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

impl PersistedChatState {
    /// Captures the durable subset of `state`.
    pub fn from_state(state: &ChatState) -> Self {
        Self {
            chat_history: state.chat_history.clone(),
            active_model_id: state.active_model_id.clone(),
            provider: state.provider_config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyChatSession {
    id: String,
    title: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    created_at: u64,
    #[serde(default)]
    updated_at: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyChatState {
    #[serde(default)]
    chat_history: Vec<LegacyChatSession>,
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    api_provider: Option<ProviderTag>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    active_model_id: Option<String>,
}

impl From<LegacyChatState> for PersistedChatState {
    fn from(legacy: LegacyChatState) -> Self {
        let provider_tag = legacy.api_provider.unwrap_or_default();
        let has_settings = !legacy.api_key.trim().is_empty()
            || legacy
                .base_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty());
        let provider = has_settings.then(|| ProviderConfig {
            provider: provider_tag,
            api_key: legacy.api_key,
            base_url: legacy.base_url,
        });

        Self {
            chat_history: legacy
                .chat_history
                .into_iter()
                .map(|chat| ChatSession {
                    id: chat.id,
                    title: chat.title,
                    messages: chat.messages,
                    created_at: chat.created_at,
                    updated_at: chat.updated_at,
                })
                .collect(),
            active_model_id: legacy.active_model_id,
            provider,
        }
    }
}

fn migrate_chat_state(
    schema_version: u32,
    envelope: &AppStateEnvelope,
) -> Result<Option<PersistedChatState>, String> {
    match schema_version {
        0 => migrate_envelope_payload::<LegacyChatState>(envelope).map(|legacy| Some(legacy.into())),
        _ => Ok(None),
    }
}

/// Loads persisted chat state, migrating older schemas.
///
/// # Errors
///
/// Returns an error when the store load or payload decoding fails.
pub async fn load_chat_state<S: AppStateStore + ?Sized>(
    store: &S,
) -> Result<Option<PersistedChatState>, String> {
    load_app_state_with_migration(
        store,
        CHAT_STATE_NAMESPACE,
        CHAT_STATE_SCHEMA_VERSION,
        migrate_chat_state,
    )
    .await
}

/// Saves the durable subset of `state`.
///
/// # Errors
///
/// Returns an error when serialization or the store save fails.
pub async fn save_chat_state<S: AppStateStore + ?Sized>(
    store: &S,
    state: &PersistedChatState,
) -> Result<(), String> {
    save_app_state_with(store, CHAT_STATE_NAMESPACE, CHAT_STATE_SCHEMA_VERSION, state).await
}
