//! Transcript, session, and status types for the chat engine.

use platform_host::{GenerationError, ModelInfo, ProviderConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Title given to freshly created sessions.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Author of one transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions seeded ahead of the conversation.
    System,
    /// Text typed by the user.
    User,
    /// Model reply.
    Assistant,
    /// Failure surfaced inline in the transcript.
    Error,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Unix milliseconds of the last write.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl ChatMessage {
    /// Creates a message stamped at `timestamp`.
    pub fn new(role: MessageRole, content: impl Into<String>, timestamp: u64) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// One persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// UUID v4 string.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Ordered transcript.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Creation time in unix milliseconds.
    pub created_at: u64,
    /// Last mutation time in unix milliseconds.
    pub updated_at: u64,
}

impl ChatSession {
    /// Creates an empty session titled [`NEW_CHAT_TITLE`].
    pub fn new(id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: id.into(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Readiness of the model list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Models have not been requested yet.
    #[default]
    Initializing,
    /// Models were listed successfully.
    Ready,
    /// The provider is missing or rejected the listing.
    Error,
}

/// Cosmetic resource snapshot written by a periodic monitor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemStats {
    /// CPU load percentage.
    pub cpu: f64,
    /// Memory use percentage.
    pub memory: f64,
    /// Temperature reading.
    pub temperature: f64,
    /// Requests served.
    pub requests: u64,
}

/// How a generation round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The provider finished the reply.
    Completed,
    /// The provider failed; an error message was appended to the transcript.
    Failed(GenerationError),
    /// The round was cancelled; the partial reply is kept.
    Cancelled,
}

/// Full observable state of the chat engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    /// Transcript of the current session.
    pub messages: Vec<ChatMessage>,
    /// Every stored session, oldest first.
    pub chat_history: Vec<ChatSession>,
    /// Session whose transcript is shown.
    pub current_chat_id: Option<String>,
    /// Whether a generation round is in flight.
    pub is_generating: bool,
    /// Model list readiness.
    pub model_status: ModelStatus,
    /// Model used for new rounds.
    pub active_model_id: Option<String>,
    /// Models offered by the configured provider.
    pub available_models: Vec<ModelInfo>,
    /// Last surfaced failure.
    pub error: Option<String>,
    /// Resource monitor snapshot.
    pub system_stats: SystemStats,
    /// Provider settings last accepted.
    pub provider_config: Option<ProviderConfig>,
    /// Session receiving the in-flight round.
    pub(crate) round_chat_id: Option<String>,
}

impl ChatState {
    /// Looks up a stored session.
    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.chat_history.iter().find(|chat| chat.id == id)
    }

    /// Returns the current session.
    pub fn current_session(&self) -> Option<&ChatSession> {
        self.current_chat_id
            .as_deref()
            .and_then(|id| self.session(id))
    }
}

/// Rejections and failures reported by chat operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// No generation provider is configured.
    #[error("Please configure AI service first")]
    NotConfigured,
    /// No model has been selected.
    #[error("Please select a model first")]
    NoModelSelected,
    /// No session is current.
    #[error("Please create a new chat first")]
    NoActiveChat,
    /// Another round is still streaming.
    #[error("A response is already being generated")]
    GenerationInProgress,
    /// Provider configuration or model listing failed.
    #[error(transparent)]
    Provider(#[from] GenerationError),
}
