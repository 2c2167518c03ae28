//! Chat session engine for the desktop chat app.
//!
//! - [`model`]: transcript, session, and status types
//! - [`engine`]: pure state transitions applied through [`ChatState::apply`]
//! - [`store`]: the async [`ChatStore`] handle that runs generation rounds
//! - [`persistence`]: the durable chat-state envelope and its migration

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod engine;
pub mod model;
pub mod persistence;
pub mod store;

pub use engine::{clean_generated_title, title_prompt, ChatAction, RoundEnd};
pub use model::{
    ChatError, ChatMessage, ChatSession, ChatState, GenerationOutcome, MessageRole, ModelStatus,
    SystemStats, NEW_CHAT_TITLE,
};
pub use persistence::{
    load_chat_state, save_chat_state, PersistedChatState, CHAT_STATE_SCHEMA_VERSION,
};
pub use store::{ChatListener, ChatStore, ChatSubscriptionId, NOT_CONFIGURED_MESSAGE};

/// Stable app id of the chat app.
pub const APP_ID: &str = "chat";
