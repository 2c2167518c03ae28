//! Browser implementations of [`platform_host`] service contracts.
//!
//! This crate holds the concrete adapters the shell runs with in a webview:
//! - `storage::local_storage`: prefs and app-state envelopes in `window.localStorage`
//! - `ai`: the [`AiService`] generation facade over OpenAI, Anthropic, and OpenAI-compatible
//!   endpoints, including incremental SSE decoding

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Host service wiring for browser builds.
pub mod adapters;
pub mod ai;
pub mod storage;

pub use adapters::{
    build_host_services, build_restored_host_services, generation_service,
    restored_generation_service,
};
pub use ai::anthropic::{anthropic_models, AnthropicBackend};
pub use ai::openai::{parse_stream_chunk, OpenAiBackend};
pub use ai::service::{custom_fallback_model, AiService};
pub use ai::sse::{sse_fragments, SseDecoder, SseEvent};
pub use storage::local_storage::{app_state_key, WebAppStateStore, WebPrefsStore};
