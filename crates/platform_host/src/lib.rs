//! Typed host-domain contracts and shared models used by the desktop runtime and app crates.
//!
//! This crate is the API-first boundary for everything the shell consumes from its environment:
//! durable storage, the auth session provider, the remote app catalog, and text generation.
//! Each contract ships with no-op and in-memory adapters; network adapters live in
//! `platform_host_web`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod catalog;
pub mod generation;
pub mod host;
pub mod identity;
pub mod storage;
pub mod time;

pub use catalog::{
    CatalogAppRecord, CatalogFuture, CatalogOperation, CatalogTable, MemoryCatalogTable,
    NoopCatalogTable,
};
pub use generation::{
    GenerationError, GenerationFuture, GenerationRequest, GenerationService, GenerationStream,
    ModelInfo, NoopGenerationService, ProviderConfig, ProviderTag, ScriptedGenerationService,
    ScriptedReply, AI_SERVICE_CONFIG_KEY, CUSTOM_PROVIDER_PLACEHOLDER_KEY,
};
pub use host::HostServices;
pub use identity::{
    AuthChange, AuthListener, AuthSubscriptionId, IdentityFuture, IdentityService, IdentityUser,
    MemoryIdentityService, NoopIdentityService,
};
pub use storage::app_state::{
    build_app_state_envelope, load_app_state_with_migration, migrate_envelope_payload,
    save_app_state_with, AppStateEnvelope, AppStateStore, AppStateStoreFuture,
    MemoryAppStateStore, NoopAppStateStore, APP_STATE_ENVELOPE_VERSION,
    APP_STORE_STATE_NAMESPACE, CHAT_STATE_NAMESPACE,
};
pub use storage::prefs::{
    load_pref_with, save_pref_with, MemoryPrefsStore, NoopPrefsStore, PrefsStore, PrefsStoreFuture,
};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
