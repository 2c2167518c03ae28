//! Versioned app-state persistence contracts, envelope types, and helpers.
//!
//! Stores persist opaque JSON blobs wrapped in an [`AppStateEnvelope`] so a payload can be
//! migrated when its schema version changes between releases.

use std::{cell::RefCell, collections::HashMap, future::Future, pin::Pin, rc::Rc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Version for [`AppStateEnvelope`] metadata serialization.
pub const APP_STATE_ENVELOPE_VERSION: u32 = 1;
/// Namespace holding chat history, active model, and provider settings.
pub const CHAT_STATE_NAMESPACE: &str = "app.chat";
/// Namespace holding the cached app-store catalog and installed list.
pub const APP_STORE_STATE_NAMESPACE: &str = "system.app_store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Versioned envelope for persisted app state payloads.
pub struct AppStateEnvelope {
    /// Envelope schema version.
    pub envelope_version: u32,
    /// Namespace identifying the owning store.
    pub namespace: String,
    /// Store-defined schema version for the payload.
    pub schema_version: u32,
    /// Last update time in unix milliseconds.
    pub updated_at_unix_ms: u64,
    /// Serialized store payload.
    pub payload: Value,
}

impl AppStateEnvelope {
    /// Creates a new envelope and stamps it with a monotonic timestamp.
    pub fn new(namespace: impl Into<String>, schema_version: u32, payload: Value) -> Self {
        Self {
            envelope_version: APP_STATE_ENVELOPE_VERSION,
            namespace: namespace.into(),
            schema_version,
            updated_at_unix_ms: crate::time::next_monotonic_timestamp_ms(),
            payload,
        }
    }
}

/// Object-safe boxed future used by [`AppStateStore`] async methods.
pub type AppStateStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Storage service for loading and saving app-state envelopes by namespace.
pub trait AppStateStore {
    /// Loads a persisted app-state envelope by namespace.
    fn load_app_state_envelope<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<Option<AppStateEnvelope>, String>>;

    /// Saves a full app-state envelope.
    fn save_app_state_envelope<'a>(
        &'a self,
        envelope: &'a AppStateEnvelope,
    ) -> AppStateStoreFuture<'a, Result<(), String>>;

    /// Deletes persisted app state for a namespace.
    fn delete_app_state<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op app-state store for hosts without durable storage.
pub struct NoopAppStateStore;

impl AppStateStore for NoopAppStateStore {
    fn load_app_state_envelope<'a>(
        &'a self,
        _namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<Option<AppStateEnvelope>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn save_app_state_envelope<'a>(
        &'a self,
        _envelope: &'a AppStateEnvelope,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_app_state<'a>(
        &'a self,
        _namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory app-state store keyed by namespace.
///
/// Clones share the same backing map, which lets tests inspect what a store handle persisted.
pub struct MemoryAppStateStore {
    inner: Rc<RefCell<HashMap<String, AppStateEnvelope>>>,
}

impl MemoryAppStateStore {
    /// Returns the envelope currently held for `namespace`.
    pub fn envelope(&self, namespace: &str) -> Option<AppStateEnvelope> {
        self.inner.borrow().get(namespace).cloned()
    }
}

impl AppStateStore for MemoryAppStateStore {
    fn load_app_state_envelope<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<Option<AppStateEnvelope>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().get(namespace).cloned()) })
    }

    fn save_app_state_envelope<'a>(
        &'a self,
        envelope: &'a AppStateEnvelope,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner
                .borrow_mut()
                .insert(envelope.namespace.clone(), envelope.clone());
            Ok(())
        })
    }

    fn delete_app_state<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().remove(namespace);
            Ok(())
        })
    }
}

/// Builds a versioned [`AppStateEnvelope`] from a serializable payload.
///
/// # Errors
///
/// Returns an error when `payload` cannot be converted to JSON.
pub fn build_app_state_envelope<T: Serialize>(
    namespace: &str,
    schema_version: u32,
    payload: &T,
) -> Result<AppStateEnvelope, String> {
    let payload = serde_json::to_value(payload).map_err(|e| e.to_string())?;
    Ok(AppStateEnvelope::new(namespace, schema_version, payload))
}

/// Deserializes an envelope payload into a target type.
///
/// # Errors
///
/// Returns an error when deserialization fails.
pub fn migrate_envelope_payload<T: DeserializeOwned>(
    envelope: &AppStateEnvelope,
) -> Result<T, String> {
    serde_json::from_value(envelope.payload.clone()).map_err(|e| e.to_string())
}

/// Serializes `payload` into an envelope and saves it through `store`.
///
/// # Errors
///
/// Returns an error when serialization or the store save fails.
pub async fn save_app_state_with<S: AppStateStore + ?Sized, T: Serialize>(
    store: &S,
    namespace: &str,
    schema_version: u32,
    payload: &T,
) -> Result<(), String> {
    let envelope = build_app_state_envelope(namespace, schema_version, payload)?;
    store.save_app_state_envelope(&envelope).await
}

/// Loads a typed payload, routing older schema versions through `migrate`.
///
/// Envelopes written with `current_schema_version` decode directly. Older versions are handed to
/// `migrate`, which may return `Ok(None)` to discard state it cannot upgrade. Envelopes from a
/// newer schema than this build understands are ignored.
///
/// # Errors
///
/// Returns an error when the store load, decoding, or migration fails.
pub async fn load_app_state_with_migration<S, T, F>(
    store: &S,
    namespace: &str,
    current_schema_version: u32,
    migrate: F,
) -> Result<Option<T>, String>
where
    S: AppStateStore + ?Sized,
    T: DeserializeOwned,
    F: FnOnce(u32, &AppStateEnvelope) -> Result<Option<T>, String>,
{
    let Some(envelope) = store.load_app_state_envelope(namespace).await? else {
        return Ok(None);
    };
    if envelope.envelope_version != APP_STATE_ENVELOPE_VERSION {
        return Ok(None);
    }
    match envelope.schema_version.cmp(&current_schema_version) {
        std::cmp::Ordering::Equal => migrate_envelope_payload(&envelope).map(Some),
        std::cmp::Ordering::Less => migrate(envelope.schema_version, &envelope),
        std::cmp::Ordering::Greater => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestPayload {
        count: u32,
        label: String,
    }

    fn envelope(namespace: &str, schema_version: u32, payload: Value) -> AppStateEnvelope {
        AppStateEnvelope {
            envelope_version: APP_STATE_ENVELOPE_VERSION,
            namespace: namespace.to_string(),
            schema_version,
            updated_at_unix_ms: 1,
            payload,
        }
    }

    #[test]
    fn app_state_envelope_serialization_uses_snake_case_fields() {
        let value = serde_json::to_value(envelope("app.chat", 7, json!({"ok": true})))
            .expect("serialize envelope");
        let object = value.as_object().expect("object");
        assert_eq!(object.get("envelope_version"), Some(&json!(1)));
        assert_eq!(object.get("namespace"), Some(&json!("app.chat")));
        assert_eq!(object.get("schema_version"), Some(&json!(7)));
        assert!(object.contains_key("updated_at_unix_ms"));
        assert!(!object.contains_key("updatedAtUnixMs"));
    }

    #[test]
    fn app_state_envelope_new_uses_monotonic_timestamp() {
        let first = AppStateEnvelope::new("app.chat", 1, json!({"n": 1}));
        let second = AppStateEnvelope::new("app.chat", 1, json!({"n": 2}));
        assert!(second.updated_at_unix_ms > first.updated_at_unix_ms);
    }

    #[test]
    fn migrate_envelope_payload_errors_on_type_mismatch() {
        let bad = envelope("app.chat", 1, json!({"count": "bad", "label": 7}));
        let err = migrate_envelope_payload::<TestPayload>(&bad).expect_err("decode failure");
        assert!(!err.is_empty());
    }

    #[test]
    fn save_then_load_current_schema_skips_migration() {
        let store = MemoryAppStateStore::default();
        block_on(save_app_state_with(
            &store,
            "app.chat",
            2,
            &json!({"count": 3, "label": "ok"}),
        ))
        .expect("save");

        let loaded: Option<TestPayload> = block_on(load_app_state_with_migration(
            &store,
            "app.chat",
            2,
            |_, _| Err("migration should not run".to_string()),
        ))
        .expect("load");
        assert_eq!(
            loaded,
            Some(TestPayload {
                count: 3,
                label: "ok".to_string()
            })
        );
    }

    #[test]
    fn older_schema_routes_through_migration_and_newer_schema_is_ignored() {
        let store = MemoryAppStateStore::default();
        block_on(store.save_app_state_envelope(&envelope(
            "app.chat",
            0,
            json!({"count": 1, "label": "legacy"}),
        )))
        .expect("save legacy");

        let migrated: Option<TestPayload> =
            block_on(load_app_state_with_migration(&store, "app.chat", 1, |version, env| {
                assert_eq!(version, 0);
                migrate_envelope_payload(env).map(Some)
            }))
            .expect("load legacy");
        assert_eq!(migrated.map(|p| p.label), Some("legacy".to_string()));

        block_on(store.save_app_state_envelope(&envelope("app.chat", 9, json!({}))))
            .expect("save future");
        let future: Option<TestPayload> =
            block_on(load_app_state_with_migration(&store, "app.chat", 1, |_, _| {
                Ok(None)
            }))
            .expect("load future");
        assert_eq!(future, None);
    }

    #[test]
    fn memory_app_state_store_overwrite_and_delete() {
        let store = MemoryAppStateStore::default();
        let store_obj: &dyn AppStateStore = &store;
        let one = envelope("app.one", 1, json!({"v": 1}));
        let one_updated = AppStateEnvelope {
            payload: json!({"v": 2}),
            ..one.clone()
        };

        block_on(store_obj.save_app_state_envelope(&one)).expect("save one");
        block_on(store_obj.save_app_state_envelope(&one_updated)).expect("overwrite one");
        assert_eq!(
            store.envelope("app.one").map(|e| e.payload),
            Some(json!({"v": 2}))
        );

        block_on(store_obj.delete_app_state("app.one")).expect("delete");
        assert_eq!(
            block_on(store_obj.load_app_state_envelope("app.one")).expect("load"),
            None
        );
    }

    #[test]
    fn noop_app_state_store_is_empty_and_successful() {
        let store = NoopAppStateStore;
        let store_obj: &dyn AppStateStore = &store;
        assert_eq!(
            block_on(store_obj.load_app_state_envelope("noop")).expect("load"),
            None
        );
        block_on(store_obj.save_app_state_envelope(&envelope("noop", 1, json!({}))))
            .expect("save");
        block_on(store_obj.delete_app_state("noop")).expect("delete");
    }
}
