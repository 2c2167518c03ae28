//! `window.localStorage` adapters for the prefs and app-state contracts.
//!
//! Both stores share one synchronous key/value layer. Off `wasm32` the layer has no backing
//! storage: loads return nothing and writes succeed without effect.

use platform_host::{
    AppStateEnvelope, AppStateStore, AppStateStoreFuture, PrefsStore, PrefsStoreFuture,
};

const APP_STATE_KEY_PREFIX: &str = "app_state:";

fn read_item(key: &str) -> Option<String> {
    #[cfg(target_arch = "wasm32")]
    {
        let storage = web_sys::window()?.local_storage().ok().flatten()?;
        storage.get_item(key).ok().flatten()
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = key;
        None
    }
}

fn write_item(key: &str, value: &str) -> Result<(), String> {
    #[cfg(target_arch = "wasm32")]
    {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| "localStorage unavailable".to_string())?;
        storage
            .set_item(key, value)
            .map_err(|e| format!("localStorage set_item failed: {e:?}"))
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (key, value);
        Ok(())
    }
}

fn remove_item(key: &str) -> Result<(), String> {
    #[cfg(target_arch = "wasm32")]
    {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| "localStorage unavailable".to_string())?;
        storage
            .remove_item(key)
            .map_err(|e| format!("localStorage remove_item failed: {e:?}"))
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = key;
        Ok(())
    }
}

/// localStorage key holding the envelope for `namespace`.
pub fn app_state_key(namespace: &str) -> String {
    format!("{APP_STATE_KEY_PREFIX}{namespace}")
}

#[derive(Debug, Clone, Copy, Default)]
/// Preference store writing each key straight to `window.localStorage`.
pub struct WebPrefsStore;

impl PrefsStore for WebPrefsStore {
    fn load_pref<'a>(
        &'a self,
        key: &'a str,
    ) -> PrefsStoreFuture<'a, Result<Option<String>, String>> {
        Box::pin(async move { Ok(read_item(key)) })
    }

    fn save_pref<'a>(
        &'a self,
        key: &'a str,
        raw_json: &'a str,
    ) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async move { write_item(key, raw_json) })
    }

    fn delete_pref<'a>(&'a self, key: &'a str) -> PrefsStoreFuture<'a, Result<(), String>> {
        Box::pin(async move { remove_item(key) })
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// App-state store keeping one JSON envelope per namespace in `window.localStorage`.
pub struct WebAppStateStore;

impl AppStateStore for WebAppStateStore {
    fn load_app_state_envelope<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<Option<AppStateEnvelope>, String>> {
        Box::pin(async move {
            let Some(raw) = read_item(&app_state_key(namespace)) else {
                return Ok(None);
            };
            serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| format!("decode app state `{namespace}`: {e}"))
        })
    }

    fn save_app_state_envelope<'a>(
        &'a self,
        envelope: &'a AppStateEnvelope,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let raw = serde_json::to_string(envelope).map_err(|e| e.to_string())?;
            write_item(&app_state_key(&envelope.namespace), &raw)
        })
    }

    fn delete_app_state<'a>(
        &'a self,
        namespace: &'a str,
    ) -> AppStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move { remove_item(&app_state_key(namespace)) })
    }
}
