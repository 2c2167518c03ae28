//! App descriptors, icon keys, and the built-in registry compiled from app manifests.

use std::sync::{Arc, OnceLock};

use platform_host::CatalogAppRecord;
use serde::{Deserialize, Serialize};

include!(concat!(env!("OUT_DIR"), "/app_catalog_generated.rs"));

/// App ids that can never be uninstalled.
pub const PROTECTED_APP_IDS: [&str; 2] = ["settings", "appstore"];

/// How an app's window content is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "lowercase")]
pub enum AppMount {
    /// Embedded component resolved by key.
    Component(String),
    /// Remote page shown in a frame.
    Url(String),
}

/// Closed set of icons the shell can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKey {
    Store,
    FileText,
    Calculator,
    Terminal,
    Browser,
    Chat,
    Code,
    Settings,
    Bot,
    /// Fallback for unknown tokens.
    App,
}

impl IconKey {
    /// Resolves a catalog icon token; unknown tokens map to [`IconKey::App`].
    pub fn from_token(token: &str) -> Self {
        match token {
            "store" => Self::Store,
            "file-text" => Self::FileText,
            "calculator" => Self::Calculator,
            "terminal" => Self::Terminal,
            "browser" => Self::Browser,
            "chat" | "messagesquare" => Self::Chat,
            "code" => Self::Code,
            "settings" => Self::Settings,
            "bot" => Self::Bot,
            _ => Self::App,
        }
    }

    /// Stable token used for CSS hooks.
    pub fn token(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::FileText => "file-text",
            Self::Calculator => "calculator",
            Self::Terminal => "terminal",
            Self::Browser => "browser",
            Self::Chat => "chat",
            Self::Code => "code",
            Self::Settings => "settings",
            Self::Bot => "bot",
            Self::App => "app",
        }
    }
}

/// Immutable catalog entry for a built-in or installable app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: String,
    pub name: String,
    /// Raw icon token; see [`AppDescriptor::icon_key`].
    pub icon: String,
    pub mount: AppMount,
    pub preferred_width: Option<u32>,
    pub preferred_height: Option<u32>,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub protected: bool,
}

impl AppDescriptor {
    pub fn icon_key(&self) -> IconKey {
        IconKey::from_token(&self.icon)
    }

    pub fn is_protected(&self) -> bool {
        self.protected || is_protected_app(&self.id)
    }

    /// Maps a remote catalog row. Rows marked `url` with a URL mount as frames; everything else
    /// mounts the component key, falling back to the app id.
    pub fn from_catalog(record: CatalogAppRecord) -> Self {
        let mount = match (record.app_type.as_deref(), record.url) {
            (Some("url") | None, Some(url)) if !url.trim().is_empty() => AppMount::Url(url),
            _ => AppMount::Component(record.component_path.unwrap_or_else(|| record.id.clone())),
        };
        let protected = is_protected_app(&record.id);

        Self {
            id: record.id,
            name: record.name,
            icon: record.icon,
            mount,
            preferred_width: record.preferred_width,
            preferred_height: record.preferred_height,
            min_width: record.min_width,
            min_height: record.min_height,
            category: record.category,
            description: record.description,
            screenshots: record.screenshots,
            features: record.features,
            protected,
        }
    }
}

pub fn is_protected_app(app_id: &str) -> bool {
    PROTECTED_APP_IDS.contains(&app_id)
}

#[derive(Debug, Deserialize)]
struct ManifestWindowDefaults {
    width: u32,
    height: u32,
    #[serde(default)]
    min_width: Option<u32>,
    #[serde(default)]
    min_height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    app_id: String,
    display_name: String,
    icon: String,
    category: String,
    description: String,
    mount: String,
    #[serde(default)]
    component_key: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    protected: bool,
    #[serde(default)]
    screenshots: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
    window_defaults: ManifestWindowDefaults,
}

impl From<ManifestEntry> for AppDescriptor {
    fn from(entry: ManifestEntry) -> Self {
        let mount = match (entry.mount.as_str(), entry.url) {
            ("url", Some(url)) => AppMount::Url(url),
            _ => AppMount::Component(
                entry
                    .component_key
                    .unwrap_or_else(|| entry.app_id.clone()),
            ),
        };

        Self {
            id: entry.app_id,
            name: entry.display_name,
            icon: entry.icon,
            mount,
            preferred_width: Some(entry.window_defaults.width),
            preferred_height: Some(entry.window_defaults.height),
            min_width: entry.window_defaults.min_width,
            min_height: entry.window_defaults.min_height,
            category: Some(entry.category),
            description: Some(entry.description),
            screenshots: entry.screenshots,
            features: entry.features,
            protected: entry.protected,
        }
    }
}

fn parse_manifest_catalog(raw: &str) -> Vec<Arc<AppDescriptor>> {
    match serde_json::from_str::<Vec<ManifestEntry>>(raw) {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| Arc::new(AppDescriptor::from(entry)))
            .collect(),
        Err(err) => {
            tracing::error!(error = %err, "built-in app manifest catalog is malformed");
            Vec::new()
        }
    }
}

/// Built-in apps, ordered by id.
pub fn default_apps() -> &'static [Arc<AppDescriptor>] {
    static DEFAULT_APPS: OnceLock<Vec<Arc<AppDescriptor>>> = OnceLock::new();
    DEFAULT_APPS.get_or_init(|| parse_manifest_catalog(APP_MANIFEST_CATALOG_JSON))
}

/// Apps shown on the desktop: built-ins followed by installed apps that do not shadow one.
pub fn desktop_apps(installed: &[Arc<AppDescriptor>]) -> Vec<Arc<AppDescriptor>> {
    let defaults = default_apps();
    defaults
        .iter()
        .cloned()
        .chain(
            installed
                .iter()
                .filter(|app| !defaults.iter().any(|builtin| builtin.id == app.id))
                .cloned(),
        )
        .collect()
}

/// Finds an app by id among the built-ins, then `installed`.
pub fn find_app(app_id: &str, installed: &[Arc<AppDescriptor>]) -> Option<Arc<AppDescriptor>> {
    default_apps()
        .iter()
        .chain(installed.iter())
        .find(|app| app.id == app_id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn installed(id: &str) -> Arc<AppDescriptor> {
        Arc::new(AppDescriptor::from_catalog(CatalogAppRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            icon: "calculator".to_string(),
            ..CatalogAppRecord::default()
        }))
    }

    #[test]
    fn built_in_catalog_holds_store_chat_and_settings() {
        let ids = default_apps()
            .iter()
            .map(|app| app.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["appstore", "chat", "settings"]);

        let chat = find_app("chat", &[]).expect("chat");
        assert_eq!(chat.name, "Chatty AI");
        assert_eq!(chat.mount, AppMount::Component("ChattyAI".to_string()));
        assert_eq!((chat.preferred_width, chat.preferred_height), (Some(1200), Some(800)));
        assert_eq!(chat.icon_key(), IconKey::Chat);

        let store = find_app("appstore", &[]).expect("app store");
        assert_eq!((store.min_width, store.min_height), (Some(600), Some(400)));
        assert!(store.is_protected());
    }

    #[test]
    fn desktop_apps_append_installed_without_shadowing_builtins() {
        let apps = desktop_apps(&[installed("calc"), installed("chat")]);
        let ids = apps.iter().map(|app| app.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["appstore", "chat", "settings", "calc"]);
        assert_eq!(apps[1].name, "Chatty AI");
    }

    #[test]
    fn catalog_rows_pick_mount_from_type_and_url() {
        let frame = AppDescriptor::from_catalog(CatalogAppRecord {
            id: "docs".to_string(),
            app_type: Some("url".to_string()),
            url: Some("https://example.com".to_string()),
            ..CatalogAppRecord::default()
        });
        assert_eq!(frame.mount, AppMount::Url("https://example.com".to_string()));

        let component = AppDescriptor::from_catalog(CatalogAppRecord {
            id: "notes".to_string(),
            app_type: Some("component".to_string()),
            url: Some("https://ignored.example".to_string()),
            component_path: Some("Notes".to_string()),
            ..CatalogAppRecord::default()
        });
        assert_eq!(component.mount, AppMount::Component("Notes".to_string()));
        assert_eq!(installed("calc").mount, AppMount::Component("calc".to_string()));
    }

    #[test]
    fn unknown_icon_tokens_fall_back_to_app() {
        assert_eq!(IconKey::from_token("messagesquare"), IconKey::Chat);
        assert_eq!(IconKey::from_token("rocket"), IconKey::App);
        assert_eq!(IconKey::App.token(), "app");
    }

    #[test]
    fn protected_ids_are_fixed() {
        assert!(is_protected_app("settings"));
        assert!(is_protected_app("appstore"));
        assert!(!is_protected_app("chat"));
    }
}
