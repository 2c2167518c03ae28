//! Store-front over the remote app catalog: installable listing, per-user installs, and a local
//! cache of both lists.
//!
//! Install and uninstall update the local lists before the remote write and roll back when the
//! write fails.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc, sync::Arc};

use platform_host::{
    load_app_state_with_migration, save_app_state_with, AppStateEnvelope, AppStateStore,
    CatalogTable, APP_STORE_STATE_NAMESPACE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::apps::{is_protected_app, AppDescriptor};

/// Current schema of the cached store lists.
pub const APP_STORE_CACHE_SCHEMA_VERSION: u32 = 1;

/// Rejections and failures reported by store-front operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppStoreError {
    /// The app is part of the shell and cannot be uninstalled.
    #[error("`{0}` is a system app and cannot be uninstalled")]
    Protected(String),
    /// The app id is not in the installable catalog.
    #[error("`{0}` is not available in the app store")]
    UnknownApp(String),
    /// No user is signed in.
    #[error("sign in to manage apps")]
    SignedOut,
    /// The catalog backend rejected the call.
    #[error("{operation} failed: {message}")]
    Remote {
        /// Operation that failed.
        operation: &'static str,
        /// Backend message.
        message: String,
    },
}

/// Observable store-front state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppStoreState {
    /// Every app offered by the catalog.
    pub installable_apps: Vec<Arc<AppDescriptor>>,
    /// Apps installed by the current user.
    pub installed_apps: Vec<Arc<AppDescriptor>>,
    /// Distinct sorted categories of the installable apps.
    pub categories: Vec<String>,
    /// Whether a remote call is in flight.
    pub loading: bool,
    /// Last surfaced failure.
    pub error: Option<String>,
}

impl AppStoreState {
    pub fn is_installed(&self, app_id: &str) -> bool {
        self.installed_apps.iter().any(|app| app.id == app_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct AppStoreCache {
    #[serde(default)]
    installable_apps: Vec<AppDescriptor>,
    #[serde(default)]
    installed_apps: Vec<AppDescriptor>,
}

impl AppStoreCache {
    fn from_state(state: &AppStoreState) -> Self {
        Self {
            installable_apps: owned_descriptors(&state.installable_apps),
            installed_apps: owned_descriptors(&state.installed_apps),
        }
    }
}

fn owned_descriptors(apps: &[Arc<AppDescriptor>]) -> Vec<AppDescriptor> {
    apps.iter().map(|app| AppDescriptor::clone(app)).collect()
}

fn distinct_categories(apps: &[Arc<AppDescriptor>]) -> Vec<String> {
    apps.iter()
        .filter_map(|app| app.category.as_deref())
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn into_descriptors(records: Vec<platform_host::CatalogAppRecord>) -> Vec<Arc<AppDescriptor>> {
    records
        .into_iter()
        .map(|record| Arc::new(AppDescriptor::from_catalog(record)))
        .collect()
}

#[derive(Clone)]
/// Handle to the store-front state. Clones share state.
pub struct AppStore {
    state: Rc<RefCell<AppStoreState>>,
    catalog: Rc<dyn CatalogTable>,
    app_state: Rc<dyn AppStateStore>,
}

impl AppStore {
    pub fn new(catalog: Rc<dyn CatalogTable>, app_state: Rc<dyn AppStateStore>) -> Self {
        Self {
            state: Rc::new(RefCell::new(AppStoreState::default())),
            catalog,
            app_state,
        }
    }

    pub fn snapshot(&self) -> AppStoreState {
        self.state.borrow().clone()
    }

    pub fn installed_apps(&self) -> Vec<Arc<AppDescriptor>> {
        self.state.borrow().installed_apps.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Restores both lists from the local cache.
    pub async fn hydrate(&self) {
        let loaded = load_app_state_with_migration::<_, AppStoreCache, _>(
            self.app_state.as_ref(),
            APP_STORE_STATE_NAMESPACE,
            APP_STORE_CACHE_SCHEMA_VERSION,
            |_: u32, _: &AppStateEnvelope| Ok(None),
        )
        .await;

        match loaded {
            Ok(Some(cache)) => {
                let AppStoreCache {
                    installable_apps,
                    installed_apps,
                } = cache;
                let mut state = self.state.borrow_mut();
                state.installable_apps = installable_apps.into_iter().map(Arc::new).collect();
                state.installed_apps = installed_apps.into_iter().map(Arc::new).collect();
                state.categories = distinct_categories(&state.installable_apps);
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to restore app store cache"),
        }
    }

    async fn persist(&self) {
        let cache = AppStoreCache::from_state(&self.state.borrow());
        if let Err(err) = save_app_state_with(
            self.app_state.as_ref(),
            APP_STORE_STATE_NAMESPACE,
            APP_STORE_CACHE_SCHEMA_VERSION,
            &cache,
        )
        .await
        {
            tracing::warn!(error = %err, "failed to cache app store lists");
        }
    }

    fn begin(&self) {
        let mut state = self.state.borrow_mut();
        state.loading = true;
        state.error = None;
    }

    fn finish(&self, result: Result<(), AppStoreError>) -> Result<(), AppStoreError> {
        let mut state = self.state.borrow_mut();
        state.loading = false;
        if let Err(err) = &result {
            state.error = Some(err.to_string());
        }
        result
    }

    fn remote(operation: &'static str) -> impl FnOnce(String) -> AppStoreError {
        move |message| AppStoreError::Remote { operation, message }
    }

    /// Reloads the installable catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AppStoreError::Remote`] when the catalog query fails; cached lists are kept.
    pub async fn fetch_installable_apps(&self) -> Result<(), AppStoreError> {
        self.begin();
        let result = self
            .catalog
            .list_installable_apps()
            .await
            .map_err(Self::remote("listing installable apps"));
        let result = match result {
            Ok(records) => {
                let apps = into_descriptors(records);
                let mut state = self.state.borrow_mut();
                state.categories = distinct_categories(&apps);
                state.installable_apps = apps;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "app store catalog query failed");
                Err(err)
            }
        };
        if result.is_ok() {
            self.persist().await;
        }
        self.finish(result)
    }

    /// Reloads the apps installed by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppStoreError::Remote`] when the association query fails.
    pub async fn fetch_installed_apps(&self, user_id: &str) -> Result<(), AppStoreError> {
        self.begin();
        let result = self
            .catalog
            .list_installed_apps(user_id)
            .await
            .map_err(Self::remote("listing installed apps"));
        let result = match result {
            Ok(records) => {
                self.state.borrow_mut().installed_apps = into_descriptors(records);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, user_id, "installed app query failed");
                Err(err)
            }
        };
        if result.is_ok() {
            self.persist().await;
        }
        self.finish(result)
    }

    /// Returns the distinct sorted categories, loading the catalog first when it is empty.
    ///
    /// # Errors
    ///
    /// Propagates a failed catalog load.
    pub async fn fetch_categories(&self) -> Result<Vec<String>, AppStoreError> {
        if self.state.borrow().installable_apps.is_empty() {
            self.fetch_installable_apps().await?;
        }
        let mut state = self.state.borrow_mut();
        state.categories = distinct_categories(&state.installable_apps);
        Ok(state.categories.clone())
    }

    /// Installs `app_id` for `user_id`. Installing an installed app does nothing.
    ///
    /// # Errors
    ///
    /// [`AppStoreError::UnknownApp`] before any remote call when the id is not installable;
    /// [`AppStoreError::Remote`] after rolling back when the insert fails.
    pub async fn install_app(&self, user_id: &str, app_id: &str) -> Result<(), AppStoreError> {
        let app = {
            let state = self.state.borrow();
            if state.is_installed(app_id) {
                return Ok(());
            }
            state
                .installable_apps
                .iter()
                .find(|app| app.id == app_id)
                .cloned()
        };
        let Some(app) = app else {
            return self.finish(Err(AppStoreError::UnknownApp(app_id.to_string())));
        };

        self.begin();
        self.state.borrow_mut().installed_apps.push(app);
        let result = self
            .catalog
            .insert_user_app(user_id, app_id)
            .await
            .map_err(Self::remote("installing app"));

        match result {
            Ok(()) => self.persist().await,
            Err(ref err) => {
                self.state
                    .borrow_mut()
                    .installed_apps
                    .retain(|installed| installed.id != app_id);
                tracing::warn!(error = %err, app_id, "install rolled back");
            }
        }
        self.finish(result)
    }

    /// Uninstalls `app_id` for `user_id`. Uninstalling an app that is not installed does nothing.
    ///
    /// # Errors
    ///
    /// [`AppStoreError::Protected`] before any remote call for system apps;
    /// [`AppStoreError::Remote`] after rolling back when the delete fails.
    pub async fn uninstall_app(&self, user_id: &str, app_id: &str) -> Result<(), AppStoreError> {
        if is_protected_app(app_id) {
            return self.finish(Err(AppStoreError::Protected(app_id.to_string())));
        }

        let removed = {
            let mut state = self.state.borrow_mut();
            state
                .installed_apps
                .iter()
                .position(|app| app.id == app_id)
                .map(|index| (index, state.installed_apps.remove(index)))
        };
        let Some((index, app)) = removed else {
            return Ok(());
        };

        self.begin();
        let result = self
            .catalog
            .delete_user_app(user_id, app_id)
            .await
            .map_err(Self::remote("uninstalling app"));

        match result {
            Ok(()) => self.persist().await,
            Err(ref err) => {
                let mut state = self.state.borrow_mut();
                let index = index.min(state.installed_apps.len());
                state.installed_apps.insert(index, app);
                drop(state);
                tracing::warn!(error = %err, app_id, "uninstall rolled back");
            }
        }
        self.finish(result)
    }
}
