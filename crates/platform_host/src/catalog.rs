//! Remote app-catalog table contracts and an in-memory adapter.
//!
//! The backend exposes two tables: the installable-app catalog and a user/app association table.
//! "Installed" apps are the catalog rows joined through the association rows for one user.

use std::{cell::RefCell, collections::HashMap, future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};

/// Object-safe boxed future used by [`CatalogTable`] async methods.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// One row of the installable-app catalog table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogAppRecord {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon key.
    pub icon: String,
    /// Store category.
    #[serde(default)]
    pub category: Option<String>,
    /// Mount kind token (`url` or `component`).
    #[serde(default, rename = "type")]
    pub app_type: Option<String>,
    /// Frame URL for remote apps.
    #[serde(default)]
    pub url: Option<String>,
    /// Component key for embedded apps.
    #[serde(default)]
    pub component_path: Option<String>,
    /// Preferred window width.
    #[serde(default)]
    pub preferred_width: Option<u32>,
    /// Preferred window height.
    #[serde(default)]
    pub preferred_height: Option<u32>,
    /// Minimum window width.
    #[serde(default)]
    pub min_width: Option<u32>,
    /// Minimum window height.
    #[serde(default)]
    pub min_height: Option<u32>,
    /// Store description.
    #[serde(default)]
    pub description: Option<String>,
    /// Screenshot URLs.
    #[serde(default)]
    pub screenshots: Vec<String>,
    /// Feature bullet list.
    #[serde(default)]
    pub features: Vec<String>,
}

/// Remote table operations used by the app store-front.
pub trait CatalogTable {
    /// Lists every installable app.
    fn list_installable_apps<'a>(&'a self)
        -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>>;

    /// Lists apps associated with `user_id`.
    fn list_installed_apps<'a>(
        &'a self,
        user_id: &'a str,
    ) -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>>;

    /// Inserts a user/app association row.
    fn insert_user_app<'a>(
        &'a self,
        user_id: &'a str,
        app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>>;

    /// Deletes a user/app association row.
    fn delete_user_app<'a>(
        &'a self,
        user_id: &'a str,
        app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Catalog for hosts without a backend: empty lists, accepted writes.
pub struct NoopCatalogTable;

impl CatalogTable for NoopCatalogTable {
    fn list_installable_apps<'a>(
        &'a self,
    ) -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn list_installed_apps<'a>(
        &'a self,
        _user_id: &'a str,
    ) -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn insert_user_app<'a>(
        &'a self,
        _user_id: &'a str,
        _app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_user_app<'a>(
        &'a self,
        _user_id: &'a str,
        _app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

/// Operation kinds recorded and fault-injected by [`MemoryCatalogTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOperation {
    /// `list_installable_apps`.
    ListInstallable,
    /// `list_installed_apps`.
    ListInstalled,
    /// `insert_user_app`.
    Insert,
    /// `delete_user_app`.
    Delete,
}

#[derive(Debug, Default)]
struct MemoryCatalogState {
    apps: Vec<CatalogAppRecord>,
    associations: Vec<(String, String)>,
    failures: HashMap<CatalogOperation, String>,
    calls: Vec<CatalogOperation>,
}

#[derive(Debug, Clone, Default)]
/// In-memory catalog with one-shot failure injection. Clones share state.
pub struct MemoryCatalogTable {
    inner: Rc<RefCell<MemoryCatalogState>>,
}

impl MemoryCatalogTable {
    /// Seeds the installable catalog.
    pub fn with_apps(self, apps: Vec<CatalogAppRecord>) -> Self {
        self.inner.borrow_mut().apps = apps;
        self
    }

    /// Makes the next `operation` call fail with `message`.
    pub fn fail_next(&self, operation: CatalogOperation, message: impl Into<String>) {
        self.inner
            .borrow_mut()
            .failures
            .insert(operation, message.into());
    }

    /// Returns every operation attempted so far, in order.
    pub fn calls(&self) -> Vec<CatalogOperation> {
        self.inner.borrow().calls.clone()
    }

    /// Returns the app ids associated with `user_id`.
    pub fn associations_for(&self, user_id: &str) -> Vec<String> {
        self.inner
            .borrow()
            .associations
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, app)| app.clone())
            .collect()
    }

    fn begin(&self, operation: CatalogOperation) -> Result<(), String> {
        let mut state = self.inner.borrow_mut();
        state.calls.push(operation);
        match state.failures.remove(&operation) {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

impl CatalogTable for MemoryCatalogTable {
    fn list_installable_apps<'a>(
        &'a self,
    ) -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>> {
        Box::pin(async move {
            self.begin(CatalogOperation::ListInstallable)?;
            Ok(self.inner.borrow().apps.clone())
        })
    }

    fn list_installed_apps<'a>(
        &'a self,
        user_id: &'a str,
    ) -> CatalogFuture<'a, Result<Vec<CatalogAppRecord>, String>> {
        Box::pin(async move {
            self.begin(CatalogOperation::ListInstalled)?;
            let state = self.inner.borrow();
            let installed = state
                .associations
                .iter()
                .filter(|(user, _)| user == user_id)
                .filter_map(|(_, app_id)| state.apps.iter().find(|app| &app.id == app_id))
                .cloned()
                .collect();
            Ok(installed)
        })
    }

    fn insert_user_app<'a>(
        &'a self,
        user_id: &'a str,
        app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.begin(CatalogOperation::Insert)?;
            let mut state = self.inner.borrow_mut();
            let row = (user_id.to_string(), app_id.to_string());
            if state.associations.contains(&row) {
                return Err(format!("app `{app_id}` already installed for user"));
            }
            state.associations.push(row);
            Ok(())
        })
    }

    fn delete_user_app<'a>(
        &'a self,
        user_id: &'a str,
        app_id: &'a str,
    ) -> CatalogFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.begin(CatalogOperation::Delete)?;
            self.inner
                .borrow_mut()
                .associations
                .retain(|(user, app)| !(user == user_id && app == app_id));
            Ok(())
        })
    }
}
