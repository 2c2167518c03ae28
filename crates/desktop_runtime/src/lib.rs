//! Window manager, app registry, store-front, and runtime container for the web desktop shell.

pub mod app_store;
pub mod apps;
pub mod auth;
pub mod model;
pub mod reducer;
pub mod runtime_context;
pub mod window_manager;

pub use app_store::{AppStore, AppStoreError, AppStoreState};
pub use apps::{
    default_apps, desktop_apps, find_app, AppDescriptor, AppMount, IconKey, PROTECTED_APP_IDS,
};
pub use auth::{AuthError, AuthSession, AuthState};
pub use model::*;
pub use reducer::{reduce_desktop, DesktopAction, RuntimeEffect};
pub use runtime_context::{DesktopRuntime, RuntimeError};
