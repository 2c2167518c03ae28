//! Runtime container composing the window manager with the app store, auth session, and chat
//! stores built from one [`HostServices`] bundle.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use desktop_app_chat::ChatStore;
use platform_host::HostServices;
use thiserror::Error;

use crate::{
    app_store::{AppStore, AppStoreError},
    apps::{desktop_apps, find_app, AppDescriptor},
    auth::AuthSession,
    model::{DesktopState, LayoutPolicy},
    reducer::{reduce_desktop, DesktopAction, RuntimeEffect},
};

/// Failures of runtime-level app management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No built-in or installed app has this id.
    #[error("no app with id `{0}`")]
    UnknownApp(String),
    /// The store-front rejected the request.
    #[error(transparent)]
    AppStore(#[from] AppStoreError),
}

#[derive(Clone)]
/// Long-lived handle owning desktop state and every per-instance store.
pub struct DesktopRuntime {
    host: HostServices,
    state: Rc<RefCell<DesktopState>>,
    effects: Rc<RefCell<Vec<RuntimeEffect>>>,
    /// Store-front over the remote catalog.
    pub apps: AppStore,
    /// Current auth session.
    pub auth: AuthSession,
    /// Chat app engine.
    pub chat: ChatStore,
}

impl DesktopRuntime {
    pub fn new(host: HostServices) -> Self {
        Self::with_policy(host, LayoutPolicy::default())
    }

    pub fn with_policy(host: HostServices, policy: LayoutPolicy) -> Self {
        let apps = AppStore::new(Rc::clone(&host.catalog), Rc::clone(&host.app_state));
        let auth = AuthSession::new(Rc::clone(&host.identity));
        let chat = ChatStore::new(Rc::clone(&host.generation), Rc::clone(&host.app_state));
        Self {
            host,
            state: Rc::new(RefCell::new(DesktopState::with_policy(policy))),
            effects: Rc::new(RefCell::new(Vec::new())),
            apps,
            auth,
            chat,
        }
    }

    pub fn host(&self) -> &HostServices {
        &self.host
    }

    /// Restores cached state, reads the auth session, and prepares the chat engine.
    ///
    /// Failures here are logged; the desktop still boots with whatever loaded.
    pub async fn boot(&self) {
        self.apps.hydrate().await;
        self.chat.hydrate().await;

        match self.auth.bootstrap().await {
            Ok(Some(user)) => {
                if let Err(err) = self.apps.fetch_installed_apps(&user.id).await {
                    tracing::warn!(error = %err, "installed apps unavailable at boot");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "booting without an auth session"),
        }

        self.chat.initialize_chat().await;
    }

    /// Applies a window-manager action and queues its effects.
    pub fn dispatch(&self, action: DesktopAction) -> Vec<RuntimeEffect> {
        let effects = reduce_desktop(&mut self.state.borrow_mut(), action);
        if !effects.is_empty() {
            tracing::debug!(?effects, "desktop reducer emitted effects");
            self.effects.borrow_mut().extend(effects.iter().cloned());
        }
        effects
    }

    /// Takes every queued effect.
    pub fn drain_effects(&self) -> Vec<RuntimeEffect> {
        std::mem::take(&mut *self.effects.borrow_mut())
    }

    pub fn desktop(&self) -> DesktopState {
        self.state.borrow().clone()
    }

    pub fn with_desktop<R>(&self, read: impl FnOnce(&DesktopState) -> R) -> R {
        read(&self.state.borrow())
    }

    /// Built-ins followed by the user's installed apps.
    pub fn desktop_apps(&self) -> Vec<Arc<AppDescriptor>> {
        desktop_apps(&self.apps.installed_apps())
    }

    /// Opens `app_id` unless a window for it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownApp`] when the id is neither built in nor installed.
    pub fn open_app(&self, app_id: &str) -> Result<Vec<RuntimeEffect>, RuntimeError> {
        let app = find_app(app_id, &self.apps.installed_apps())
            .ok_or_else(|| RuntimeError::UnknownApp(app_id.to_string()))?;
        Ok(self.dispatch(DesktopAction::open_app(app)))
    }

    fn require_user(&self) -> Result<String, RuntimeError> {
        self.auth
            .user_id()
            .ok_or(RuntimeError::AppStore(AppStoreError::SignedOut))
    }

    /// Installs an app for the signed-in user.
    ///
    /// # Errors
    ///
    /// Fails when nobody is signed in or the store-front rejects the install.
    pub async fn install_app(&self, app_id: &str) -> Result<(), RuntimeError> {
        let user_id = self.require_user()?;
        self.apps.install_app(&user_id, app_id).await?;
        Ok(())
    }

    /// Uninstalls an app for the signed-in user and closes its windows.
    ///
    /// # Errors
    ///
    /// Fails when nobody is signed in or the store-front rejects the uninstall; windows stay
    /// open in that case.
    pub async fn uninstall_app(&self, app_id: &str) -> Result<(), RuntimeError> {
        let user_id = self.require_user()?;
        self.apps.uninstall_app(&user_id, app_id).await?;
        self.dispatch(DesktopAction::RemoveApp {
            app_id: app_id.to_string(),
        });
        Ok(())
    }
}
