//! Auth session store over the host identity provider.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use platform_host::{AuthChange, AuthSubscriptionId, IdentityService, IdentityUser};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failure reported by the identity provider.
#[error("{0}")]
pub struct AuthError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<IdentityUser>,
    /// True until the first session lookup finishes.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

#[derive(Clone)]
/// Handle to the current auth session. Clones share state.
pub struct AuthSession {
    state: Rc<RefCell<AuthState>>,
    identity: Rc<dyn IdentityService>,
    subscription: Rc<Cell<Option<AuthSubscriptionId>>>,
}

impl AuthSession {
    pub fn new(identity: Rc<dyn IdentityService>) -> Self {
        Self {
            state: Rc::new(RefCell::new(AuthState::default())),
            identity,
            subscription: Rc::new(Cell::new(None)),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<IdentityUser> {
        self.state.borrow().user.clone()
    }

    /// Opaque id used to scope installed-app queries.
    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().user.as_ref().map(|user| user.id.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Subscribes to provider auth changes and reads the current session.
    ///
    /// # Errors
    ///
    /// Returns the provider message when the session lookup fails; the session is then treated
    /// as signed out.
    pub async fn bootstrap(&self) -> Result<Option<IdentityUser>, AuthError> {
        if self.subscription.get().is_none() {
            let weak: Weak<RefCell<AuthState>> = Rc::downgrade(&self.state);
            let id = self.identity.subscribe(Rc::new(move |change: &AuthChange| {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                state.borrow_mut().user = match change {
                    AuthChange::SignedIn(user) => Some(user.clone()),
                    AuthChange::SignedOut => None,
                };
            }));
            self.subscription.set(Some(id));
        }

        let session = self.identity.current_session().await;
        let mut state = self.state.borrow_mut();
        state.loading = false;
        match session {
            Ok(user) => {
                state.user = user.clone();
                Ok(user)
            }
            Err(message) => {
                tracing::warn!(error = %message, "auth session lookup failed");
                state.user = None;
                Err(AuthError(message))
            }
        }
    }

    /// Signs in and records the user.
    ///
    /// # Errors
    ///
    /// Returns the provider message on rejected credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, AuthError> {
        let user = self
            .identity
            .sign_in(email, password)
            .await
            .map_err(AuthError)?;
        self.state.borrow_mut().user = Some(user.clone());
        Ok(user)
    }

    /// Registers an account. The session is unchanged until the user signs in.
    ///
    /// # Errors
    ///
    /// Returns the provider message when registration is refused.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.identity
            .sign_up(email, password)
            .await
            .map_err(AuthError)
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns the provider message; the local user is kept in that case.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity.sign_out().await.map_err(AuthError)?;
        self.state.borrow_mut().user = None;
        Ok(())
    }

    /// Drops the provider subscription installed by [`AuthSession::bootstrap`].
    pub fn detach(&self) {
        if let Some(id) = self.subscription.take() {
            self.identity.unsubscribe(id);
        }
    }
}
