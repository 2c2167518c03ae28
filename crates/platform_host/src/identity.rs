//! Identity (auth session) contracts and an in-memory adapter.

use std::{cell::RefCell, collections::HashMap, future::Future, pin::Pin, rc::Rc};

use serde::{Deserialize, Serialize};

/// Object-safe boxed future used by [`IdentityService`] async methods.
pub type IdentityFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Listener invoked on every auth-state change.
pub type AuthListener = Rc<dyn Fn(&AuthChange)>;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// Opaque user id used to scope per-user queries.
    pub id: String,
    /// Account email.
    pub email: String,
}

/// Auth-state transition delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    /// A user session became active.
    SignedIn(IdentityUser),
    /// The active session ended.
    SignedOut,
}

/// Handle returned by [`IdentityService::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthSubscriptionId(pub u64);

/// Session-based identity provider.
pub trait IdentityService {
    /// Returns the user of the current session, if any.
    fn current_session<'a>(&'a self) -> IdentityFuture<'a, Result<Option<IdentityUser>, String>>;

    /// Signs in with email and password.
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, Result<IdentityUser, String>>;

    /// Registers a new account.
    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, Result<(), String>>;

    /// Ends the current session.
    fn sign_out<'a>(&'a self) -> IdentityFuture<'a, Result<(), String>>;

    /// Registers a listener for auth-state changes.
    fn subscribe(&self, listener: AuthListener) -> AuthSubscriptionId;

    /// Removes a listener registered with [`IdentityService::subscribe`].
    fn unsubscribe(&self, id: AuthSubscriptionId);
}

#[derive(Debug, Clone, Copy, Default)]
/// Identity service for hosts without an auth backend; nobody is ever signed in.
pub struct NoopIdentityService;

impl IdentityService for NoopIdentityService {
    fn current_session<'a>(&'a self) -> IdentityFuture<'a, Result<Option<IdentityUser>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn sign_in<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a str,
    ) -> IdentityFuture<'a, Result<IdentityUser, String>> {
        Box::pin(async { Err("identity service unavailable".to_string()) })
    }

    fn sign_up<'a>(
        &'a self,
        _email: &'a str,
        _password: &'a str,
    ) -> IdentityFuture<'a, Result<(), String>> {
        Box::pin(async { Err("identity service unavailable".to_string()) })
    }

    fn sign_out<'a>(&'a self) -> IdentityFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&self, _listener: AuthListener) -> AuthSubscriptionId {
        AuthSubscriptionId(0)
    }

    fn unsubscribe(&self, _id: AuthSubscriptionId) {}
}

#[derive(Default)]
struct MemoryIdentityState {
    accounts: HashMap<String, (String, IdentityUser)>,
    current: Option<IdentityUser>,
    listeners: Vec<(AuthSubscriptionId, AuthListener)>,
    next_listener_id: u64,
    next_user_id: u64,
}

#[derive(Clone, Default)]
/// In-memory identity provider with email/password accounts.
pub struct MemoryIdentityService {
    inner: Rc<RefCell<MemoryIdentityState>>,
}

impl MemoryIdentityService {
    fn notify(&self, change: AuthChange) {
        let listeners = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(&change);
        }
    }
}

impl IdentityService for MemoryIdentityService {
    fn current_session<'a>(&'a self) -> IdentityFuture<'a, Result<Option<IdentityUser>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().current.clone()) })
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, Result<IdentityUser, String>> {
        Box::pin(async move {
            let user = {
                let mut state = self.inner.borrow_mut();
                let user = match state.accounts.get(email) {
                    Some((stored, user)) if stored == password => user.clone(),
                    _ => return Err("Invalid login credentials".to_string()),
                };
                state.current = Some(user.clone());
                user
            };
            self.notify(AuthChange::SignedIn(user.clone()));
            Ok(user)
        })
    }

    fn sign_up<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> IdentityFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let mut state = self.inner.borrow_mut();
            if state.accounts.contains_key(email) {
                return Err("User already registered".to_string());
            }
            state.next_user_id += 1;
            let user = IdentityUser {
                id: format!("user-{}", state.next_user_id),
                email: email.to_string(),
            };
            state
                .accounts
                .insert(email.to_string(), (password.to_string(), user));
            Ok(())
        })
    }

    fn sign_out<'a>(&'a self) -> IdentityFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let was_signed_in = self.inner.borrow_mut().current.take().is_some();
            if was_signed_in {
                self.notify(AuthChange::SignedOut);
            }
            Ok(())
        })
    }

    fn subscribe(&self, listener: AuthListener) -> AuthSubscriptionId {
        let mut state = self.inner.borrow_mut();
        state.next_listener_id += 1;
        let id = AuthSubscriptionId(state.next_listener_id);
        state.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: AuthSubscriptionId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }
}
