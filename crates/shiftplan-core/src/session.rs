//! Session store: credential, profile and the login lifecycle.
//!
//! The store is the only writer of session state. Mutations happen under a
//! short-lived lock that is never held across an `.await`; subscribers are
//! notified after the lock is released. A generation counter, bumped on every
//! credential change, keeps late network results from overwriting a session
//! that has since ended or been replaced. Snapshots carry a version;
//! a notification overtaken by a newer snapshot is dropped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Result;

use crate::api::{ApiClient, ApiError, ApiErrorKind, AuthHooks, Profile};
use crate::events::{AppEvent, EventBus, NavigationTarget};
use crate::reactive::{Listeners, Subscription};
use crate::storage::{CREDENTIAL_KEY, DurableStore};

/// Coarse authentication state used by the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPhase {
    /// `init()` has not finished.
    Loading,
    Anonymous,
    Authenticated,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPhase::Loading => write!(f, "loading"),
            AuthPhase::Anonymous => write!(f, "anonymous"),
            AuthPhase::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Immutable snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub credential: Option<String>,
    pub profile: Option<Profile>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            loading: true,
            ..Self::anonymous()
        }
    }

    fn anonymous() -> Self {
        Self {
            credential: None,
            profile: None,
            loading: false,
            error: None,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        if self.loading {
            AuthPhase::Loading
        } else if self.credential.is_some() && self.profile.is_some() {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase() == AuthPhase::Authenticated
    }
}

/// Errors returned by session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend rejected or failed the request.
    Api(ApiError),
    /// The credential could not be persisted locally.
    Storage(String),
}

impl SessionError {
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            SessionError::Api(err) => Some(err.kind),
            SessionError::Storage(_) => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Api(err) => write!(f, "{err}"),
            SessionError::Storage(message) => write!(f, "Failed to save session: {message}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        SessionError::Api(err)
    }
}

/// What to do with a `401` reported by the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnauthorizedAction {
    /// End the session.
    ForceLogout,
    /// No credential is held; nothing to end.
    NoSession,
    /// `init()` is validating the credential and owns the outcome.
    SuppressedDuringInit,
    /// The request carried a credential that is no longer current.
    StaleCredential,
}

pub(crate) fn unauthorized_action(state: &SessionState, sent: Option<&str>) -> UnauthorizedAction {
    match (&state.credential, state.loading) {
        (None, _) => UnauthorizedAction::NoSession,
        (Some(_), true) => UnauthorizedAction::SuppressedDuringInit,
        (Some(held), false) if sent == Some(held.as_str()) => UnauthorizedAction::ForceLogout,
        (Some(_), false) => UnauthorizedAction::StaleCredential,
    }
}

struct Inner {
    state: Arc<SessionState>,
    generation: u64,
    version: u64,
}

/// Reactive authentication store.
pub struct SessionStore {
    client: Arc<ApiClient>,
    storage: Arc<dyn DurableStore>,
    bus: EventBus,
    inner: Mutex<Inner>,
    listeners: Listeners<SessionState>,
    init_started: AtomicBool,
}

impl SessionStore {
    /// Creates the store and installs it as the client's auth hooks.
    ///
    /// # Errors
    /// Returns an error if the client already has auth hooks installed.
    pub fn new(
        client: Arc<ApiClient>,
        storage: Arc<dyn DurableStore>,
        bus: EventBus,
    ) -> Result<Arc<Self>> {
        let store = Arc::new(Self {
            client: Arc::clone(&client),
            storage,
            bus,
            inner: Mutex::new(Inner {
                state: Arc::new(SessionState::initial()),
                generation: 0,
                version: 0,
            }),
            listeners: Listeners::new(),
            init_started: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&store);
        let hooks: Weak<dyn AuthHooks> = weak;
        client.install_auth_hooks(hooks)?;
        Ok(store)
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.lock().state)
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Registers a callback invoked with every new snapshot.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Restores the persisted session, validating it against the backend.
    ///
    /// Runs once per store; later calls return the current snapshot.
    pub async fn init(&self) -> Arc<SessionState> {
        if self.init_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("session init already ran");
            return self.state();
        }

        let persisted = match self.storage.get(CREDENTIAL_KEY) {
            Ok(value) => value.filter(|token| !token.trim().is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted credential");
                None
            }
        };

        let Some(credential) = persisted else {
            tracing::info!("no persisted credential; starting anonymous");
            let inner = self.lock();
            self.replace_state(inner, SessionState::anonymous());
            return self.state();
        };

        let generation = {
            let inner = self.lock();
            let generation = inner.generation;
            let next = SessionState {
                credential: Some(credential.clone()),
                ..SessionState::initial()
            };
            self.replace_state(inner, next);
            generation
        };

        let result = self.client.me().await;

        let inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("session changed during init; discarding validation result");
            drop(inner);
            return self.state();
        }

        match result {
            Ok(profile) => {
                tracing::info!(user_id = profile.id, "restored session");
                let next = SessionState {
                    credential: Some(credential),
                    profile: Some(profile),
                    loading: false,
                    error: None,
                };
                self.replace_state(inner, next);
            }
            Err(err) => {
                tracing::info!(kind = %err.kind, "persisted credential rejected; clearing");
                self.clear_persisted_credential();
                self.replace_state(inner, SessionState::anonymous());
            }
        }
        self.state()
    }

    /// Exchanges credentials, persists the token and loads the profile.
    ///
    /// # Errors
    /// Returns the login or profile failure. On failure the session stays
    /// anonymous and `error` carries the message.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> std::result::Result<Arc<SessionState>, SessionError> {
        tracing::info!(identifier, "login requested");

        let token = match self.client.login(identifier, secret).await {
            Ok(token) => token,
            Err(err) => {
                tracing::info!(kind = %err.kind, "login rejected");
                self.record_error(&err.message);
                return Err(err.into());
            }
        };

        let generation = {
            let mut inner = self.lock();
            if let Err(err) = self.storage.set(CREDENTIAL_KEY, &token) {
                drop(inner);
                let message = format!("{err:#}");
                self.record_error(&message);
                return Err(SessionError::Storage(message));
            }
            inner.generation += 1;
            let generation = inner.generation;
            let next = SessionState {
                credential: Some(token.clone()),
                ..SessionState::anonymous()
            };
            self.replace_state(inner, next);
            generation
        };

        let result = self.client.me().await;

        let inner = self.lock();
        if inner.generation != generation {
            drop(inner);
            tracing::warn!("session ended while the profile was loading");
            return Err(match result {
                Err(err) => err.into(),
                Ok(_) => ApiError::superseded().into(),
            });
        }

        match result {
            Ok(profile) => {
                tracing::info!(user_id = profile.id, "logged in");
                let next = SessionState {
                    credential: Some(token),
                    profile: Some(profile),
                    loading: false,
                    error: None,
                };
                self.replace_state(inner, next);
                self.bus
                    .publish(&AppEvent::NavigationRequested(NavigationTarget::Home));
                Ok(self.state())
            }
            Err(err) => {
                tracing::info!(kind = %err.kind, "profile load failed after login");
                self.clear_persisted_credential();
                let next = SessionState {
                    error: Some(err.message.clone()),
                    ..SessionState::anonymous()
                };
                self.replace_state(inner, next);
                Err(err.into())
            }
        }
    }

    /// Ends the session. Idempotent apart from the navigation request.
    pub fn logout(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        self.clear_persisted_credential();
        let was_signed_in = inner.state.credential.is_some();
        self.replace_state(inner, SessionState::anonymous());
        if was_signed_in {
            tracing::info!("logged out");
        }
        self.bus
            .publish(&AppEvent::NavigationRequested(NavigationTarget::Login));
    }

    fn force_logout(&self, sent_credential: Option<&str>) {
        let mut inner = self.lock();
        match unauthorized_action(&inner.state, sent_credential) {
            UnauthorizedAction::ForceLogout => {}
            UnauthorizedAction::NoSession => return,
            UnauthorizedAction::SuppressedDuringInit => {
                tracing::warn!("unauthorized response during session init; init decides");
                return;
            }
            UnauthorizedAction::StaleCredential => {
                tracing::debug!("unauthorized response for a replaced credential; ignoring");
                return;
            }
        }

        tracing::warn!("session rejected by server; forcing logout");
        inner.generation += 1;
        self.clear_persisted_credential();
        self.replace_state(inner, SessionState::anonymous());
        self.bus.publish(&AppEvent::SessionExpired);
        self.bus
            .publish(&AppEvent::NavigationRequested(NavigationTarget::Login));
    }

    fn record_error(&self, message: &str) {
        let inner = self.lock();
        let next = SessionState {
            error: Some(message.to_string()),
            ..(*inner.state).clone()
        };
        self.replace_state(inner, next);
    }

    fn clear_persisted_credential(&self) {
        if let Err(err) = self.storage.remove(CREDENTIAL_KEY) {
            tracing::error!(error = %err, "failed to remove persisted credential");
        }
    }

    /// Swaps in `next`, releases the lock, then notifies on change.
    fn replace_state(&self, mut inner: MutexGuard<'_, Inner>, next: SessionState) {
        if *inner.state == next {
            return;
        }
        let snapshot = Arc::new(next);
        inner.state = Arc::clone(&snapshot);
        inner.version += 1;
        let version = inner.version;
        drop(inner);
        self.listeners.notify_versioned(version, &snapshot);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AuthHooks for SessionStore {
    fn credential(&self) -> Option<String> {
        self.lock().state.credential.clone()
    }

    fn on_unauthorized(&self, sent_credential: Option<&str>) {
        self.force_logout(sent_credential);
    }
}
