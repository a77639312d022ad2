//! Reactive authentication state.
//!
//! [`AuthContext`] keeps `{user, isAuthenticated, busy}` in memory and
//! publishes every change through a `watch` channel. It starts in
//! [`AuthStatus::Unknown`] until [`AuthContext::initialize`] has checked the
//! session store, and afterwards follows the client's session events, so a
//! 401 from any call signs the user out.
//!
//! # State Transitions
//!
//! ```text
//! Unknown ──initialize──> Anonymous | Authenticated
//! Anonymous ──login/register──> Authenticated
//! Authenticated ──logout / 401──> Anonymous
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ClientError, ErrorKind, Result};
use crate::events::SessionEvent;
use crate::models::{AuthPayload, RegisterRequest, UserSummary};
use crate::result::NormalizedResult;
use crate::session::SessionStore;

/// Shown when login fails without a server message.
pub const LOGIN_FAILED: &str = "Login failed";

/// Shown when registration fails without a server message.
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Where the user stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// The session store has not been checked yet.
    #[default]
    Unknown,
    /// No session.
    Anonymous,
    /// A token and user are stored.
    Authenticated,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Anonymous => write!(f, "anonymous"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// A snapshot of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Current status.
    pub status: AuthStatus,
    /// The signed-in user; `Some` only when authenticated.
    pub user: Option<UserSummary>,
    /// A login, registration or logout is in flight.
    #[serde(default)]
    pub busy: bool,
}

impl AuthState {
    /// Signed out.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            user: None,
            busy: false,
        }
    }

    /// Signed in as `user`.
    #[must_use]
    pub const fn authenticated(user: UserSummary) -> Self {
        Self {
            status: AuthStatus::Authenticated,
            user: Some(user),
            busy: false,
        }
    }

    /// Returns `true` when a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.status, AuthStatus::Authenticated)
    }
}

/// Reads the store and derives the state it implies.
async fn stored_state(session: &Arc<dyn SessionStore>) -> AuthState {
    match (session.get_token().await, session.get_user().await) {
        (Some(_), Some(user)) => AuthState::authenticated(user),
        _ => AuthState::anonymous(),
    }
}

/// Replaces the state unless it is still `Unknown`, notifying only on change.
/// The busy flag belongs to the operation in flight and is kept.
fn apply(state: &watch::Sender<AuthState>, mut next: AuthState) {
    state.send_if_modified(|current| {
        next.busy = current.busy;
        if current.status == AuthStatus::Unknown || *current == next {
            return false;
        }
        debug!(from = %current.status, to = %next.status, "Auth state changed");
        *current = next;
        true
    });
}

async fn follow_session_events(
    mut events: broadcast::Receiver<SessionEvent>,
    session: Arc<dyn SessionStore>,
    state: Arc<watch::Sender<AuthState>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                // The store is authoritative; an event may be stale by the time it arrives.
                let next = stored_state(&session).await;
                if let SessionEvent::Cleared { reason, .. } = &event {
                    if next.is_authenticated() {
                        debug!(%reason, "Ignoring stale session clear");
                        continue;
                    }
                    info!(%reason, "Session cleared; signing out");
                }
                apply(&state, next);
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Missed session events; re-reading session store");
                apply(&state, stored_state(&session).await);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// In-memory auth state backed by an [`ApiClient`].
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct AuthContext {
    client: Arc<ApiClient>,
    state: Arc<watch::Sender<AuthState>>,
    listener: JoinHandle<()>,
}

impl AuthContext {
    /// Creates a context in the `Unknown` state and starts following the
    /// client's session events.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (sender, _) = watch::channel(AuthState::default());
        let state = Arc::new(sender);
        let listener = tokio::spawn(follow_session_events(
            client.subscribe(),
            Arc::clone(client.session()),
            Arc::clone(&state),
        ));
        Self {
            client,
            state,
            listener,
        }
    }

    /// Checks the session store once at startup.
    ///
    /// A token without a readable user is treated as signed out and the
    /// store is cleared.
    pub async fn initialize(&self) -> Result<AuthState> {
        let current = self.status();
        if current != AuthStatus::Unknown {
            return Err(ClientError::invalid_transition(current, AuthStatus::Unknown));
        }

        let session = self.client.session();
        let next = match (session.get_token().await, session.get_user().await) {
            (Some(_), Some(user)) => AuthState::authenticated(user),
            (Some(_), None) => {
                warn!("Stored token has no readable user; clearing session");
                session.clear().await;
                AuthState::anonymous()
            }
            (None, user) => {
                if user.is_some() {
                    session.clear().await;
                }
                AuthState::anonymous()
            }
        };

        info!(status = %next.status, "Auth state initialized");
        self.state.send_replace(next.clone());
        Ok(next)
    }

    fn begin(&self) {
        self.state.send_if_modified(|current| !std::mem::replace(&mut current.busy, true));
    }

    /// Signs in. On failure the state falls back to whatever the store holds.
    pub async fn login(&self, email: &str, password: &str) -> NormalizedResult<UserSummary> {
        self.begin();
        let result = self
            .client
            .login(email, password)
            .await
            .with_fallback_message(LOGIN_FAILED);
        self.settle(result).await
    }

    /// Creates an account and signs in.
    pub async fn register(&self, registration: &RegisterRequest) -> NormalizedResult<UserSummary> {
        self.begin();
        let result = self
            .client
            .register(registration)
            .await
            .with_fallback_message(REGISTRATION_FAILED);
        self.settle(result).await
    }

    async fn settle(&self, result: NormalizedResult<AuthPayload>) -> NormalizedResult<UserSummary> {
        match result {
            NormalizedResult::Success(auth) => {
                self.state.send_replace(AuthState::authenticated(auth.user.clone()));
                NormalizedResult::Success(auth.user)
            }
            NormalizedResult::Failure(failure) => {
                let fallback = stored_state(self.client.session()).await;
                self.state.send_replace(fallback);
                NormalizedResult::Failure(failure)
            }
        }
    }

    /// Signs out. The local session is cleared even if the server is unreachable.
    pub async fn logout(&self) -> NormalizedResult<Value> {
        self.begin();
        let result = self.client.logout().await;
        self.state.send_replace(AuthState::anonymous());
        result
    }

    /// Fetches the profile and replaces the cached user with it.
    pub async fn refresh_profile(&self) -> NormalizedResult<UserSummary> {
        let result = self.client.fetch_profile().await;
        let session = self.client.session();
        match &result {
            NormalizedResult::Success(user) => {
                if let Some(token) = session.get_token().await {
                    if let Err(e) = session.set_session(&token, user).await {
                        warn!(error = %e, "Failed to persist refreshed profile");
                    }
                    self.state.send_replace(AuthState::authenticated(user.clone()));
                }
            }
            NormalizedResult::Failure(failure) if failure.kind == ErrorKind::AuthRejected => {
                self.state.send_replace(AuthState::anonymous());
            }
            NormalizedResult::Failure(_) => {}
        }
        result
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.state.borrow().status
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserSummary> {
        self.state.borrow().user.clone()
    }

    /// Returns `true` when a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Returns `true` while a login, registration or logout is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    /// Watches state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The underlying API client.
    #[must_use]
    pub const fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
