//! Session lifecycle controller
//!
//! Owns the in-memory session and is the only writer of the persisted one.
//! The current [`SessionSnapshot`] lives in a watch channel so readers never
//! wait; operations that change the session (login, register, refresh,
//! logout and startup revalidation) are serialized by an async lock, so a
//! second call queues behind the first instead of interleaving with it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::gateway::AuthApi;
use crate::models::{
    AuthGrant, LoginCredentials, NewAccount, PersistedRecord, Session, SessionSnapshot,
    SessionState, UserProfile,
};
use crate::store::PersistedSessionStore;
use crate::token::TokenInspector;
use crate::validation::{validate_login, validate_registration};

/// Upper bound on how long logout waits for the backend
pub const DEFAULT_LOGOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Session controller for the dashboard
pub struct SessionController {
    gateway: Arc<dyn AuthApi>,
    store: PersistedSessionStore,
    inspector: TokenInspector,
    snapshot: watch::Sender<SessionSnapshot>,
    op_lock: Mutex<()>,
    logout_timeout: Duration,
}

impl SessionController {
    /// Create a controller in the `Unknown` state
    pub fn new(gateway: Arc<dyn AuthApi>, store: PersistedSessionStore) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());

        Self {
            gateway,
            store,
            inspector: TokenInspector::new(),
            snapshot,
            op_lock: Mutex::new(()),
            logout_timeout: DEFAULT_LOGOUT_TIMEOUT,
        }
    }

    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receive every subsequent snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.snapshot.borrow().session.user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot.borrow().session.token.clone()
    }

    /// True while both a user and a token are held, including the
    /// optimistic window before startup revalidation completes
    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().is_authenticated()
    }

    pub fn last_error(&self) -> Option<String> {
        self.snapshot.borrow().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.snapshot.send_modify(|s| s.last_error = None);
    }

    /// Expiration time of the held token, if it can be read
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token().and_then(|t| self.inspector.expires_at(&t))
    }

    /// Minutes left on the held token, if it can be read
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.token().and_then(|t| self.inspector.minutes_until_expiry(&t))
    }

    /// Run both startup phases: restore from storage, then confirm with the
    /// backend
    pub async fn initialize(&self) -> SessionState {
        self.restore().await;
        self.revalidate().await
    }

    /// Startup phase one: load the persisted session into memory
    ///
    /// With a record the state stays `Unknown` while the session already
    /// counts as authenticated; without one the state becomes
    /// `Unauthenticated`. Only acts while the state is `Unknown`.
    pub async fn restore(&self) -> SessionState {
        let _guard = self.op_lock.lock().await;

        let current = self.state();
        if current != SessionState::Unknown {
            return current;
        }

        match self.store.get() {
            Some(record) => {
                info!("Restored persisted session for user: {}", record.user.username);
                self.snapshot.send_modify(|s| s.session = record.into());
                SessionState::Unknown
            }
            None => {
                info!("No persisted session found");
                self.snapshot.send_modify(|s| s.state = SessionState::Unauthenticated);
                SessionState::Unauthenticated
            }
        }
    }

    /// Startup phase two: confirm the restored token with the backend
    ///
    /// Success replaces the user with the backend's copy; any failure clears
    /// the session in memory and in storage. Only acts while the state is
    /// `Unknown`.
    pub async fn revalidate(&self) -> SessionState {
        let _guard = self.op_lock.lock().await;

        let snapshot = self.snapshot();
        if snapshot.state != SessionState::Unknown {
            return snapshot.state;
        }

        let Some(token) = snapshot.session.token else {
            self.snapshot.send_modify(|s| s.state = SessionState::Unauthenticated);
            return SessionState::Unauthenticated;
        };

        match self.gateway.current_user(&token).await {
            Ok(user) => {
                info!("Persisted session confirmed for user: {}", user.username);
                let record = PersistedRecord { token, user };
                self.store.set(&record);
                self.snapshot.send_replace(SessionSnapshot {
                    state: SessionState::Authenticated,
                    session: record.into(),
                    last_error: None,
                });
                SessionState::Authenticated
            }
            Err(e) => {
                warn!("Persisted session rejected, clearing it: {}", e);
                self.clear_session(None);
                SessionState::Unauthenticated
            }
        }
    }

    /// Sign in with a username and password
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<UserProfile> {
        let credentials = LoginCredentials {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let _guard = self.op_lock.lock().await;
        if let Err(e) = validate_login(&credentials) {
            return Err(self.record_error(e));
        }

        let previous = self.begin();

        match self.gateway.login(&credentials).await {
            Ok(grant) => {
                info!("User logged in: {}", grant.user.username);
                Ok(self.establish(grant))
            }
            Err(e) => {
                warn!("Login failed for user {}: {}", credentials.username, e);
                Err(self.abort(previous, e))
            }
        }
    }

    /// Create an account and sign it in
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<UserProfile> {
        let account = NewAccount {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let _guard = self.op_lock.lock().await;
        if let Err(e) = validate_registration(&account) {
            return Err(self.record_error(e));
        }

        let previous = self.begin();

        match self.gateway.register(&account).await {
            Ok(grant) => {
                info!("User registered: {}", grant.user.username);
                Ok(self.establish(grant))
            }
            Err(e) => {
                warn!("Registration failed for user {}: {}", account.username, e);
                Err(self.abort(previous, e))
            }
        }
    }

    /// Exchange the held token for a fresh one
    ///
    /// A failed refresh ends the session entirely.
    pub async fn refresh(&self) -> AuthResult<String> {
        let _guard = self.op_lock.lock().await;

        let current = self.snapshot().session;
        let (Some(token), Some(user)) = (current.token, current.user) else {
            return Err(AuthError::NotAuthenticated);
        };

        self.begin();

        match self.gateway.refresh(&token).await {
            Ok(new_token) => {
                info!("Token refreshed for user: {}", user.username);
                let record = PersistedRecord {
                    token: new_token.clone(),
                    user,
                };
                self.store.set(&record);
                self.snapshot.send_replace(SessionSnapshot {
                    state: SessionState::Authenticated,
                    session: record.into(),
                    last_error: None,
                });
                Ok(new_token)
            }
            Err(e) => {
                error!("Token refresh failed, ending session: {}", e);
                self.clear_session(Some(e.user_message()));
                Err(e)
            }
        }
    }

    /// Refresh the token when it expires within `threshold_minutes` or its
    /// expiry cannot be read; returns whether a refresh happened
    ///
    /// Does nothing until startup revalidation has settled the session.
    pub async fn refresh_if_expiring(&self, threshold_minutes: i64) -> AuthResult<bool> {
        if self.state() == SessionState::Unknown {
            return Ok(false);
        }
        let Some(token) = self.token() else {
            return Ok(false);
        };

        match self.inspector.minutes_until_expiry(&token) {
            Some(minutes) if minutes > threshold_minutes => Ok(false),
            _ => {
                info!("Token expires within {} minutes, refreshing", threshold_minutes);
                self.refresh().await.map(|_| true)
            }
        }
    }

    /// Sign out; always ends unauthenticated, whatever the backend answers
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;

        if let Some(token) = self.token() {
            if tokio::time::timeout(self.logout_timeout, self.gateway.logout(&token))
                .await
                .is_err()
            {
                warn!(
                    "Logout request timed out after {:?}, clearing local session anyway",
                    self.logout_timeout
                );
            }
        }

        self.clear_session(None);
        info!("Logged out");
    }

    /// Enter `Authenticating`, returning the snapshot to restore on failure
    fn begin(&self) -> SessionSnapshot {
        let previous = self.snapshot();
        self.snapshot.send_modify(|s| {
            s.state = SessionState::Authenticating;
            s.last_error = None;
        });
        previous
    }

    /// Persist a granted session, then publish it
    fn establish(&self, grant: AuthGrant) -> UserProfile {
        let record = PersistedRecord::from(grant);
        self.store.set(&record);

        let user = record.user.clone();
        self.snapshot.send_replace(SessionSnapshot {
            state: SessionState::Authenticated,
            session: record.into(),
            last_error: None,
        });
        user
    }

    /// Put back the session held before a failed login or registration
    fn abort(&self, previous: SessionSnapshot, error: AuthError) -> AuthError {
        let state = if previous.session.is_authenticated() {
            previous.state
        } else {
            SessionState::Unauthenticated
        };

        self.snapshot.send_replace(SessionSnapshot {
            state,
            session: previous.session,
            last_error: Some(error.user_message()),
        });
        error
    }

    fn record_error(&self, error: AuthError) -> AuthError {
        self.snapshot
            .send_modify(|s| s.last_error = Some(error.user_message()));
        error
    }

    /// Drop the session from storage and memory
    fn clear_session(&self, last_error: Option<String>) {
        self.store.clear();
        self.snapshot.send_replace(SessionSnapshot {
            state: SessionState::Unauthenticated,
            session: Session::default(),
            last_error,
        });
    }
}
