//! Session model and related functionality

use serde::{Deserialize, Serialize};

use super::user::UserProfile;

/// Lifecycle state of the client session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Startup, before the persisted session has been checked by the backend
    #[default]
    Unknown,
    /// No session
    Unauthenticated,
    /// A login, registration or refresh is in flight
    Authenticating,
    /// Session confirmed by the backend
    Authenticated,
}

/// In-memory session: the current user and bearer token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
}

impl Session {
    pub fn new(user: UserProfile, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    /// A session is authenticated only when both halves are present
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

impl From<PersistedRecord> for Session {
    fn from(record: PersistedRecord) -> Self {
        Self::new(record.user, record.token)
    }
}

/// Point-in-time view of the session published to observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session: Session,
    /// Message of the last failed login, registration or refresh
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

/// The two entries mirrored to client storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub token: String,
    pub user: UserProfile,
}

/// Successful login or registration result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: UserProfile,
    pub token: String,
}

impl From<AuthGrant> for PersistedRecord {
    fn from(grant: AuthGrant) -> Self {
        Self {
            token: grant.token,
            user: grant.user,
        }
    }
}
