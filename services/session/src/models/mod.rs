//! Session client models

pub mod session;
pub mod user;

// Re-export for convenience
pub use session::{AuthGrant, PersistedRecord, Session, SessionSnapshot, SessionState};
pub use user::{LoginCredentials, NewAccount, UserProfile};
