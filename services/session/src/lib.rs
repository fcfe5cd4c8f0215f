//! Client-side session library
//!
//! Keeps a user signed in against the authentication backend: it exchanges
//! credentials for a bearer token, mirrors the session to local storage so it
//! survives restarts, reads token expiry, and refreshes or ends the session.
//! [`SessionController`] is the entry point; everything else is a part it is
//! built from.

pub mod controller;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;
pub mod token;
pub mod validation;

pub use controller::SessionController;
pub use error::{AuthError, AuthResult};
pub use gateway::{AuthApi, AuthGateway};
pub use models::{SessionSnapshot, SessionState, UserProfile};
pub use store::PersistedSessionStore;
pub use token::{TokenError, TokenInspector};
