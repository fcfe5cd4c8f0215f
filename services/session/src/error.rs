//! Custom error types for the session client

use thiserror::Error;

/// Errors surfaced by the authentication gateway and the session controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The backend rejected the username/password pair
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The backend refused the registration (duplicate account, validation)
    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),

    /// The bearer token is stale or invalid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused to issue a new token
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The request never produced an HTTP response (connect error, timeout)
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A successful response carried a body the client cannot read
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Input rejected before anything was sent
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The operation needs a session and there is none
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials(msg)
            | AuthError::RegistrationRejected(msg)
            | AuthError::Unauthorized(msg)
            | AuthError::RefreshFailed(msg)
            | AuthError::Validation(msg) => msg.clone(),
            AuthError::NetworkUnavailable(_) => "Unable to reach the server".to_string(),
            AuthError::UnexpectedResponse(_) => "Unexpected response from the server".to_string(),
            AuthError::NotAuthenticated => "Not signed in".to_string(),
        }
    }
}

/// Type alias for session client results
pub type AuthResult<T> = Result<T, AuthError>;
