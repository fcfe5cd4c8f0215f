//! Authentication backend gateway
//!
//! Every network call to the authentication backend goes through here. Each
//! operation is one request/response round trip; failures are classified
//! per operation into [`AuthError`] in a single table ([`classify`]).

use std::fmt;

use async_trait::async_trait;
use common::settings::ApiSettings;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::models::{AuthGrant, LoginCredentials, NewAccount, UserProfile};

/// Operations offered by the authentication backend
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a user profile and a bearer token
    async fn login(&self, credentials: &LoginCredentials) -> AuthResult<AuthGrant>;

    /// Create an account and sign it in
    async fn register(&self, account: &NewAccount) -> AuthResult<AuthGrant>;

    /// Fetch the profile the token belongs to
    async fn current_user(&self, token: &str) -> AuthResult<UserProfile>;

    /// Exchange a token for a fresh one
    async fn refresh(&self, token: &str) -> AuthResult<String>;

    /// Revoke the token server side; best-effort, never fails
    async fn logout(&self, token: &str);
}

/// Backend operation, used to pick the endpoint and classify failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    CurrentUser,
    Refresh,
    Logout,
}

impl Operation {
    /// Endpoint path relative to the API base URL
    pub fn path(self) -> &'static str {
        match self {
            Operation::Login => "/auth/login",
            Operation::Register => "/auth/register",
            Operation::CurrentUser => "/auth/me",
            Operation::Refresh => "/auth/refresh",
            Operation::Logout => "/auth/logout",
        }
    }

    /// Message used when the backend gives no usable explanation
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Login => "Login failed",
            Operation::Register => "Registration failed",
            Operation::CurrentUser => "Failed to get user info",
            Operation::Refresh => "Token refresh failed",
            Operation::Logout => "Logout failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Login => "login",
            Operation::Register => "register",
            Operation::CurrentUser => "current user",
            Operation::Refresh => "refresh",
            Operation::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// Map a rejected (non-2xx) response of `operation` to its error
pub fn classify(operation: Operation, message: String) -> AuthError {
    match operation {
        Operation::Login => AuthError::InvalidCredentials(message),
        Operation::Register => AuthError::RegistrationRejected(message),
        Operation::CurrentUser | Operation::Logout => AuthError::Unauthorized(message),
        Operation::Refresh => AuthError::RefreshFailed(message),
    }
}

/// Extract the backend's explanation from an error body
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": "..."}, ...]}` and
/// `{"error": "..."}`; anything else yields the operation's generic message.
pub fn error_message(operation: Operation, body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return operation.fallback_message().to_string();
    };

    let message = match value.get("detail").or_else(|| value.get("error")) {
        Some(serde_json::Value::String(detail)) => Some(detail.clone()),
        Some(serde_json::Value::Array(entries)) => {
            let parts: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(|msg| msg.as_str()))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    };

    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| operation.fallback_message().to_string())
}

#[derive(Deserialize)]
struct GrantResponse {
    user: UserProfile,
    token: TokenResponse,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP implementation of [`AuthApi`]
#[derive(Clone)]
pub struct AuthGateway {
    http: reqwest::Client,
    api: ApiSettings,
}

impl AuthGateway {
    /// Create a gateway for the backend described by `api`
    pub fn new(api: ApiSettings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(api.request_timeout())
            .build()?;

        Ok(Self { http, api })
    }

    fn url(&self, operation: Operation) -> String {
        self.api.endpoint(operation.path())
    }

    /// Send a request; non-2xx responses become the operation's error
    async fn send(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> AuthResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            warn!("{} request did not reach the backend: {}", operation, e);
            AuthError::NetworkUnavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("{} succeeded with HTTP {}", operation, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(operation, &body);
        warn!("{} rejected with HTTP {}: {}", operation, status, message);
        Err(classify(operation, message))
    }

    async fn read_json<T: DeserializeOwned>(
        operation: Operation,
        response: reqwest::Response,
    ) -> AuthResult<T> {
        response.json::<T>().await.map_err(|e| {
            warn!("Unreadable {} response: {}", operation, e);
            AuthError::UnexpectedResponse(format!("{} response: {}", operation, e))
        })
    }
}

#[async_trait]
impl AuthApi for AuthGateway {
    async fn login(&self, credentials: &LoginCredentials) -> AuthResult<AuthGrant> {
        info!("Login attempt for user: {}", credentials.username);

        let request = self.http.post(self.url(Operation::Login)).json(credentials);
        let response = self.send(Operation::Login, request).await?;
        let grant: GrantResponse = Self::read_json(Operation::Login, response).await?;

        Ok(AuthGrant {
            user: grant.user,
            token: grant.token.access_token,
        })
    }

    async fn register(&self, account: &NewAccount) -> AuthResult<AuthGrant> {
        info!("Registration attempt for user: {}", account.username);

        let request = self.http.post(self.url(Operation::Register)).json(account);
        let response = self.send(Operation::Register, request).await?;
        let grant: GrantResponse = Self::read_json(Operation::Register, response).await?;

        Ok(AuthGrant {
            user: grant.user,
            token: grant.token.access_token,
        })
    }

    async fn current_user(&self, token: &str) -> AuthResult<UserProfile> {
        let request = self
            .http
            .get(self.url(Operation::CurrentUser))
            .bearer_auth(token);
        let response = self.send(Operation::CurrentUser, request).await?;
        Self::read_json(Operation::CurrentUser, response).await
    }

    async fn refresh(&self, token: &str) -> AuthResult<String> {
        info!("Token refresh request");

        let request = self.http.post(self.url(Operation::Refresh)).bearer_auth(token);
        let response = self.send(Operation::Refresh, request).await?;
        let body: TokenResponse = Self::read_json(Operation::Refresh, response).await?;
        Ok(body.access_token)
    }

    async fn logout(&self, token: &str) {
        info!("Logout request");

        let request = self.http.post(self.url(Operation::Logout)).bearer_auth(token);
        if let Err(e) = self.send(Operation::Logout, request).await {
            warn!("Logout request failed, local session is cleared anyway: {}", e);
        }
    }
}
