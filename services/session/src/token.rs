//! Bearer token inspection
//!
//! Tokens are compact three-part strings (`header.payload.signature`). The
//! client only reads the payload segment to learn when the token expires;
//! the signature is never checked, the backend stays the authority on
//! whether a token is valid.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

/// Reason a token could not be decoded
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Malformed token: expected 3 segments, found {0}")]
    SegmentCount(usize),

    #[error("Malformed token: payload is not base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Malformed token: payload is not a claims object: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Claims read from a token payload
///
/// Only the payload's JSON object shape is required; registered claims of an
/// unexpected type are read leniently or left out.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    /// Expiration time (seconds since epoch, fractions floored)
    pub exp: Option<i64>,
    /// Subject, numeric subjects rendered as text
    pub sub: Option<String>,
    /// Issued at time
    pub iat: Option<i64>,
    /// Every claim exactly as decoded
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    fn from_map(raw: serde_json::Map<String, serde_json::Value>) -> Self {
        let sub = match raw.get("sub") {
            Some(serde_json::Value::String(sub)) => Some(sub.clone()),
            Some(serde_json::Value::Number(sub)) => Some(sub.to_string()),
            _ => None,
        };

        Self {
            exp: raw.get("exp").and_then(numeric_date),
            sub,
            iat: raw.get("iat").and_then(numeric_date),
            raw,
        }
    }
}

/// Read a NumericDate, which may be fractional
fn numeric_date(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|seconds| seconds.is_finite())
            .map(|seconds| seconds.floor() as i64)
    })
}

/// Reads expiry information out of bearer tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenInspector;

impl TokenInspector {
    pub fn new() -> Self {
        Self
    }

    /// Decode the payload segment, reporting why it failed
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::SegmentCount(segments.len()));
        }

        let payload = segments[1].trim_end_matches('=');
        let bytes = match URL_SAFE_NO_PAD.decode(payload) {
            Ok(bytes) => bytes,
            Err(err) => STANDARD_NO_PAD.decode(payload).map_err(|_| err)?,
        };

        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&bytes)?;
        Ok(Claims::from_map(raw))
    }

    /// Decode the payload segment; `None` on any malformed input
    pub fn decode(&self, token: &str) -> Option<Claims> {
        match self.parse(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Ignoring undecodable token: {}", e);
                None
            }
        }
    }

    /// Whether the token is expired; undecodable tokens and tokens without
    /// an `exp` claim count as expired
    pub fn is_expired(&self, token: &str) -> bool {
        self.is_expired_at(token, Utc::now())
    }

    pub fn is_expired_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        match self.decode(token).and_then(|claims| claims.exp) {
            Some(exp) => exp < now.timestamp(),
            None => true,
        }
    }

    /// Expiration time of the token
    pub fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        let exp = self.decode(token)?.exp?;
        DateTime::from_timestamp(exp, 0)
    }

    /// Whole minutes left before the token expires, negative once expired
    pub fn minutes_until_expiry(&self, token: &str) -> Option<i64> {
        self.minutes_until_expiry_at(token, Utc::now())
    }

    pub fn minutes_until_expiry_at(&self, token: &str, now: DateTime<Utc>) -> Option<i64> {
        let expires_at = self.expires_at(token)?;
        Some((expires_at - now).num_milliseconds().div_euclid(60_000))
    }
}
