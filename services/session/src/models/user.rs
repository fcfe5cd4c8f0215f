//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile as returned by the backend
///
/// The client never edits a profile in place; a fresher copy from the
/// backend replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub email_verified: bool,
}

/// User login credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// New account registration payload
#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Accepts RFC 3339 timestamps as well as zone-less ISO timestamps, which
/// are read as UTC.
mod flexible_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
