use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Model count shown when the backend reports none
pub const DEFAULT_MODEL_COUNT: u64 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub service: Option<String>,
    pub uptime: Option<String>,
    pub timestamp: Option<String>,
    pub environment: Option<String>,
}

/// One entry of the application catalogue; fields the dashboard does not
/// read are kept as they came
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppCard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl AppCard {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// `GET /apps` answers either a bare list or `{"apps": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AppsResponse {
    List(Vec<AppCard>),
    Wrapped {
        #[serde(default)]
        apps: Vec<AppCard>,
    },
}

impl From<AppsResponse> for Vec<AppCard> {
    fn from(response: AppsResponse) -> Self {
        match response {
            AppsResponse::List(apps) | AppsResponse::Wrapped { apps } => apps,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub total: u64,
    pub active_sessions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelStats {
    pub available: Vec<String>,
    pub count: u64,
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UptimeStats {
    pub seconds: u64,
    pub formatted: String,
    pub started_at: Option<String>,
}

/// System statistics; every section is optional and `{}` is the empty value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<UserStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apps: Option<AppStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_models: Option<ModelStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<UptimeStats>,
    /// Host resource usage, only present on the authenticated endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Set by the backend when it answered with placeholder figures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SystemStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which endpoint the current statistics came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsSource {
    Authenticated,
    Public,
    #[default]
    Unavailable,
}

/// Result of one polling tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Absent when the health check failed
    pub health: Option<HealthStatus>,
    pub apps: Vec<AppCard>,
    pub stats: SystemStats,
    pub stats_source: StatsSource,
    /// `None` until the first tick completes
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub fn is_online(&self) -> bool {
        self.health.is_some()
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from(self)
    }
}

/// Headline figures of the dashboard
///
/// Backend statistics win; a missing or zero figure falls back to what the
/// app list shows, or to a fixed default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub online: bool,
    pub total_apps: u64,
    pub active_apps: u64,
    pub model_count: u64,
    pub total_users: u64,
    pub uptime: String,
}

impl From<&DashboardSnapshot> for DashboardSummary {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        let stats = &snapshot.stats;
        let nonzero = |value: Option<u64>| value.filter(|v| *v > 0);

        let total_apps = nonzero(stats.apps.as_ref().map(|a| a.total))
            .unwrap_or(snapshot.apps.len() as u64);
        let active_apps = nonzero(stats.apps.as_ref().map(|a| a.active))
            .unwrap_or_else(|| snapshot.apps.iter().filter(|app| app.is_active()).count() as u64);
        let model_count =
            nonzero(stats.ai_models.as_ref().map(|m| m.count)).unwrap_or(DEFAULT_MODEL_COUNT);
        let total_users = stats.users.as_ref().map(|u| u.total).unwrap_or(0);
        let uptime = stats
            .uptime
            .as_ref()
            .map(|u| u.formatted.clone())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            online: snapshot.is_online(),
            total_apps,
            active_apps,
            model_count,
            total_users,
            uptime,
        }
    }
}
