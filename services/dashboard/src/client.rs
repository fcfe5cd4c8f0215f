//! Dashboard REST client
//!
//! Read-only calls feeding the dashboard: backend health, the application
//! catalogue and system statistics.

use async_trait::async_trait;
use common::settings::ApiSettings;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::models::{AppCard, AppsResponse, HealthStatus, SystemStats};

/// Errors of the dashboard client
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{endpoint} answered HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Unreadable {endpoint} response: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

/// Type alias for dashboard results
pub type DashboardResult<T> = Result<T, DashboardError>;

pub const HEALTH_PATH: &str = "/system/health";
pub const APPS_PATH: &str = "/apps";
pub const STATS_PATH: &str = "/system/stats";
pub const PUBLIC_STATS_PATH: &str = "/system/stats/public";

/// Data sources of the dashboard
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn health(&self) -> DashboardResult<HealthStatus>;

    async fn apps(&self) -> DashboardResult<Vec<AppCard>>;

    /// Full statistics, visible to signed-in users only
    async fn authenticated_stats(&self, token: &str) -> DashboardResult<SystemStats>;

    async fn public_stats(&self) -> DashboardResult<SystemStats>;
}

/// HTTP implementation of [`DashboardApi`]
#[derive(Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    api: ApiSettings,
}

impl DashboardClient {
    pub fn new(api: ApiSettings) -> DashboardResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(api.request_timeout())
            .build()?;

        Ok(Self { http, api })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        token: Option<&str>,
    ) -> DashboardResult<T> {
        let mut request = self.http.get(self.api.endpoint(endpoint));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status { endpoint, status });
        }

        let body = response.text().await?;
        debug!("{} answered {} bytes", endpoint, body.len());
        serde_json::from_str(&body).map_err(|e| DashboardError::Decode {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DashboardApi for DashboardClient {
    async fn health(&self) -> DashboardResult<HealthStatus> {
        self.fetch(HEALTH_PATH, None).await
    }

    async fn apps(&self) -> DashboardResult<Vec<AppCard>> {
        let response: AppsResponse = self.fetch(APPS_PATH, None).await?;
        Ok(response.into())
    }

    async fn authenticated_stats(&self, token: &str) -> DashboardResult<SystemStats> {
        self.fetch(STATS_PATH, Some(token)).await
    }

    async fn public_stats(&self) -> DashboardResult<SystemStats> {
        self.fetch(PUBLIC_STATS_PATH, None).await
    }
}
