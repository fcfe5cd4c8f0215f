//! Periodic dashboard refresh
//!
//! Each tick fetches health, the app list and statistics concurrently. A
//! failing source never fails the tick: it is logged and replaced by its
//! empty value. Statistics come from the authenticated endpoint while the
//! session holds a token, with the public endpoint as fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use common::settings::PollingSettings;
use session::SessionController;
use tokio::sync::{Mutex, watch};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{DashboardApi, DashboardResult};
use crate::models::{AppCard, DashboardSnapshot, HealthStatus, StatsSource, SystemStats};

pub struct PollingDataController {
    poller: Arc<Poller>,
    interval: Duration,
    schedule: Mutex<Option<Schedule>>,
}

struct Schedule {
    scheduler: JobScheduler,
    job_id: Uuid,
}

struct Poller {
    api: Arc<dyn DashboardApi>,
    session: Arc<SessionController>,
    snapshot: watch::Sender<DashboardSnapshot>,
    cancelled: AtomicBool,
}

impl PollingDataController {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        session: Arc<SessionController>,
        settings: &PollingSettings,
    ) -> Self {
        let (snapshot, _) = watch::channel(DashboardSnapshot::default());

        Self {
            poller: Arc::new(Poller {
                api,
                session,
                snapshot,
                cancelled: AtomicBool::new(false),
            }),
            interval: settings.interval(),
            schedule: Mutex::new(None),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.poller.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.poller.snapshot.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.schedule.lock().await.is_some()
    }

    /// Run one tick now, outside the schedule
    pub async fn refresh_now(&self) -> DashboardSnapshot {
        self.poller.tick().await
    }

    /// Refresh once, then keep refreshing every interval until stopped
    pub async fn start(&self) -> DashboardResult<()> {
        let mut schedule = self.schedule.lock().await;
        if schedule.is_some() {
            debug!("Dashboard polling already running");
            return Ok(());
        }

        self.poller.cancelled.store(false, Ordering::SeqCst);
        self.poller.tick().await;

        let scheduler = JobScheduler::new().await?;
        let poller = self.poller.clone();
        let job = Job::new_repeated_async(self.interval, move |_, _| {
            let poller = poller.clone();
            Box::pin(async move {
                if poller.cancelled.load(Ordering::SeqCst) {
                    return;
                }
                poller.tick().await;
            })
        })?;

        let job_id = scheduler.add(job).await?;
        scheduler.start().await?;
        *schedule = Some(Schedule { scheduler, job_id });

        info!("Started dashboard polling every {:?}", self.interval);
        Ok(())
    }

    /// Cancel the repeating job; a no-op when not running
    pub async fn stop(&self) -> DashboardResult<()> {
        let Some(Schedule {
            mut scheduler,
            job_id,
        }) = self.schedule.lock().await.take()
        else {
            return Ok(());
        };

        self.poller.cancelled.store(true, Ordering::SeqCst);
        scheduler.remove(&job_id).await?;
        scheduler.shutdown().await?;

        info!("Stopped dashboard polling");
        Ok(())
    }
}

impl Drop for PollingDataController {
    fn drop(&mut self) {
        self.poller.cancelled.store(true, Ordering::SeqCst);

        let Some(Schedule { mut scheduler, .. }) = self.schedule.get_mut().take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(e) = scheduler.shutdown().await {
                    warn!("Failed to shut down dashboard scheduler: {}", e);
                }
            });
        }
    }
}

impl Poller {
    async fn tick(&self) -> DashboardSnapshot {
        let token = self.session.token();
        let (health, apps, (stats, stats_source)) = tokio::join!(
            self.fetch_health(),
            self.fetch_apps(),
            self.fetch_stats(token.as_deref())
        );

        let snapshot = DashboardSnapshot {
            health,
            apps,
            stats,
            stats_source,
            last_updated: Some(Utc::now()),
        };
        debug!(
            "Dashboard refreshed: {} apps, stats from {:?}",
            snapshot.apps.len(),
            snapshot.stats_source
        );

        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    async fn fetch_health(&self) -> Option<HealthStatus> {
        match self.api.health().await {
            Ok(health) => Some(health),
            Err(e) => {
                warn!("Health check failed: {}", e);
                None
            }
        }
    }

    async fn fetch_apps(&self) -> Vec<AppCard> {
        self.api.apps().await.unwrap_or_else(|e| {
            warn!("Apps fetch failed: {}", e);
            Vec::new()
        })
    }

    async fn fetch_stats(&self, token: Option<&str>) -> (SystemStats, StatsSource) {
        if let Some(token) = token {
            match self.api.authenticated_stats(token).await {
                Ok(stats) => return (stats, StatsSource::Authenticated),
                Err(e) => warn!("Authenticated stats failed, falling back to public stats: {}", e),
            }
        }

        match self.api.public_stats().await {
            Ok(stats) => (stats, StatsSource::Public),
            Err(e) => {
                warn!("Public stats fetch failed: {}", e);
                (SystemStats::default(), StatsSource::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DashboardError, PUBLIC_STATS_PATH, STATS_PATH};
    use async_trait::async_trait;
    use common::storage::MemoryStore;
    use session::models::{AuthGrant, LoginCredentials, NewAccount, UserProfile};
    use session::{AuthApi, AuthError, AuthResult, PersistedSessionStore};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    struct SignInAnyone;

    #[async_trait]
    impl AuthApi for SignInAnyone {
        async fn login(&self, credentials: &LoginCredentials) -> AuthResult<AuthGrant> {
            Ok(AuthGrant {
                user: UserProfile {
                    id: 1,
                    name: credentials.username.clone(),
                    username: credentials.username.clone(),
                    email: format!("{}@example.com", credentials.username),
                    created_at: Utc::now(),
                    is_active: true,
                    email_verified: true,
                },
                token: "T1".to_string(),
            })
        }

        async fn register(&self, _account: &NewAccount) -> AuthResult<AuthGrant> {
            Err(AuthError::RegistrationRejected("closed".to_string()))
        }

        async fn current_user(&self, _token: &str) -> AuthResult<UserProfile> {
            Err(AuthError::Unauthorized("unused".to_string()))
        }

        async fn refresh(&self, _token: &str) -> AuthResult<String> {
            Err(AuthError::RefreshFailed("unused".to_string()))
        }

        async fn logout(&self, _token: &str) {}
    }

    #[derive(Default)]
    struct FakeDashboard {
        health_down: bool,
        apps_down: bool,
        auth_stats_down: bool,
        public_stats_down: bool,
        health_calls: AtomicUsize,
        public_calls: AtomicUsize,
        stats_tokens: StdMutex<Vec<String>>,
    }

    fn unavailable(endpoint: &'static str) -> DashboardError {
        DashboardError::Status {
            endpoint,
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn stats_with_users(total: u64) -> SystemStats {
        SystemStats {
            users: Some(crate::models::UserStats {
                total,
                active_sessions: 0,
            }),
            ..Default::default()
        }
    }

    #[async_trait]
    impl DashboardApi for FakeDashboard {
        async fn health(&self) -> DashboardResult<HealthStatus> {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            if self.health_down {
                return Err(unavailable("/system/health"));
            }
            Ok(HealthStatus {
                status: "healthy".to_string(),
                ..Default::default()
            })
        }

        async fn apps(&self) -> DashboardResult<Vec<AppCard>> {
            if self.apps_down {
                return Err(unavailable("/apps"));
            }
            Ok(vec![AppCard {
                name: "AI Chat".to_string(),
                status: "active".to_string(),
                ..Default::default()
            }])
        }

        async fn authenticated_stats(&self, token: &str) -> DashboardResult<SystemStats> {
            self.stats_tokens.lock().unwrap().push(token.to_string());
            if self.auth_stats_down {
                return Err(DashboardError::Status {
                    endpoint: STATS_PATH,
                    status: reqwest::StatusCode::UNAUTHORIZED,
                });
            }
            Ok(stats_with_users(2))
        }

        async fn public_stats(&self) -> DashboardResult<SystemStats> {
            self.public_calls.fetch_add(1, Ordering::SeqCst);
            if self.public_stats_down {
                return Err(unavailable(PUBLIC_STATS_PATH));
            }
            Ok(stats_with_users(1))
        }
    }

    fn signed_out_session() -> Arc<SessionController> {
        Arc::new(SessionController::new(
            Arc::new(SignInAnyone),
            PersistedSessionStore::new(Arc::new(MemoryStore::new())),
        ))
    }

    async fn signed_in_session() -> Arc<SessionController> {
        let session = signed_out_session();
        session.initialize().await;
        session.login("ada", "secret1").await.unwrap();
        session
    }

    fn controller(
        api: Arc<FakeDashboard>,
        session: Arc<SessionController>,
        interval_secs: u64,
    ) -> PollingDataController {
        PollingDataController::new(api, session, &PollingSettings { interval_secs })
    }

    #[tokio::test]
    async fn test_signed_out_uses_public_stats() {
        let api = Arc::new(FakeDashboard::default());
        let poller = controller(api.clone(), signed_out_session(), 30);

        let snapshot = poller.refresh_now().await;

        assert!(snapshot.is_online());
        assert_eq!(snapshot.apps.len(), 1);
        assert_eq!(snapshot.stats_source, StatsSource::Public);
        assert_eq!(snapshot.stats, stats_with_users(1));
        assert!(api.stats_tokens.lock().unwrap().is_empty());
        assert!(snapshot.last_updated.is_some());
        assert_eq!(poller.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_signed_in_uses_authenticated_stats() {
        let api = Arc::new(FakeDashboard::default());
        let poller = controller(api.clone(), signed_in_session().await, 30);

        let snapshot = poller.refresh_now().await;

        assert_eq!(snapshot.stats_source, StatsSource::Authenticated);
        assert_eq!(snapshot.stats, stats_with_users(2));
        assert_eq!(*api.stats_tokens.lock().unwrap(), vec!["T1".to_string()]);
        assert_eq!(api.public_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_authenticated_stats_fall_back_to_public() {
        let api = Arc::new(FakeDashboard {
            auth_stats_down: true,
            ..Default::default()
        });
        let poller = controller(api.clone(), signed_in_session().await, 30);

        let snapshot = poller.refresh_now().await;

        assert_eq!(snapshot.stats_source, StatsSource::Public);
        assert_eq!(snapshot.stats, stats_with_users(1));
        assert_eq!(api.public_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_source_down_yields_empty_snapshot() {
        let api = Arc::new(FakeDashboard {
            health_down: true,
            apps_down: true,
            auth_stats_down: true,
            public_stats_down: true,
            ..Default::default()
        });
        let poller = controller(api, signed_in_session().await, 30);

        let snapshot = poller.refresh_now().await;

        assert!(snapshot.health.is_none());
        assert!(snapshot.apps.is_empty());
        assert!(snapshot.stats.is_empty());
        assert_eq!(snapshot.stats_source, StatsSource::Unavailable);
        assert!(snapshot.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_subscribers_receive_ticks() {
        let poller = controller(Arc::new(FakeDashboard::default()), signed_out_session(), 30);
        let mut rx = poller.subscribe();

        poller.refresh_now().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().apps.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_ticks_immediately_then_repeats_until_stopped() {
        let api = Arc::new(FakeDashboard::default());
        let poller = controller(api.clone(), signed_out_session(), 1);

        poller.start().await.unwrap();
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 1);
        assert!(poller.is_running().await);

        // Starting again does not schedule a second job
        poller.start().await.unwrap();
        assert_eq!(api.health_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(2600)).await;
        assert!(api.health_calls.load(Ordering::SeqCst) >= 2);

        poller.stop().await.unwrap();
        assert!(!poller.is_running().await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let after_stop = api.health_calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dropping_the_controller_cancels_ticks() {
        let api = Arc::new(FakeDashboard::default());
        let poller = controller(api.clone(), signed_out_session(), 1);
        poller.start().await.unwrap();

        drop(poller);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let after_drop = api.health_calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(api.health_calls.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_no_op() {
        let poller = controller(Arc::new(FakeDashboard::default()), signed_out_session(), 30);
        poller.stop().await.unwrap();
        assert!(!poller.is_running().await);
    }
}
