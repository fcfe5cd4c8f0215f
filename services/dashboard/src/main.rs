use std::env;
use std::sync::Arc;

use anyhow::Result;
use common::settings::SessionSettings;
use common::{FileStore, Settings};
use dashboard::{DashboardClient, PollingDataController};
use session::{AuthGateway, PersistedSessionStore, SessionController, SessionState};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Credentials used to sign in at startup when no valid session was restored
const USERNAME_VAR: &str = "DASHBOARD_USERNAME";
const PASSWORD_VAR: &str = "DASHBOARD_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.level)),
        )
        .init();

    info!("Starting dashboard (backend: {})", settings.api.base_url);

    let store = Arc::new(FileStore::new(&settings.storage.path));
    let gateway = AuthGateway::new(settings.api.clone())?;
    let session = Arc::new(SessionController::new(
        Arc::new(gateway),
        PersistedSessionStore::new(store),
    ));

    // The restored session is usable right away; the backend confirms it
    // in the background.
    session.restore().await;
    tokio::spawn({
        let session = session.clone();
        async move {
            session.revalidate().await;
            sign_in_from_env(&session).await;
        }
    });

    let keepalive = tokio::spawn(keep_alive(session.clone(), settings.session.clone()));
    let session_log = tokio::spawn({
        let mut updates = session.subscribe();
        async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                match snapshot.session.user {
                    Some(user) => info!("Session {:?} as {}", snapshot.state, user.username),
                    None => info!("Session {:?}", snapshot.state),
                }
            }
        }
    });

    let client = DashboardClient::new(settings.api.clone())?;
    let poller = PollingDataController::new(Arc::new(client), session.clone(), &settings.polling);
    let dashboard_log = tokio::spawn({
        let mut updates = poller.subscribe();
        async move {
            while updates.changed().await.is_ok() {
                let summary = updates.borrow_and_update().summary();
                info!(
                    "Dashboard {}: {}/{} apps active, {} models, {} users, up {}",
                    if summary.online { "online" } else { "offline" },
                    summary.active_apps,
                    summary.total_apps,
                    summary.model_count,
                    summary.total_users,
                    summary.uptime
                );
            }
        }
    });
    poller.start().await?;

    info!("Dashboard started successfully");

    // Keep the service running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down dashboard");

    if let Err(e) = poller.stop().await {
        error!("Failed to stop dashboard polling: {}", e);
    }
    keepalive.abort();
    session_log.abort();
    dashboard_log.abort();

    Ok(())
}

async fn sign_in_from_env(session: &SessionController) {
    let (Ok(username), Ok(password)) = (env::var(USERNAME_VAR), env::var(PASSWORD_VAR)) else {
        return;
    };
    if session.state() == SessionState::Authenticated {
        return;
    }

    match session.login(&username, &password).await {
        Ok(user) => info!("Signed in as {}", user.username),
        Err(e) => error!("Startup sign-in failed: {}", e),
    }
}

/// Refresh the token ahead of its expiry for as long as the process runs
async fn keep_alive(session: Arc<SessionController>, settings: SessionSettings) {
    let mut ticker = tokio::time::interval(settings.keepalive_interval());

    loop {
        ticker.tick().await;
        if !session.is_authenticated() {
            continue;
        }

        if let Err(e) = session
            .refresh_if_expiring(settings.refresh_threshold_minutes)
            .await
        {
            warn!("Session ended by failed token refresh: {}", e);
        }
    }
}
