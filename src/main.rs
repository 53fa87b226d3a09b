use std::sync::Arc;

use anyhow::Context;

use campus_transit::admin::{AccountAdmin, AdminRouteState};
use campus_transit::config::AppConfig;
use campus_transit::identity::{
    GoogleIdentityProvider, IdentityProvider, SessionTable, spawn_expiry_task,
};
use campus_transit::onboarding::{OnboardingManager, OnboardingRouteState, Partition};
use campus_transit::server::app_router;
use campus_transit::store::{AccountStore, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("🚌 Campus Transit v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn AccountStore> = Arc::new(
        LibSqlStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Identity ─────────────────────────────────────────────────────────
    let provider: Arc<dyn IdentityProvider> = Arc::new(GoogleIdentityProvider::new(
        config.google_client_id.clone(),
        config.tokeninfo_url.clone(),
    ));

    // ── Onboarding + Admin ───────────────────────────────────────────────
    let manager = Arc::new(OnboardingManager::new(
        Arc::clone(&store),
        provider,
        Partition::Provider,
    ));
    let sessions = SessionTable::with_ttl(chrono::Duration::minutes(config.session_ttl_minutes));
    // Sweep expired sessions (runs every 60s)
    let _expiry_handle = spawn_expiry_task(Arc::clone(&sessions));
    let onboarding_state = OnboardingRouteState { manager, sessions };
    let admin_state = AdminRouteState {
        admin: Arc::new(AccountAdmin::new(Arc::clone(&store))),
        token: config.admin_token.clone(),
    };

    let app = app_router(onboarding_state, admin_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");
    axum::serve(listener, app).await?;

    Ok(())
}
