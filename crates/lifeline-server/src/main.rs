mod api;
mod dispatcher;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(lifeline_core::load_app_config()?);
    init_tracing(&config.log_level)?;
    tracing::info!(env = %config.env, "starting lifeline server");

    let pool = lifeline_db::connect_pool(
        &config.database_url,
        lifeline_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    let applied = lifeline_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "schema migrations applied");
    }

    let dispatcher = dispatcher::build_dispatcher(&pool, &config)?;
    let _scheduler = scheduler::build_scheduler(pool.clone()).await?;

    let is_dev = matches!(config.env, lifeline_core::Environment::Development);
    let auth = AuthState::from_env(is_dev)?;
    let app = build_app(AppState { pool, dispatcher }, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "accepting connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// `RUST_LOG` wins when set; otherwise fall back to the configured level.
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level.to_string()))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Resolve when the process is asked to stop, so in-flight dispatches can
/// drain instead of being cut off mid-write.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("ctrl-c received, draining"),
            _ = sigterm.recv() => tracing::info!("SIGTERM received, draining"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received, draining");
    }
}
