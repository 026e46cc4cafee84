use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

use application::ports::LocalStore;
use infrastructure::ReachabilityProbe;
pub use shared::{AppConfig, AppError, ErrorKind, Result};
pub use state::AppState;

pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsafe=debug,offline=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// オフラインキャッシュを初期化し、Ctrl-C まで自動同期を回す
pub async fn run() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(api = %config.api.base_url, "FieldSafe offline sync starting...");

    let state = AppState::new(config.clone()).await?;
    state.store.initialize().await?;

    let probe = ReachabilityProbe::new(
        &config.api.base_url,
        &config.api.health_path,
        Duration::from_secs(config.api.timeout_secs),
    );
    state.network.set_online(probe.check().await);
    let probe_task = (config.sync.probe_interval_secs > 0).then(|| {
        probe.spawn(
            Arc::clone(&state.network),
            Duration::from_secs(config.sync.probe_interval_secs),
        )
    });

    let schedulers = if config.sync.auto_sync {
        state
            .sync
            .start_auto_sync(Duration::from_secs(config.sync.interval_secs))
    } else {
        Vec::new()
    };

    let status = state.sync.get_status().await;
    info!(pending = status.total_pending(), "offline cache ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    for handle in schedulers {
        handle.shutdown().await;
    }
    if let Some(task) = probe_task {
        task.abort();
    }
    state.store.pool().close().await;
    Ok(())
}
