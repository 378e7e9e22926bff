pub mod api;
pub mod authorization;
pub mod billing;
pub mod config;
pub mod consultation;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod dispensary;
pub mod front_desk;
pub mod laboratory;
pub mod models;
pub mod staff;
pub mod validation;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Core(#[from] core_state::CoreError),
    #[error("Bootstrap admin: {0}")]
    Bootstrap(#[from] staff::StaffError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
    #[error("Signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Start the hospital API and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = config::ServerConfig::from_env()?;
    let core = Arc::new(core_state::CoreState::new(settings.db_path.clone()));
    core.initialize()?;

    if let Some(admin) = &settings.bootstrap_admin {
        let conn = core.open_db().map_err(staff::StaffError::from)?;
        staff::ensure_superuser(&conn, &admin.username, &admin.password)?;
    }

    let ctx = api::ApiContext::from_config(core, &settings);
    let server = api::start_server_on(ctx, settings.bind_addr).await?;
    tracing::info!(addr = %server.addr(), "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    server.stop().await;
    Ok(())
}
