//! School Attendance API Server
//!
//! Run with: cargo run --bin attendance-server
//!
//! # Configuration
//!
//! Read from `config.toml` (see `attendance-cli config`), then overridden by
//! environment variables:
//! - `ATTENDANCE_DATA_DIR`: Data directory (default: attendance_data)
//! - `ATTENDANCE_API_HOST` / `ATTENDANCE_API_PORT`: Listen address (default: 0.0.0.0:8090)
//! - `ATTENDANCE_PUBLIC_URL`: Public base URL used for photo links
//! - `ATTENDANCE_ADMIN_EMAIL` / `ATTENDANCE_ADMIN_PASSWORD`: Bootstrap admin account
//! - `ATTENDANCE_LOG_LEVEL` / `ATTENDANCE_LOG_FORMAT`: Logging (`pretty` or `json`)
//! - `RUST_LOG`: Overrides the log filter entirely

use school_attendance::api::{serve, AppState};
use school_attendance::config::{Config, LoggingConfig};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions and reset tokens are purged
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!(
        "Starting School Attendance API server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Data directory: {}", config.store.data_dir);

    let state = AppState::open(config.clone())?;
    tracing::info!("Store opened");

    if let Some(admin) = &config.auth.bootstrap_admin {
        match state.auth.ensure_bootstrap_admin(admin)? {
            Some(user) => tracing::info!(user_id = %user.uid, "Created bootstrap admin account"),
            None => tracing::debug!("Bootstrap admin already present"),
        }
    }

    if !config.auth.federated.enabled {
        tracing::info!("Federated sign-in disabled");
    }

    // Session and reset-token housekeeping
    let auth = std::sync::Arc::clone(&state.auth);
    let purge_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match auth.purge_expired() {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "Purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
        }
    });

    serve(state).await?;

    purge_handle.abort();
    tracing::info!("School Attendance API server stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "school_attendance={},tower_http=debug",
            logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
