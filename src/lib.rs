pub mod analytics;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod session;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// built-in filter. Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::info!("{} analytics core v{}", config::APP_NAME, config::APP_VERSION);
    }
}
