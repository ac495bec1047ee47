pub mod config;
pub mod core_state;
pub mod db;
pub mod models;
pub mod next_visit; // Upcoming-visit derivation (pure)
pub mod patients;
pub mod screening; // Lesion classification client
pub mod store;
pub mod visit_sync; // Appointment write path + cache refresh

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
