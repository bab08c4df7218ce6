//! Tracing subscriber setup.

use focustown_sync::SyncConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
///
/// An empty configured level falls back to `info`.
#[must_use]
pub fn default_filter(config: &SyncConfig) -> String {
    let level = config.log_level.trim();
    if level.is_empty() {
        "info".to_string()
    } else {
        level.to_string()
    }
}

/// Installs a console subscriber filtered by `RUST_LOG`, or by the
/// configured level when the variable is unset.
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_logging(config: &SyncConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let console = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_names(false)
        .with_timer(fmt::time::uptime());

    if tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
