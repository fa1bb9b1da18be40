//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level. JSON output is meant for
//! production log shipping, the default format for terminals.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!("rocketwatch_beacon={},reqwest=warn", config.log_level)
}

/// Install the global tracing subscriber. Later calls are ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
