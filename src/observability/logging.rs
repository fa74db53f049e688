//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when neither `RUST_LOG` nor config set one.
pub const DEFAULT_FILTER: &str = "dynamic_config=debug,tower_http=debug";

/// Build the filter: `RUST_LOG`, then the configured level, then the default.
pub fn build_filter(configured_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| match configured_level {
            Some(level) if !level.is_empty() => {
                EnvFilter::try_new(format!("dynamic_config={level},tower_http={level}"))
            }
            _ => EnvFilter::try_new(DEFAULT_FILTER),
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call once per process.
pub fn init(configured_level: Option<&str>) {
    let result = tracing_subscriber::registry()
        .with(build_filter(configured_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
