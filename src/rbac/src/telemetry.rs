//! Tracing subscriber setup for services embedding the engine

use crate::config::LoggingConfig;
use crate::error::{RbacError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.level.clone().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(config.with_target)
                .with_line_number(config.with_line_number),
        )
        .try_init()
        .map_err(|e| RbacError::Config(format!("Failed to install tracing subscriber: {}", e)))
}
