//! Structured logging setup.
//!
//! Library code only emits `tracing` events; the hosting process calls
//! [`init_logging`] once at startup to install a subscriber.

use crate::config::LogConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors from logging initialisation.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("subscriber init failed: {0}")]
    SubscriberInit(String),
}

/// Build the level filter: `RUST_LOG` first, then the configured level.
///
/// # Errors
///
/// `InvalidFilter` if the configured directive does not parse.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))
}

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// `SubscriberInit` if called twice in one process.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    }

    tracing::info!(
        level = %config.log_level,
        json = config.json_logs,
        "[qc-18] Logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_reported() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LogConfig {
            log_level: "qc_18_p2p_lending=verbose".to_string(),
            json_logs: false,
        };
        assert!(matches!(
            build_filter(&config),
            Err(TelemetryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        // The first call may lose to another test's subscriber; the second never succeeds.
        let _ = init_logging(&config);
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::SubscriberInit(_))
        ));
    }
}
