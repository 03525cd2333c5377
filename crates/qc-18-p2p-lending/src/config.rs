//! Ledger configuration from environment variables.

use crate::domain::value_objects::Address;
use crate::errors::ConfigError;
use std::env;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error), or any `EnvFilter` directive.
    pub log_level: String,

    /// Whether to enable JSON formatted logs.
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration for the lending ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingConfig {
    /// Account allowed to liquidate overdue loans.
    pub operator: Address,

    /// Service name for logs.
    pub service_name: String,

    /// Logging settings.
    pub log: LogConfig,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            operator: Address::ZERO,
            service_name: "qc-18-p2p-lending".to_string(),
            log: LogConfig::default(),
        }
    }
}

impl LendingConfig {
    /// Configuration for a given operator, other fields defaulted.
    #[must_use]
    pub fn with_operator(operator: Address) -> Self {
        Self {
            operator,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_LENDING_OPERATOR`: operator address, hex with optional `0x` (required)
    /// - `QC_LENDING_SERVICE_NAME`: service name (default: qc-18-p2p-lending)
    /// - `QC_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    /// - `QC_JSON_LOGS`: enable JSON logs (default: false)
    ///
    /// # Errors
    ///
    /// `InvalidOperator` for malformed hex, `ZeroOperator` if unset or zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`LendingConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let operator = match lookup("QC_LENDING_OPERATOR") {
            Some(raw) => {
                Address::from_hex(&raw).ok_or_else(|| ConfigError::InvalidOperator(raw.clone()))?
            }
            None => Address::ZERO,
        };

        let config = Self {
            operator,
            service_name: lookup("QC_LENDING_SERVICE_NAME").unwrap_or(defaults.service_name),
            log: LogConfig {
                log_level: lookup("QC_LOG_LEVEL")
                    .or_else(|| lookup("RUST_LOG"))
                    .unwrap_or(defaults.log.log_level),
                json_logs: lookup("QC_JSON_LOGS")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(defaults.log.json_logs),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the ledger cannot run with.
    ///
    /// # Errors
    ///
    /// `ZeroOperator` if the operator is the zero address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operator.is_zero() {
            return Err(ConfigError::ZeroOperator);
        }
        Ok(())
    }
}
