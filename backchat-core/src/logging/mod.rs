//! Logging subsystem for backchat
//!
//! Thin wrapper over the `tracing` stack: env-filter driven levels and
//! an optional JSON output format, configured from
//! [`crate::config::LoggingConfig`].

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Initialize logging with defaults (info level, plain text)
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging from a [`LoggingConfig`] section
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = LogLevel::parse(&config.level).ok_or_else(|| {
        LoggingError::InvalidConfiguration(format!("unknown log level: {}", config.level))
    })?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let fmt_layer = fmt::layer().with_target(config.with_target);

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::InitializationFailed(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "shout".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            init_logging_with_config(&config),
            Err(LoggingError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_double_init_reports_failure() {
        // A second initialization must fail cleanly rather than panic
        let _ = init_logging();
        assert!(matches!(
            init_logging(),
            Err(LoggingError::InitializationFailed(_))
        ));
    }
}
