//! Configuration management for backchat
//!
//! Environment-based configuration with file loading, defaults, and
//! validation. Sections cover the sync engines, user search, and the
//! logging subsystem.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Sync engine configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// User search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conversation/relationship sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet window after which a typing indicator decays
    #[serde(with = "humantime_serde")]
    pub typing_debounce: Duration,

    /// Drop pushed messages whose id is already in the local sequence.
    /// The load/subscribe overlap window can deliver a message twice;
    /// with this off the sequence mirrors the raw push stream.
    pub dedupe_messages: bool,
}

/// User search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Queries shorter than this return no results
    pub min_query_len: usize,

    /// Result cap for a single search
    pub max_results: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,

    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            typing_debounce: Duration::from_secs(3),
            dedupe_messages: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 3,
            max_results: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: BACKCHAT_<SECTION>_<KEY>
    /// Example: BACKCHAT_SYNC_TYPING_DEBOUNCE_MS=3000
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(debounce) = env::var("BACKCHAT_SYNC_TYPING_DEBOUNCE_MS") {
            let millis: u64 = debounce.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid typing debounce: {}", e))
            })?;
            config.sync.typing_debounce = Duration::from_millis(millis);
        }
        if let Ok(dedupe) = env::var("BACKCHAT_SYNC_DEDUPE_MESSAGES") {
            config.sync.dedupe_messages = dedupe
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid dedupe flag: {}", e)))?;
        }

        if let Ok(min_len) = env::var("BACKCHAT_SEARCH_MIN_QUERY_LEN") {
            config.search.min_query_len = min_len.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid min query length: {}", e))
            })?;
        }
        if let Ok(max_results) = env::var("BACKCHAT_SEARCH_MAX_RESULTS") {
            config.search.max_results = max_results
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid max results: {}", e)))?;
        }

        if let Ok(level) = env::var("BACKCHAT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("BACKCHAT_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.typing_debounce.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "typing debounce must be positive".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationFailed(
                "search max_results must be positive".to_string(),
            ));
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "unknown log level: {}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.typing_debounce, Duration::from_secs(3));
        assert!(config.sync.dedupe_messages);
        assert_eq!(config.search.min_query_len, 3);
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let mut config = Config::default();
        config.sync.typing_debounce = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[sync]
typing_debounce = "5s"
dedupe_messages = false

[search]
min_query_len = 2
max_results = 25

[logging]
level = "debug"
json_format = true
with_timestamp = true
with_target = false
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sync.typing_debounce, Duration::from_secs(5));
        assert!(!config.sync.dedupe_messages);
        assert_eq!(config.search.max_results, 25);
        assert_eq!(config.logging.level, "debug");
    }

    // Serializes tests that touch the BACKCHAT_* process environment
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn clear_env() {
        for var in [
            "BACKCHAT_SYNC_TYPING_DEBOUNCE_MS",
            "BACKCHAT_SYNC_DEDUPE_MESSAGES",
            "BACKCHAT_SEARCH_MIN_QUERY_LEN",
            "BACKCHAT_SEARCH_MAX_RESULTS",
            "BACKCHAT_LOG_LEVEL",
            "BACKCHAT_LOG_JSON",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("BACKCHAT_SYNC_TYPING_DEBOUNCE_MS", "1500");
        env::set_var("BACKCHAT_SYNC_DEDUPE_MESSAGES", "false");
        env::set_var("BACKCHAT_SEARCH_MAX_RESULTS", "5");
        env::set_var("BACKCHAT_LOG_LEVEL", "debug");

        let config = Config::from_env().unwrap();
        assert_eq!(config.sync.typing_debounce, Duration::from_millis(1_500));
        assert!(!config.sync.dedupe_messages);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults
        assert_eq!(config.search.min_query_len, 3);

        clear_env();
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("BACKCHAT_SYNC_TYPING_DEBOUNCE_MS", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(_))
        ));
        env::remove_var("BACKCHAT_SYNC_TYPING_DEBOUNCE_MS");

        env::set_var("BACKCHAT_SYNC_DEDUPE_MESSAGES", "maybe");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(_))
        ));

        clear_env();
    }

    #[test]
    fn test_from_env_validates_the_result() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        // Parses fine but fails validation
        env::set_var("BACKCHAT_SYNC_TYPING_DEBOUNCE_MS", "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::ValidationFailed(_))
        ));

        clear_env();
    }

    #[test]
    fn test_from_file_missing_path() {
        assert!(matches!(
            Config::from_file("/nonexistent/backchat.toml"),
            Err(ConfigError::FileReadError(_))
        ));
    }
}
