//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
///
/// Every section is defaulted, so an empty environment yields a usable config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Approval workflow configuration.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Notification delivery configuration.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Approval workflow configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// How many load/decide/save rounds a decision gets before giving up
    /// on concurrent modifications.
    #[serde(default = "default_max_save_attempts")]
    pub max_save_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_save_attempts: default_max_save_attempts(),
        }
    }
}

fn default_max_save_attempts() -> u32 {
    3
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Maximum number of delivered event keys remembered for deduplication.
    #[serde(default = "default_dedupe_capacity")]
    pub dedupe_capacity: u64,
    /// How long a delivered event key is remembered, in seconds.
    #[serde(default = "default_dedupe_ttl")]
    pub dedupe_ttl_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dedupe_capacity: default_dedupe_capacity(),
            dedupe_ttl_secs: default_dedupe_ttl(),
        }
    }
}

impl NotificationConfig {
    /// Longest dedupe window honoured; larger settings are clamped to it.
    pub const MAX_DEDUPE_TTL_SECS: u64 = 10 * 365 * 86_400;

    /// Returns the dedupe window, clamped to [`Self::MAX_DEDUPE_TTL_SECS`].
    #[must_use]
    pub fn dedupe_ttl(&self) -> Duration {
        Duration::from_secs(self.dedupe_ttl_secs.min(Self::MAX_DEDUPE_TTL_SECS))
    }
}

fn default_dedupe_capacity() -> u64 {
    10_000
}

fn default_dedupe_ttl() -> u64 {
    86_400 // 1 day
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "claimflow=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("CLAIMFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
