//! Configuration management for the sliding quota harness.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ratelimit::{Algorithm, RateLimitConfig, UserId};

/// Prefix for environment overrides, e.g. `SLIDING_QUOTA__LIMITER__ALGORITHM=log`.
pub const ENV_PREFIX: &str = "SLIDING_QUOTA";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Users registered at startup
    #[serde(default)]
    pub users: Vec<UserQuota>,

    /// Simulated traffic configuration
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limiter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Which sliding window algorithm to use
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Quota for users without an explicit entry
    #[serde(default)]
    pub default_quota: RateLimitConfig,
}

/// A user and its quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuota {
    /// User identifier
    pub id: UserId,

    /// Quota override; fields left out fall back to the defaults
    #[serde(flatten)]
    pub quota: RateLimitConfig,
}

/// Simulated traffic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Calls issued per user
    #[serde(default = "default_calls")]
    pub calls_per_user: u64,

    /// Delay between consecutive calls of one user, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum random jitter added to each delay, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            calls_per_user: default_calls(),
            interval_ms: default_interval_ms(),
            jitter_ms: 0,
        }
    }
}

fn default_calls() -> u64 {
    150
}

fn default_interval_ms() -> u64 {
    100
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a file, layered with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Quota validation errors for every configured user, up front.
    pub fn validate(&self) -> Result<()> {
        let check = |quota: &RateLimitConfig| match self.limiter.algorithm {
            Algorithm::Counter => quota.validate(),
            Algorithm::Log => quota.validate_window(),
        };

        check(&self.limiter.default_quota)?;
        for user in &self.users {
            check(&user.quota)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuotaError;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.limiter.algorithm, Algorithm::Counter);
        assert_eq!(config.limiter.default_quota, RateLimitConfig::default());
        assert!(config.users.is_empty());
        assert_eq!(config.simulation.calls_per_user, 150);
        assert_eq!(config.simulation.interval_ms, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
limiter:
  algorithm: log
  default_quota:
    request_limit: 50
    window_secs: 30
users:
  - id: 1
    request_limit: 3
    window_secs: 10
  - id: 2
simulation:
  calls_per_user: 20
  interval_ms: 5
  jitter_ms: 2
logging:
  level: debug
  json: true
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.algorithm, Algorithm::Log);
        assert_eq!(config.limiter.default_quota, RateLimitConfig::new(50, 30));
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].id, 1);
        assert_eq!(config.users[0].quota, RateLimitConfig::new(3, 10));
        assert_eq!(config.users[1].quota, RateLimitConfig::default());
        assert_eq!(config.simulation.jitter_ms, 2);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_depends_on_algorithm() {
        let yaml = r#"
limiter:
  algorithm: counter
users:
  - id: 1
    request_limit: 3
    window_secs: 5
"#;
        let mut config = AppConfig::from_yaml(yaml).unwrap();
        assert!(matches!(config.validate(), Err(QuotaError::InvalidConfig(_))));

        config.limiter.algorithm = Algorithm::Log;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            AppConfig::from_yaml("limiter: [1, 2"),
            Err(QuotaError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("sliding-quota-{}.yaml", std::process::id()));
        std::fs::write(&path, "limiter:\n  algorithm: log\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.limiter.algorithm, Algorithm::Log);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            AppConfig::load("/nonexistent/sliding-quota.yaml"),
            Err(QuotaError::Config(_))
        ));
    }
}
