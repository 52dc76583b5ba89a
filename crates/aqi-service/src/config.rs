//! Server configuration.
//!
//! Configuration is read once at startup from a TOML file, then overridden
//! by environment variables and finally by command-line flags. Every section
//! is optional and falls back to its defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the upstream provider's API key.
pub const ENV_UPSTREAM_API_KEY: &str = "OPENWEATHER_API_KEY";
/// Environment variable holding the shared secret clients must present.
pub const ENV_API_SECRET: &str = "API_SECRET_KEY";
/// Environment variable overriding the backfill window in days.
pub const ENV_HISTORICAL_DAYS: &str = "AQI_HISTORICAL_DAYS";
/// Environment variable overriding the bind address.
pub const ENV_BIND: &str = "AQI_BIND";
/// Environment variable overriding the database path.
pub const ENV_DATABASE: &str = "AQI_DATABASE";

/// Minimum backfill window in days.
pub const MIN_HISTORICAL_DAYS: u32 = 1;
/// Maximum backfill window in days.
pub const MAX_HISTORICAL_DAYS: u32 = 365;
/// Upper bound for `history.max_range_days`.
pub const MAX_RANGE_DAYS: u32 = 3650;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Upstream provider settings.
    pub upstream: UpstreamConfig,
    /// API authentication settings.
    pub security: SecurityConfig,
    /// Historical backfill settings.
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(key) = get(ENV_UPSTREAM_API_KEY) {
            self.upstream.api_key = key;
        }
        if let Some(secret) = get(ENV_API_SECRET) {
            self.security.api_key = Some(secret);
        }
        if let Some(days) = get(ENV_HISTORICAL_DAYS) {
            self.history.days = days.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_HISTORICAL_DAYS,
                message: format!("'{}' is not a whole number of days", days),
            })?;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(path) = get(ENV_DATABASE) {
            self.storage.path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Validate the configuration and return any errors.
    ///
    /// # Example
    ///
    /// ```
    /// use aqi_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.upstream.validate());
        errors.extend(self.security.validate());
        errors.extend(self.history.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Sample file used by the current-conditions fallback.
    pub samples_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: aqi_store::default_db_path(),
            samples_path: aqi_store::default_data_dir().join("synthetic_samples.json"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }
        if self.samples_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.samples_path",
                "sample file path cannot be empty",
            ));
        }

        errors
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Air pollution endpoint; `/forecast` and `/history` are appended.
    pub base_url: String,
    /// Provider API key, sent as `appid`.
    pub api_key: String,
    /// Timeout for data requests in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for the availability probe in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: aqi_core::upstream::DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout_secs: aqi_core::upstream::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            probe_timeout_secs: aqi_core::upstream::DEFAULT_PROBE_TIMEOUT.as_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Validate upstream configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(ValidationError::new(
                "upstream.base_url",
                format!(
                    "URL must start with http:// or https://, got: '{}'",
                    self.base_url
                ),
            ));
        }
        if self.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "upstream.request_timeout_secs",
                "timeout must be at least 1 second",
            ));
        }
        if self.probe_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "upstream.probe_timeout_secs",
                "timeout must be at least 1 second",
            ));
        }

        errors
    }
}

/// API authentication configuration.
///
/// Every endpoint requires the `X-API-Key` header to equal `api_key`. With
/// no key configured, every request is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret clients must present.
    pub api_key: Option<String>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(key) = &self.api_key
            && key.is_empty()
        {
            errors.push(ValidationError::new(
                "security.api_key",
                "API key cannot be empty string (omit it instead)",
            ));
        }

        errors
    }
}

/// Historical backfill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Length of the trailing window kept populated, in days.
    pub days: u32,
    /// Longest `start..end` span a history request may ask for, in days.
    pub max_range_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            days: 30,
            max_range_days: MAX_HISTORICAL_DAYS,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(MIN_HISTORICAL_DAYS..=MAX_HISTORICAL_DAYS).contains(&self.days) {
            errors.push(ValidationError::new(
                "history.days",
                format!(
                    "{} days is out of range ({}-{})",
                    self.days, MIN_HISTORICAL_DAYS, MAX_HISTORICAL_DAYS
                ),
            ));
        }

        if !(MIN_HISTORICAL_DAYS..=MAX_RANGE_DAYS).contains(&self.max_range_days) {
            errors.push(ValidationError::new(
                "history.max_range_days",
                format!(
                    "{} days is out of range ({}-{})",
                    self.max_range_days, MIN_HISTORICAL_DAYS, MAX_RANGE_DAYS
                ),
            ));
        }

        errors
    }

    /// Longest allowed history request span, in seconds.
    pub fn max_range_secs(&self) -> i64 {
        i64::from(self.max_range_days) * 24 * 3600
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aqi")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.history.days, 30);
        assert_eq!(config.upstream.request_timeout_secs, 10);
        assert_eq!(config.upstream.probe_timeout_secs, 5);
        assert_eq!(
            config.upstream.base_url,
            "http://api.openweathermap.org/data/2.5/air_pollution"
        );
        assert!(config.security.api_key.is_none());
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.path, aqi_store::default_db_path());
        assert!(config.samples_path.ends_with("aqi/synthetic_samples.json"));
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "127.0.0.1:8888"

            [storage]
            path = "/data/aqi.db"
            samples_path = "/data/samples.json"

            [upstream]
            base_url = "https://example.com/air_pollution"
            api_key = "provider-key"
            request_timeout_secs = 20

            [security]
            api_key = "shared-secret"

            [history]
            days = 7
            max_range_days = 90
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8888");
        assert_eq!(config.storage.path, PathBuf::from("/data/aqi.db"));
        assert_eq!(config.storage.samples_path, PathBuf::from("/data/samples.json"));
        assert_eq!(config.upstream.api_key, "provider-key");
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(20));
        // Unset fields keep their defaults
        assert_eq!(config.upstream.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.security.api_key.as_deref(), Some("shared-secret"));
        assert_eq!(config.history.days, 7);
        assert_eq!(config.history.max_range_days, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_toml() {
        let config: Config = toml::from_str("[history]\ndays = 14\n").unwrap();
        assert_eq!(config.history.days, 14);
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.security.api_key = Some("secret".to_string());
        config.history.days = 60;

        config.save(&config_path).unwrap();
        let loaded = Config::load_validated(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.security.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.history.days, 60);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("OPENWEATHER_API_KEY", "provider-key"),
                ("API_SECRET_KEY", "shared-secret"),
                ("AQI_HISTORICAL_DAYS", "10"),
                ("AQI_BIND", "127.0.0.1:6000"),
                ("AQI_DATABASE", "/tmp/aqi.db"),
            ]))
            .unwrap();

        assert_eq!(config.upstream.api_key, "provider-key");
        assert_eq!(config.security.api_key.as_deref(), Some("shared-secret"));
        assert_eq!(config.history.days, 10);
        assert_eq!(config.server.bind, "127.0.0.1:6000");
        assert_eq!(config.storage.path, PathBuf::from("/tmp/aqi.db"));
    }

    #[test]
    fn test_env_empty_values_ignored() {
        let mut config = Config::default();
        config.security.api_key = Some("from-file".to_string());
        config
            .apply_overrides(lookup(&[("API_SECRET_KEY", ""), ("AQI_BIND", "")]))
            .unwrap();

        assert_eq!(config.security.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_env_invalid_days() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("AQI_HISTORICAL_DAYS", "a month")]));
        assert!(matches!(
            result,
            Err(ConfigError::Env {
                var: "AQI_HISTORICAL_DAYS",
                ..
            })
        ));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("aqi/server.toml"));
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let bind = |s: &str| ServerConfig {
            bind: s.to_string(),
        };

        assert!(bind("127.0.0.1:8080").validate().is_empty());
        assert!(bind("[::1]:8080").validate().is_empty());
        assert!(bind("localhost:8080").validate().is_empty());

        let errors = bind("").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let errors = bind("127.0.0.1").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        let errors = bind("127.0.0.1:0").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be 0"));

        let errors = bind("127.0.0.1:abc").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            path: PathBuf::new(),
            samples_path: PathBuf::new(),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "storage.path");
        assert_eq!(errors[1].field, "storage.samples_path");
    }

    #[test]
    fn test_upstream_validation() {
        let config = UpstreamConfig {
            base_url: "ftp://example.com".to_string(),
            api_key: String::new(),
            request_timeout_secs: 0,
            probe_timeout_secs: 0,
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].message.contains("http://"));
    }

    #[test]
    fn test_history_days_validation() {
        let history = |days| HistoryConfig {
            days,
            ..HistoryConfig::default()
        };
        assert!(history(1).validate().is_empty());
        assert!(history(365).validate().is_empty());
        assert_eq!(history(0).validate().len(), 1);
        assert_eq!(history(366).validate().len(), 1);
    }

    #[test]
    fn test_history_max_range_validation() {
        let history = |max_range_days| HistoryConfig {
            max_range_days,
            ..HistoryConfig::default()
        };
        assert_eq!(HistoryConfig::default().max_range_days, 365);
        assert_eq!(HistoryConfig::default().max_range_secs(), 365 * 86_400);
        assert!(history(3650).validate().is_empty());

        let errors = history(0).validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "history.max_range_days");
        assert_eq!(history(3651).validate().len(), 1);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = SecurityConfig {
            api_key: Some(String::new()),
        };
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_config_validation_error_display() {
        let mut config = Config::default();
        config.server.bind = "127.0.0.1:0".to_string();
        config.history.days = 0;

        let display = config.validate().unwrap_err().to_string();
        assert!(display.contains("server.bind"));
        assert!(display.contains("history.days"));
    }
}
