use std::{collections::BTreeMap, env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest retention window accepted (100 years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;
/// Longest gap between cleanup passes (one year)
pub const MAX_CLEANUP_INTERVAL_HOURS: u64 = 8_760;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config path available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Deployment environment. Only non-production environments may relax TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
        }
    }
}

/// How the scheduler decides when an endpoint is due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Every active endpoint is probed on every global tick
    #[default]
    Global,
    /// Each endpoint runs on its own `check_interval_ms`
    PerEndpoint,
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMode::Global => write!(f, "global"),
            ScheduleMode::PerEndpoint => write!(f, "per_endpoint"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub retention: RetentionConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "apiwatch.db".into(), max_connections: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Global health-check tick, in milliseconds
    pub check_interval_ms: u64,
    /// Upper bound on probes in flight at once
    pub max_concurrent_probes: usize,
    pub schedule_mode: ScheduleMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { check_interval_ms: 30_000, max_concurrent_probes: 16, schedule_mode: ScheduleMode::Global }
    }
}

impl SchedulerConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub retention_days: i64,
    pub cleanup_interval_hours: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { retention_days: 7, cleanup_interval_hours: 24 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Headers sent with every probe
    pub default_headers: BTreeMap<String, String>,
    /// Most response body bytes read per probe before the connection is dropped
    pub max_response_body_bytes: usize,
    /// Skip TLS certificate verification. Refused in production.
    pub danger_accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("apiwatch/", env!("CARGO_PKG_VERSION")).into(),
            default_headers: BTreeMap::new(),
            max_response_body_bytes: 1024 * 1024,
            danger_accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($APIWATCH_CONFIG, $XDG_CONFIG_HOME/apiwatch/config.toml
/// or $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    if let Ok(explicit) = env::var("APIWATCH_CONFIG") {
        return Ok(normalize_toml_path(path::Path::new(&explicit)));
    }

    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("apiwatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Configuration State:")?;
        write_1(f, "Environment", &self.environment)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "Check Interval (ms)", &self.scheduler.check_interval_ms)?;
        write_1(f, "Max Concurrent Probes", &self.scheduler.max_concurrent_probes)?;
        write_1(f, "Schedule Mode", &self.scheduler.schedule_mode)?;
        write_title_1(f, "Retention")?;
        write_1(f, "Retention (days)", &self.retention.retention_days)?;
        write_1(f, "Cleanup Interval (hours)", &self.retention.cleanup_interval_hours)?;
        write_title_1(f, "HTTP")?;
        write_1(f, "User Agent", &self.http.user_agent)?;
        write_1(f, "Default Headers", &self.http.default_headers.len())?;
        write_1(f, "Max Response Body (bytes)", &self.http.max_response_body_bytes)?;
        write_1(f, "Accept Invalid Certs", &self.http.danger_accept_invalid_certs)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/apiwatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            toml::from_str(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.scheduler.check_interval_ms == 0 {
            return Err(Error::Invalid("scheduler.check_interval_ms must be positive".into()));
        }
        if self.scheduler.max_concurrent_probes == 0 {
            return Err(Error::Invalid("scheduler.max_concurrent_probes must be positive".into()));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention.retention_days) {
            return Err(Error::Invalid(format!(
                "retention.retention_days must be between 1 and {MAX_RETENTION_DAYS}"
            )));
        }
        if !(1..=MAX_CLEANUP_INTERVAL_HOURS).contains(&self.retention.cleanup_interval_hours) {
            return Err(Error::Invalid(format!(
                "retention.cleanup_interval_hours must be between 1 and {MAX_CLEANUP_INTERVAL_HOURS}"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Invalid("database.max_connections must be positive".into()));
        }
        if self.http.danger_accept_invalid_certs && self.environment == Environment::Production {
            return Err(Error::Invalid(
                "http.danger_accept_invalid_certs cannot be enabled when environment = \"production\""
                    .into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.scheduler.check_interval_ms, 30_000);
        assert_eq!(config.scheduler.schedule_mode, ScheduleMode::Global);
        assert_eq!(config.retention.retention_days, 7);
        assert_eq!(config.retention.cleanup_interval_hours, 24);
        assert_eq!(config.http.max_response_body_bytes, 1024 * 1024);
        assert!(!config.http.danger_accept_invalid_certs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            environment = "development"

            [scheduler]
            check_interval_ms = 5000
            schedule_mode = "per_endpoint"

            [http.default_headers]
            X-Probe = "apiwatch"
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.scheduler.check_interval_ms, 5000);
        assert_eq!(config.scheduler.max_concurrent_probes, 16);
        assert_eq!(config.scheduler.schedule_mode, ScheduleMode::PerEndpoint);
        assert_eq!(config.http.default_headers.get("X-Probe").map(String::as_str), Some("apiwatch"));
        assert_eq!(config.retention.retention_days, 7);
    }

    #[test]
    fn test_retention_bounds() {
        let mut config = Config::default();
        config.retention.retention_days = MAX_RETENTION_DAYS;
        assert!(config.validate().is_ok());

        config.retention.retention_days = 200_000_000;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        config.retention.retention_days = 0;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        config.retention.retention_days = 7;
        config.retention.cleanup_interval_hours = u64::MAX / 60;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_insecure_tls_refused_in_production() {
        let mut config = Config::default();
        config.http.danger_accept_invalid_certs = true;
        assert!(matches!(config.validate(), Err(Error::Invalid(_))));

        config.environment = Environment::Development;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_config_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/apiwatch");

        let config = Config::from_config(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(dir.path().join("nested/apiwatch.toml").exists());

        let reloaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reloaded.database.path, config.database.path);
    }
}
