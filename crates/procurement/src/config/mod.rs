use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::carnival::CapacityPolicy;
use crate::workflows::documents::RetryPolicy;
use crate::workflows::tender::EvaluationPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub bidding: BiddingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let qualification_threshold: u8 = parse_var("BID_QUALIFICATION_THRESHOLD", 50)?;
        if qualification_threshold > 100 {
            return Err(ConfigError::OutOfRange {
                key: "BID_QUALIFICATION_THRESHOLD",
                value: qualification_threshold.to_string(),
            });
        }

        let carnival_capacity = match env::var("CARNIVAL_CAPACITY_POLICY") {
            Ok(raw) => {
                raw.parse::<CapacityPolicy>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "CARNIVAL_CAPACITY_POLICY",
                        value: raw.clone(),
                    })?
            }
            Err(_) => CapacityPolicy::Advisory,
        };

        let max_attempts: u32 = parse_var("STORAGE_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "STORAGE_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
            });
        }
        let retry_backoff_ms: u64 = parse_var("STORAGE_RETRY_BACKOFF_MS", 200)?;

        let root = env::var("DOCUMENT_STORAGE_ROOT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let base_url = env::var("DOCUMENT_BASE_URL").unwrap_or_else(|_| "/documents".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            bidding: BiddingConfig {
                qualification_threshold,
                carnival_capacity,
            },
            storage: StorageConfig {
                root,
                base_url,
                max_attempts,
                retry_backoff_ms,
            },
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Policy dials for the bidding engines.
#[derive(Debug, Clone)]
pub struct BiddingConfig {
    pub qualification_threshold: u8,
    pub carnival_capacity: CapacityPolicy,
}

impl BiddingConfig {
    pub fn evaluation_policy(&self) -> EvaluationPolicy {
        EvaluationPolicy::new(self.qualification_threshold)
    }
}

/// Where bid documents live and how hard we try to reach the store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: Option<PathBuf>,
    pub base_url: String,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl StorageConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    OutOfRange { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16 port number"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST must be an IP address or localhost: {source}")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unparseable value '{value}'")
            }
            ConfigError::OutOfRange { key, value } => {
                write!(f, "{key} value '{value}' is out of range")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::OutOfRange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "BID_QUALIFICATION_THRESHOLD",
            "CARNIVAL_CAPACITY_POLICY",
            "STORAGE_MAX_ATTEMPTS",
            "STORAGE_RETRY_BACKOFF_MS",
            "DOCUMENT_STORAGE_ROOT",
            "DOCUMENT_BASE_URL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.bidding.qualification_threshold, 50);
        assert_eq!(config.bidding.carnival_capacity, CapacityPolicy::Advisory);
        assert_eq!(config.storage.max_attempts, 3);
        assert!(config.storage.root.is_none());
        assert_eq!(config.storage.base_url, "/documents");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_threshold_above_one_hundred() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BID_QUALIFICATION_THRESHOLD", "120");
        match AppConfig::load() {
            Err(ConfigError::OutOfRange { key, .. }) => {
                assert_eq!(key, "BID_QUALIFICATION_THRESHOLD")
            }
            other => panic!("expected out of range error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_zero_storage_attempts() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STORAGE_MAX_ATTEMPTS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::OutOfRange {
                key: "STORAGE_MAX_ATTEMPTS",
                ..
            })
        ));
        reset_env();
    }

    #[test]
    fn parses_enforced_capacity_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CARNIVAL_CAPACITY_POLICY", "Enforced");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.bidding.carnival_capacity, CapacityPolicy::Enforced);

        env::set_var("CARNIVAL_CAPACITY_POLICY", "strict");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue {
                key: "CARNIVAL_CAPACITY_POLICY",
                ..
            })
        ));
        reset_env();
    }
}
