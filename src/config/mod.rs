use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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

/// Top-level configuration, loaded once in `main` and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub records: RecordsConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            records: RecordsConfig::from_env()?,
        })
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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Tech record workflow tuning and identifier allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsConfig {
    /// Read-modify-write attempts before a stale revision is reported as a conflict.
    pub write_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
    pub trailer_id_prefix: char,
    pub system_number_start: u64,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            write_attempts: 3,
            retry_backoff_ms: 25,
            trailer_id_prefix: 'C',
            system_number_start: 10_000_000,
        }
    }
}

impl RecordsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let write_attempts = match env::var("APP_RECORDS_WRITE_ATTEMPTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts >= 1)
                .ok_or(ConfigError::InvalidWriteAttempts(raw))?,
            Err(_) => defaults.write_attempts,
        };

        let retry_backoff_ms = match env::var("APP_RECORDS_RETRY_BACKOFF_MS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidRetryBackoff(raw))?,
            Err(_) => defaults.retry_backoff_ms,
        };

        let trailer_id_prefix = match env::var("APP_TRAILER_ID_PREFIX") {
            Ok(raw) => {
                let mut chars = raw.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(prefix), None) if prefix.is_ascii_alphabetic() => {
                        prefix.to_ascii_uppercase()
                    }
                    _ => return Err(ConfigError::InvalidTrailerIdPrefix(raw)),
                }
            }
            Err(_) => defaults.trailer_id_prefix,
        };

        let system_number_start = match env::var("APP_SYSTEM_NUMBER_START") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSystemNumberStart(raw))?,
            Err(_) => defaults.system_number_start,
        };

        Ok(Self {
            write_attempts,
            retry_backoff_ms,
            trailer_id_prefix,
            system_number_start,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWriteAttempts(String),
    InvalidRetryBackoff(String),
    InvalidTrailerIdPrefix(String),
    InvalidSystemNumberStart(String),
    InvalidDocumentsDir(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWriteAttempts(value) => write!(
                f,
                "APP_RECORDS_WRITE_ATTEMPTS must be a positive integer, got '{value}'"
            ),
            ConfigError::InvalidRetryBackoff(value) => write!(
                f,
                "APP_RECORDS_RETRY_BACKOFF_MS must be a whole number of milliseconds, got '{value}'"
            ),
            ConfigError::InvalidTrailerIdPrefix(value) => write!(
                f,
                "APP_TRAILER_ID_PREFIX must be a single ASCII letter, got '{value}'"
            ),
            ConfigError::InvalidSystemNumberStart(value) => write!(
                f,
                "APP_SYSTEM_NUMBER_START must be a non-negative integer, got '{value}'"
            ),
            ConfigError::InvalidDocumentsDir(reason) => {
                write!(f, "--documents-dir must name a readable directory: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
