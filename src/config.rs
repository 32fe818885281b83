//! Runtime settings read from `ENROLLWISE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const BIND_ADDR_ENV: &str = "ENROLLWISE_BIND_ADDR";
pub const MODEL_DIR_ENV: &str = "ENROLLWISE_MODEL_DIR";
pub const LOG_MODE_ENV: &str = "ENROLLWISE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "ENROLLWISE_LOG_FILE";
pub const BUNDLE_PUBKEY_ENV: &str = "ENROLLWISE_BUNDLE_PUBKEY_B64";
pub const REQUIRE_SIGNED_ENV: &str = "ENROLLWISE_REQUIRE_SIGNED_BUNDLE";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "logs/enrollwise.log";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} is not a socket address: {0:?}", BIND_ADDR_ENV)]
    InvalidBindAddr(String),

    #[error("{} must be one of stdout, file, auto (got {0:?})", LOG_MODE_ENV)]
    InvalidLogMode(String),

    #[error("{} is set but {} is missing", REQUIRE_SIGNED_ENV, BUNDLE_PUBKEY_ENV)]
    MissingPublicKey,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
    /// File when a log path is configured, stdout otherwise
    Auto,
}

impl std::str::FromStr for LogMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::Stdout),
            "file" => Ok(Self::File),
            "auto" => Ok(Self::Auto),
            other => Err(ConfigError::InvalidLogMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub mode: LogMode,
    pub file: PathBuf,
    file_explicit: bool,
}

impl LogConfig {
    /// Resolve `Auto` to a concrete decision.
    #[must_use]
    pub fn use_file(&self) -> bool {
        match self.mode {
            LogMode::File => true,
            LogMode::Stdout => false,
            LogMode::Auto => self.file_explicit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Base64 Ed25519 public key; bundles must be signed when present
    pub public_key_b64: Option<String>,
    pub require_signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub model_dir: PathBuf,
    pub log: LogConfig,
    pub integrity: IntegrityConfig,
}

fn parse_bool(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_raw = non_empty(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr(bind_raw.clone()))?;

        let model_dir = non_empty(MODEL_DIR_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR), PathBuf::from);

        let mode = match non_empty(LOG_MODE_ENV) {
            Some(raw) => raw.trim().parse()?,
            None => LogMode::Auto,
        };
        let log_file = non_empty(LOG_FILE_ENV);
        let log = LogConfig {
            mode,
            file_explicit: log_file.is_some(),
            file: log_file.map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
        };

        let public_key_b64 = non_empty(BUNDLE_PUBKEY_ENV).map(|v| v.trim().to_string());
        let require_signed = parse_bool(lookup(REQUIRE_SIGNED_ENV));
        if require_signed && public_key_b64.is_none() {
            return Err(ConfigError::MissingPublicKey);
        }

        Ok(Self {
            bind_addr,
            model_dir,
            log,
            integrity: IntegrityConfig {
                public_key_b64,
                require_signed,
            },
        })
    }
}
