//! Configuration System
//!
//! Loads configuration from a TOML file with `LENDBRIDGE_*` environment
//! variable overrides, and converts it into the runtime configs of each
//! component.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ApiConfig;
use crate::documents::DocumentsConfig;
use crate::store::StoreConfig;
use crate::wizard::WizardConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub wizard: WizardConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("lendbridge").to_string_lossy().to_string())
        .unwrap_or_else(|| "./lendbridge_data".to_string())
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_body_bytes() -> usize {
    12 * 1024 * 1024
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Accounts and tokens
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Admin account created on startup when no admin exists
    pub admin_email: Option<String>,

    pub admin_password: Option<String>,
}

fn default_session_ttl() -> u64 {
    12 * 3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Marketplace rules
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    /// Smallest investment, except for the slice that completes a loan
    #[serde(default = "default_min_investment")]
    pub min_investment: f64,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

fn default_min_investment() -> f64 {
    100.0
}

fn default_max_page_size() -> usize {
    200
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            min_investment: default_min_investment(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            std::env::var("LENDBRIDGE_CONFIG").ok().map(PathBuf::from),
            dirs::config_dir().map(|p| p.join("lendbridge").join("config.toml")),
            Some(PathBuf::from("/etc/lendbridge/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `LENDBRIDGE_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_into<T: std::str::FromStr>(value: Option<String>, target: &mut T) {
            if let Some(parsed) = value.and_then(|v| v.trim().parse().ok()) {
                *target = parsed;
            }
        }

        // Database
        if let Some(data_dir) = lookup("LENDBRIDGE_DATA_DIR") {
            self.database.data_dir = data_dir;
        }

        // API
        if let Some(host) = lookup("LENDBRIDGE_API_HOST") {
            self.api.host = host;
        }
        parse_into(lookup("LENDBRIDGE_API_PORT"), &mut self.api.port);

        // Auth
        parse_into(lookup("LENDBRIDGE_SESSION_TTL_SECS"), &mut self.auth.session_ttl_secs);
        if let Some(email) = lookup("LENDBRIDGE_ADMIN_EMAIL") {
            self.auth.admin_email = Some(email);
        }
        if let Some(password) = lookup("LENDBRIDGE_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }

        // Marketplace
        parse_into(
            lookup("LENDBRIDGE_MIN_INVESTMENT"),
            &mut self.marketplace.min_investment,
        );

        // Documents
        if let Some(dir) = lookup("LENDBRIDGE_DOCUMENTS_DIR") {
            self.documents.dir = Some(PathBuf::from(dir));
        }
        parse_into(
            lookup("LENDBRIDGE_MAX_UPLOAD_BYTES"),
            &mut self.documents.max_upload_bytes,
        );

        // Logging
        if let Some(level) = lookup("LENDBRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LENDBRIDGE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.data_dir().join("lendbridge.db"),
            busy_timeout_ms: self.database.busy_timeout_ms,
        }
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents.resolve_dir(&self.data_dir())
    }

    /// Runtime API settings
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.api.host.clone(),
            port: self.api.port,
            cors_origins: self.api.cors_origins.clone(),
            max_body_size: self.api.max_body_bytes,
            session_ttl_secs: self.auth.session_ttl_secs,
            min_investment: self.marketplace.min_investment,
            max_page_size: self.marketplace.max_page_size,
            max_upload_bytes: self.documents.max_upload_bytes,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# LendBridge Configuration
#
# Environment variables override these settings:
# - LENDBRIDGE_DATA_DIR
# - LENDBRIDGE_API_HOST, LENDBRIDGE_API_PORT
# - LENDBRIDGE_SESSION_TTL_SECS
# - LENDBRIDGE_ADMIN_EMAIL, LENDBRIDGE_ADMIN_PASSWORD
# - LENDBRIDGE_MIN_INVESTMENT
# - LENDBRIDGE_DOCUMENTS_DIR, LENDBRIDGE_MAX_UPLOAD_BYTES
# - LENDBRIDGE_LOG_LEVEL, LENDBRIDGE_LOG_FORMAT

[database]
# Directory holding lendbridge.db
data_dir = "~/.local/share/lendbridge"

# How long a writer waits on a locked database (ms)
busy_timeout_ms = 5000

[api]
host = "0.0.0.0"
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = []

# Maximum request body (bytes)
max_body_bytes = 12582912

[auth]
# Bearer token lifetime (seconds)
session_ttl_secs = 43200

# Admin account created on first start
# admin_email = "admin@example.com"
# admin_password = "change-me-now"

[marketplace]
# Smallest investment accepted (the final slice of a loan may be smaller)
min_investment = 100.0

# Largest page returned by listing endpoints
max_page_size = 200

[wizard]
# Idle applications in progress expire after this many seconds
idle_ttl_secs = 86400

# Open applications in progress per borrower
max_sessions_per_user = 5

# How often expired sessions are swept (seconds)
purge_interval_secs = 300

[documents]
# Defaults to <data_dir>/documents
# dir = "/var/lib/lendbridge/documents"

# Maximum upload size (bytes)
max_upload_bytes = 10485760

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
