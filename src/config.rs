//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("school-attendance").to_string_lossy().to_string())
        .unwrap_or_else(|| "./attendance_data".to_string())
}

fn default_feed_capacity() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_max_ws_connections")]
    pub max_ws_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_upload() -> usize {
    5 * 1024 * 1024 // 5 MB
}

fn default_max_ws_connections() -> usize {
    500
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:8091".to_string(),
                "http://127.0.0.1:8091".to_string(),
            ],
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload(),
            max_ws_connections: default_max_ws_connections(),
        }
    }
}

impl ApiConfig {
    /// Socket address string for the listener
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_min_password")]
    pub min_password_length: usize,

    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_minutes: i64,

    /// Optional URL receiving password reset tokens as JSON
    pub reset_webhook_url: Option<String>,

    /// Account created at start-up when no user has this email
    pub bootstrap_admin: Option<BootstrapAdmin>,

    #[serde(default)]
    pub federated: FederatedConfig,
}

fn default_session_ttl() -> i64 {
    12
}

fn default_min_password() -> usize {
    6
}

fn default_reset_ttl() -> i64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl(),
            min_password_length: default_min_password(),
            reset_token_ttl_minutes: default_reset_ttl(),
            reset_webhook_url: None,
            bootstrap_admin: None,
            federated: FederatedConfig::default(),
        }
    }
}

/// Initial administrator account
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Federated sign-in through a trusted reverse proxy.
///
/// The proxy authenticates the user with the identity provider and forwards
/// the verified identity in request headers.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_email_header")]
    pub email_header: String,

    #[serde(default = "default_name_header")]
    pub name_header: String,

    #[serde(default = "default_photo_header")]
    pub photo_header: String,

    /// Header the proxy uses to present `proxy_secret`
    #[serde(default = "default_proxy_secret_header")]
    pub proxy_secret_header: String,

    /// Shared with the proxy. Without it every federated request is refused.
    #[serde(default)]
    pub proxy_secret: Option<String>,
}

fn default_email_header() -> String {
    "x-forwarded-email".to_string()
}

fn default_name_header() -> String {
    "x-forwarded-user".to_string()
}

fn default_photo_header() -> String {
    "x-forwarded-picture".to_string()
}

fn default_proxy_secret_header() -> String {
    "x-proxy-secret".to_string()
}

impl Default for FederatedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            email_header: default_email_header(),
            name_header: default_name_header(),
            photo_header: default_photo_header(),
            proxy_secret_header: default_proxy_secret_header(),
            proxy_secret: None,
        }
    }
}

/// Uploaded file storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory for uploaded files. Defaults to `{data_dir}/files`.
    pub dir: Option<String>,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_public_base_url() -> String {
    "http://localhost:8090/files".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            public_base_url: default_public_base_url(),
        }
    }
}

impl FilesConfig {
    pub fn resolve_dir(&self, data_dir: &str) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(dir),
            None => Path::new(data_dir).join("files"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

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

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
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
            dirs::config_dir().map(|p| p.join("school-attendance").join("config.toml")),
            Some(PathBuf::from("/etc/school-attendance/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("ATTENDANCE_DATA_DIR") {
            self.store.data_dir = data_dir;
        }

        if let Some(host) = var("ATTENDANCE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("ATTENDANCE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Some(url) = var("ATTENDANCE_PUBLIC_URL") {
            self.files.public_base_url = format!("{}/files", url.trim_end_matches('/'));
        }

        if let (Some(email), Some(password)) = (
            var("ATTENDANCE_ADMIN_EMAIL"),
            var("ATTENDANCE_ADMIN_PASSWORD"),
        ) {
            self.auth.bootstrap_admin = Some(BootstrapAdmin {
                email,
                password,
                display_name: None,
            });
        }

        if let Some(secret) = var("ATTENDANCE_PROXY_SECRET") {
            self.auth.federated.proxy_secret = Some(secret);
        }

        if let Some(level) = var("ATTENDANCE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("ATTENDANCE_LOG_FORMAT") {
            self.logging.format = format;
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
    r#"# School Attendance Configuration
#
# Environment variables override these settings:
# - ATTENDANCE_DATA_DIR
# - ATTENDANCE_API_HOST
# - ATTENDANCE_API_PORT
# - ATTENDANCE_PUBLIC_URL
# - ATTENDANCE_ADMIN_EMAIL / ATTENDANCE_ADMIN_PASSWORD
# - ATTENDANCE_PROXY_SECRET
# - ATTENDANCE_LOG_LEVEL
# - ATTENDANCE_LOG_FORMAT

[store]
# Directory for the database file
data_dir = "~/.local/share/school-attendance"

# Buffered change notifications per listener
feed_capacity = 256

[api]
host = "0.0.0.0"
port = 8090

# Allowed CORS origins (the dashboard)
cors_origins = ["http://localhost:8091", "http://127.0.0.1:8091"]

request_timeout_secs = 30

# Largest accepted photo upload (bytes)
max_upload_bytes = 5242880

# Concurrent live-update connections
max_ws_connections = 500

[auth]
session_ttl_hours = 12
min_password_length = 6
reset_token_ttl_minutes = 30

# Deliver reset tokens to this URL instead of the log
# reset_webhook_url = "https://mailer.internal/password-reset"

# [auth.bootstrap_admin]
# email = "admin@school.edu"
# password = "change-me"

[auth.federated]
# Accept identities forwarded by a trusted authenticating proxy
enabled = false
email_header = "x-forwarded-email"
name_header = "x-forwarded-user"
photo_header = "x-forwarded-picture"
# The proxy must send this secret; requests without it get 401
proxy_secret_header = "x-proxy-secret"
# proxy_secret = "long-random-string"

[files]
# Defaults to {data_dir}/files
# dir = "/var/lib/school-attendance/files"
public_base_url = "http://localhost:8090/files"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.auth.min_password_length, 6);
        assert!(!config.auth.federated.enabled);
        assert!(config.auth.federated.proxy_secret.is_none());
        assert_eq!(config.auth.federated.proxy_secret_header, "x-proxy-secret");
        assert!(config.auth.bootstrap_admin.is_none());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse("[api]\nport = 9000\n").unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.auth.session_ttl_hours, 12);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ATTENDANCE_API_PORT", "7000"),
            ("ATTENDANCE_PUBLIC_URL", "https://attendance.example/"),
            ("ATTENDANCE_ADMIN_EMAIL", "root@school.edu"),
            ("ATTENDANCE_ADMIN_PASSWORD", "secret1"),
            ("ATTENDANCE_LOG_FORMAT", "json"),
            ("ATTENDANCE_PROXY_SECRET", "s3cret"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.port, 7000);
        assert_eq!(config.files.public_base_url, "https://attendance.example/files");
        assert_eq!(
            config.auth.bootstrap_admin.as_ref().map(|a| a.email.as_str()),
            Some("root@school.edu")
        );
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.auth.federated.proxy_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "ATTENDANCE_API_PORT").then(|| "abc".to_string()));
        assert_eq!(config.api.port, 8090);
    }

    #[test]
    fn test_files_dir_defaults_under_data_dir() {
        let files = FilesConfig::default();
        assert_eq!(files.resolve_dir("/data"), PathBuf::from("/data/files"));
    }
}
