//! Quill Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. The signing secret has no default:
//! [`AppConfig::validate`] refuses a configuration without one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token and cookie settings
    pub auth: AuthConfig,

    /// Image upload processing
    pub upload: UploadConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `from_env` is a thin wrapper over this; tests feed a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(&lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_lookup(&|key: &str| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Check that the configuration can be used to start the server.
    ///
    /// A missing or blank `JWT_SECRET` is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRATION_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        let upload_limits = [
            ("UPLOAD_RESIZE_WIDTH", u64::from(self.upload.resize_width)),
            ("UPLOAD_MAX_INPUT_DIMENSION", u64::from(self.upload.max_input_dimension)),
            ("UPLOAD_MAX_OUTPUT_PIXELS", self.upload.max_output_pixels),
        ];
        if let Some((key, _)) = upload_limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: "0".to_string(),
            });
        }
        if u64::from(self.upload.resize_width) > self.upload.max_output_pixels {
            return Err(ConfigError::InvalidValue {
                key: "UPLOAD_RESIZE_WIDTH".to_string(),
                value: self.upload.resize_width.to_string(),
            });
        }
        if !(1..=100).contains(&self.upload.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                key: "UPLOAD_JPEG_QUALITY".to_string(),
                value: self.upload.jpeg_quality.to_string(),
            });
        }
        Ok(())
    }

    fn apply_lookup<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // PostgreSQL
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(size) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", size)?;
        }

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("JWT_EXPIRATION_SECS") {
            self.auth.token_ttl_secs = parse_value("JWT_EXPIRATION_SECS", ttl)?;
        }
        if let Some(secure) = lookup("COOKIE_SECURE") {
            self.auth.cookie_secure = parse_value("COOKIE_SECURE", secure)?;
        }

        // Upload
        if let Some(width) = lookup("UPLOAD_RESIZE_WIDTH") {
            self.upload.resize_width = parse_value("UPLOAD_RESIZE_WIDTH", width)?;
        }
        if let Some(quality) = lookup("UPLOAD_JPEG_QUALITY") {
            self.upload.jpeg_quality = parse_value("UPLOAD_JPEG_QUALITY", quality)?;
        }
        if let Some(dimension) = lookup("UPLOAD_MAX_INPUT_DIMENSION") {
            self.upload.max_input_dimension = parse_value("UPLOAD_MAX_INPUT_DIMENSION", dimension)?;
        }
        if let Some(pixels) = lookup("UPLOAD_MAX_OUTPUT_PIXELS") {
            self.upload.max_output_pixels = parse_value("UPLOAD_MAX_OUTPUT_PIXELS", pixels)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = match format.to_lowercase().as_str() {
                "json" => true,
                "pretty" | "text" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT".to_string(),
                        value: format,
                    })
                }
            };
        }

        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size: 10 * 1024 * 1024, // 10MB
            // Empty by default for security - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL. `None` runs on the in-memory store.
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Token issuing and session cookie configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret. Required.
    pub jwt_secret: String,

    /// Token validity window in seconds; also the cookie max-age
    pub token_ttl_secs: u64,

    /// Name of the cookie mirroring the bearer token
    pub cookie_name: String,

    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 60,
            cookie_name: "token".to_string(),
            cookie_secure: true,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Image upload processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Target width in pixels; height follows the aspect ratio
    pub resize_width: u32,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Largest width or height accepted from an uploaded image
    pub max_input_dimension: u32,

    /// Largest resized image, in pixels; taller results are rejected
    pub max_output_pixels: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            resize_width: 800,
            jpeg_quality: 80,
            max_input_dimension: 16_384,
            max_output_pixels: 8_000_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "quill_api=debug,tower_http=debug".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
