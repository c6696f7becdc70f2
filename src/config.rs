//! Environment-based configuration module
//!
//! This module provides configuration management for different environments:
//! - Development: Verbose logging, relaxed limits
//! - Production: Minimal logging, strict limits
//!
//! Configuration can be set via:
//! 1. Environment variables (highest priority)
//! 2. .env file
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Get environment from APP_ENV variable or default to Development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()).as_str() {
            "production" => Environment::Production,
            "development" | _ => Environment::Development,
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment mode
    pub environment: Environment,

    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Security configuration
    pub security: SecurityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Product image upload configuration
    pub uploads: UploadConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (relative to app data dir)
    pub path: String,

    /// Maximum number of connections
    pub max_connections: u32,

    /// Minimum number of connections
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Session timeout in minutes
    pub session_timeout_mins: u64,

    /// Maximum login attempts before lockout
    pub max_login_attempts: u32,

    /// Lockout duration in minutes
    pub lockout_duration_mins: u64,

    /// Minimum password length
    pub min_password_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log to stdout
    pub log_to_stdout: bool,

    /// Use JSON format (true for production)
    pub json_format: bool,

    /// Maximum log file size in MB
    pub max_file_size_mb: u64,

    /// Maximum number of log files to keep
    pub max_log_files: u32,
}

/// Product image upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory for product images (relative to app data dir)
    pub images_dir: String,

    /// Maximum image size in MB
    pub max_image_size_mb: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();

        Self {
            environment: env,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Toko Alpiant".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            database: DatabaseConfig {
                path: env::var("DB_PATH").unwrap_or_else(|_| "toko.db".to_string()),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
            },

            security: SecurityConfig {
                session_timeout_mins: env::var("SESSION_TIMEOUT_MINS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(480), // 8 hours
                max_login_attempts: 5,
                lockout_duration_mins: 15,
                min_password_length: 8,
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if env.is_production() { "warn".to_string() } else { "debug".to_string() }
                }),
                log_to_file: true,
                log_to_stdout: env::var("LOG_TO_STDOUT")
                    .map(|s| s == "true")
                    .unwrap_or(true),
                json_format: env.is_production(),
                max_file_size_mb: 10,
                max_log_files: 5,
            },

            uploads: UploadConfig {
                images_dir: env::var("IMAGES_DIR").unwrap_or_else(|_| "images".to_string()),
                max_image_size_mb: env::var("MAX_IMAGE_SIZE_MB")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::default()
    }

    /// Load configuration from a .env file (if exists)
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(path).ok()?;

        // Simple .env parser (key=value format)
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');

                // Set environment variable (will be picked up by load())
                env::set_var(key, value);
            }
        }

        Some(Self::default())
    }

    /// Get the log directory path
    pub fn get_log_dir(&self, app_data_dir: &Path) -> PathBuf {
        app_data_dir.join("logs")
    }

    /// Get the product images directory path
    pub fn get_images_dir(&self, app_data_dir: &Path) -> PathBuf {
        app_data_dir.join(&self.uploads.images_dir)
    }

    /// Get the database path
    pub fn get_database_path(&self, app_data_dir: &Path) -> PathBuf {
        app_data_dir.join(&self.database.path)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Validate configuration before startup
    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections < self.database.min_connections {
            return Err(format!(
                "DB_MAX_CONNECTIONS ({}) must be >= DB_MIN_CONNECTIONS ({})",
                self.database.max_connections, self.database.min_connections
            ));
        }

        if self.uploads.max_image_size_mb == 0 {
            return Err("MAX_IMAGE_SIZE_MB must be at least 1".to_string());
        }

        if self.is_production() && self.logging.level == "debug" {
            eprintln!("⚠️  WARNING: Debug logging enabled in production!");
        }

        Ok(())
    }
}

/// Global configuration instance
static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration
pub fn init_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::load)
}

/// Get the global configuration (initializes lazily if needed)
pub fn get_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::load)
}

/// Get the current environment
pub fn get_environment() -> Environment {
    Environment::from_env()
}
