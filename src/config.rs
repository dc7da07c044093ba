//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::sync::LazyLock;

use crate::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_JUDGE_DEADLINE_MS,
    DEFAULT_PER_TEST_TIMEOUT_MS, DEFAULT_ROOM_IDLE_TIMEOUT_MS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub judge: JudgeConfig,
    pub contest: ContestConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

/// Database configuration for the contest store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Judge sandbox configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Base URL of the external execution sandbox
    pub url: String,
    /// Overall deadline for a single judge call, in milliseconds
    pub deadline_ms: u64,
    /// Per-test-case execution timeout, in milliseconds
    pub per_test_timeout_ms: u64,
}

/// Live contest behaviour configuration
#[derive(Debug, Clone)]
pub struct ContestConfig {
    /// Interval between `progress-update` heartbeats, in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Idle time before a lobby room with no connections is reaped, in milliseconds
    pub room_idle_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            judge: JudgeConfig::from_env()?,
            contest: ContestConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_DATABASE_MAX_CONNECTIONS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

impl JudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("JUDGE_URL").map_err(|_| ConfigError::Missing("JUDGE_URL".to_string()))?,
            deadline_ms: env::var("JUDGE_DEADLINE_MS")
                .unwrap_or_else(|_| DEFAULT_JUDGE_DEADLINE_MS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JUDGE_DEADLINE_MS".to_string()))?,
            per_test_timeout_ms: env::var("JUDGE_PER_TEST_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_PER_TEST_TIMEOUT_MS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JUDGE_PER_TEST_TIMEOUT_MS".to_string()))?,
        })
    }
}

impl ContestConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            heartbeat_interval_ms: env::var("HEARTBEAT_INTERVAL_MS")
                .unwrap_or_else(|_| DEFAULT_HEARTBEAT_INTERVAL_MS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HEARTBEAT_INTERVAL_MS".to_string()))?,
            room_idle_timeout_ms: env::var("ROOM_IDLE_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_ROOM_IDLE_TIMEOUT_MS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("ROOM_IDLE_TIMEOUT_MS".to_string()))?,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
