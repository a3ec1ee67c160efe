//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Nothing reads the environment after
//! `Config::from_env` returns; the values are passed into constructors.

use std::net::SocketAddr;
use std::time::Duration;

use psico_core::{FailurePolicy, OrchestratorConfig, TaskKind};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    /// Without a key the AI gateway is built unconfigured.
    pub openai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_temperature: f32,
    pub ai_timeout: Duration,
    /// Task kinds that persist a placeholder when the AI call fails.
    pub fail_open_tasks: Vec<TaskKind>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load AI Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let ai_model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let ai_temperature = match std::env::var("AI_TEMPERATURE") {
            Ok(value) => value.parse::<f32>().map_err(|e| {
                ConfigError::InvalidValue("AI_TEMPERATURE".to_string(), e.to_string())
            })?,
            Err(_) => 0.5,
        };

        let ai_timeout = match std::env::var("AI_TIMEOUT_SECS") {
            Ok(value) => value.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidValue("AI_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            Err(_) => psico_core::gateway::DEFAULT_TIMEOUT,
        };

        let fail_open_tasks = match std::env::var("AI_FAIL_OPEN_TASKS") {
            Ok(value) => parse_task_list(&value)
                .map_err(|e| ConfigError::InvalidValue("AI_FAIL_OPEN_TASKS".to_string(), e))?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            ai_model,
            ai_temperature,
            ai_timeout,
            fail_open_tasks,
        })
    }

    /// Failure policies for the submission orchestrator.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        self.fail_open_tasks
            .iter()
            .fold(OrchestratorConfig::default(), |config, kind| {
                config.with_policy(*kind, FailurePolicy::FailOpen)
            })
    }
}

/// Parses a comma-separated list such as `plan_feedback, exercise_generation`.
fn parse_task_list(value: &str) -> Result<Vec<TaskKind>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse::<TaskKind>)
        .collect()
}
