//! Error types for the deploy agent
//!
//! Deploy failures are not errors: they travel as [`DeployResult`] values.
//! `AgentError` only covers what can stop the process (startup and shutdown).
//!
//! [`DeployResult`]: crate::models::deployment::DeployResult

use thiserror::Error;

/// Main error type for the deploy agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
