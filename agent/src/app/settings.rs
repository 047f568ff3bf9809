//! Agent settings
//!
//! Read once at startup from `GAD_*` environment variables, then overridden by
//! `--key=value` command line flags. Empty values count as unset.

use std::collections::HashMap;

use secrecy::SecretString;

use crate::deploy::command::DEFAULT_DEPLOY_COMMAND;
use crate::errors::AgentError;
use crate::logs::LogLevel;

pub const ENV_LISTEN_ADDRESS: &str = "GAD_LISTEN_ADDRESS";
pub const ENV_DEPLOY_COMMAND: &str = "GAD_DEPLOY_COMMAND";
pub const ENV_GITHUB_SECRET: &str = "GAD_GITHUB_SECRET";
pub const ENV_LOG_LEVEL: &str = "GAD_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "GAD_LOG_JSON";

/// Agent settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listen address, `:port` binds every interface
    pub listen_address: String,

    /// Deploy command line, split on whitespace
    pub deploy_command: String,

    /// Shared webhook secret; `None` disables authentication
    pub github_secret: Option<SecretString>,

    /// Log level
    pub log_level: LogLevel,

    /// JSON log output
    pub log_json: bool,
}

fn default_listen_address() -> String {
    ":8080".to_string()
}

fn default_deploy_command() -> String {
    DEFAULT_DEPLOY_COMMAND.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            deploy_command: default_deploy_command(),
            github_secret: None,
            log_level: LogLevel::Info,
            log_json: false,
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through a variable lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(value) = get(ENV_LISTEN_ADDRESS) {
            settings.listen_address = value;
        }
        if let Some(value) = get(ENV_DEPLOY_COMMAND) {
            settings.deploy_command = value;
        }
        if let Some(value) = get(ENV_GITHUB_SECRET) {
            settings.github_secret = Some(SecretString::from(value));
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            settings.log_level = parse_log_level(ENV_LOG_LEVEL, &value)?;
        }
        if let Some(value) = get(ENV_LOG_JSON) {
            settings.log_json = parse_bool(ENV_LOG_JSON, &value)?;
        }

        Ok(settings)
    }

    /// Apply `--key=value` overrides from the command line
    ///
    /// Unknown keys are left for the caller to handle.
    pub fn apply_overrides(&mut self, args: &HashMap<String, String>) -> Result<(), AgentError> {
        let get = |key: &str| {
            args.get(key)
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
        };

        if let Some(value) = get("listen") {
            self.listen_address = value.to_string();
        }
        if let Some(value) = get("command") {
            self.deploy_command = value.to_string();
        }
        if let Some(value) = get("secret") {
            self.github_secret = Some(SecretString::from(value));
        }
        if let Some(value) = get("log-level") {
            self.log_level = parse_log_level("--log-level", value)?;
        }
        if let Some(value) = get("log-json") {
            self.log_json = parse_bool("--log-json", value)?;
        }

        Ok(())
    }
}

fn parse_log_level(key: &str, value: &str) -> Result<LogLevel, AgentError> {
    value
        .parse()
        .map_err(|e| AgentError::ConfigError(format!("{}: {}", key, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AgentError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AgentError::ConfigError(format!(
            "{}: expected a boolean, got {:?}",
            key, value
        ))),
    }
}
