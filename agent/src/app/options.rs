//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::app::settings::Settings;
use crate::deploy::command::DeployCommand;
use crate::errors::AgentError;
use crate::logs::LogOptions;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Deployment configuration
    pub deploy: DeployOptions,

    /// Logging configuration
    pub log: LogOptions,
}

impl TryFrom<Settings> for AppOptions {
    type Error = AgentError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        Ok(Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions {
                listen_address: normalize_listen_address(&settings.listen_address)?,
            },
            deploy: DeployOptions {
                command: settings.deploy_command.parse()?,
                secret: settings.github_secret,
            },
            log: LogOptions {
                log_level: settings.log_level,
                json_format: settings.log_json,
            },
        })
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown, including an in-flight deployment
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// `host:port` to bind to
    pub listen_address: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Deployment options
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Command run on each deployment
    pub command: DeployCommand,

    /// Shared webhook secret, `None` accepts every POST
    pub secret: Option<SecretString>,
}

/// Turn a listen address into something `TcpListener::bind` accepts.
///
/// An empty host (`:8080`) means every interface.
pub fn normalize_listen_address(address: &str) -> Result<String, AgentError> {
    let address = address.trim();
    let Some((host, port)) = address.rsplit_once(':') else {
        return Err(AgentError::ConfigError(format!(
            "listen address {:?} has no port",
            address
        )));
    };

    if port.parse::<u16>().is_err() {
        return Err(AgentError::ConfigError(format!(
            "listen address {:?} has an invalid port",
            address
        )));
    }

    if host.is_empty() {
        Ok(format!("0.0.0.0:{}", port))
    } else {
        Ok(address.to_string())
    }
}
