//! Logging configuration

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AgentError;

/// Log level configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_filter_string(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Logging options
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: LogLevel,

    /// Enable JSON format
    pub json_format: bool,
}

/// Initialize logging
///
/// Logs go to stdout, like the deploy command output the agent reports.
pub fn init_logging(options: LogOptions) -> Result<(), AgentError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.log_level.to_filter_string()));

    let subscriber = tracing_subscriber::registry().with(filter);

    if options.json_format {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| AgentError::ConfigError(e.to_string()))?;
    }

    Ok(())
}
