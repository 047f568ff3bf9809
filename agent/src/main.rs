//! Deploy agent - Entry Point
//!
//! Runs a configured deploy command whenever an authenticated webhook arrives.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use gad_agent::app::options::AppOptions;
use gad_agent::app::run::run;
use gad_agent::app::settings::Settings;
use gad_agent::errors::AgentError;
use gad_agent::logs::init_logging;
use gad_agent::utils::version_info;

use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        return match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => {
                println!("{}", version);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to render version info: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let options = match load_options(&cli_args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = init_logging(options.log.clone()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the agent: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_options(cli_args: &HashMap<String, String>) -> Result<AppOptions, AgentError> {
    let mut settings = Settings::from_env()?;
    settings.apply_overrides(cli_args)?;
    AppOptions::try_from(settings)
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        use tracing::info;

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to listen for SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to listen for SIGINT");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        tracing::info!("Ctrl+C received, shutting down...");
    }
}
