//! Deploy executor
//!
//! Runs the deploy command to completion and classifies the outcome. All
//! failures, including a program that cannot be started, come back as
//! [`DeployResult::Failure`] values.

use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::deploy::command::DeployCommand;
use crate::models::deployment::DeployResult;

const READ_CHUNK_SIZE: usize = 4096;

/// Something that performs one deployment
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Run a deployment to completion
    async fn execute(&self) -> DeployResult;
}

/// Reasons a deploy command run can fail
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start \"{program}\": {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for \"{program}\": {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Exit(ExitStatus),
}

/// Deployer that runs an external command
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    command: DeployCommand,
}

impl CommandDeployer {
    pub fn new(command: DeployCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &DeployCommand {
        &self.command
    }
}

#[async_trait]
impl Deployer for CommandDeployer {
    async fn execute(&self) -> DeployResult {
        info!("Running deploy command: {}", self.command);

        let mut output = Vec::new();
        match run_command(&self.command, &mut output).await {
            Ok(()) => {
                info!("Deploy command succeeded");
                DeployResult::Success
            }
            Err(e) => {
                let result = DeployResult::failure(&e, &output);
                error!("Deploy command failed: {}", e);
                debug!("Deploy command output: {}", String::from_utf8_lossy(&output));
                result
            }
        }
    }
}

/// Run the command, appending its combined stdout and stderr to `output`
async fn run_command(command: &DeployCommand, output: &mut Vec<u8>) -> Result<(), ExecError> {
    debug!(program = command.program(), args = ?command.args(), "Spawning deploy command");

    let mut child = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: command.program().to_string(),
            source,
        })?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut stdout_buf = [0u8; READ_CHUNK_SIZE];
    let mut stderr_buf = [0u8; READ_CHUNK_SIZE];

    // Chunks are appended in the order they arrive on either pipe
    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut stdout_buf) => match read {
                Ok(0) => stdout = None,
                Ok(n) => output.extend_from_slice(&stdout_buf[..n]),
                Err(e) => {
                    debug!("Stopped reading stdout: {}", e);
                    stdout = None;
                }
            },
            read = read_chunk(&mut stderr, &mut stderr_buf) => match read {
                Ok(0) => stderr = None,
                Ok(n) => output.extend_from_slice(&stderr_buf[..n]),
                Err(e) => {
                    debug!("Stopped reading stderr: {}", e);
                    stderr = None;
                }
            },
        }
    }

    let status = child.wait().await.map_err(|source| ExecError::Wait {
        program: command.program().to_string(),
        source,
    })?;

    if !status.success() {
        return Err(ExecError::Exit(status));
    }

    Ok(())
}

/// Read from a pipe that may already be closed; a closed pipe never yields
async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
