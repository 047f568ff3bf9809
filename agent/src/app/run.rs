//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::deploy::coordinator::Coordinator;
use crate::deploy::executor::CommandDeployer;
use crate::errors::AgentError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the deploy agent until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    info!("Initializing deploy agent...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start agent: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), AgentError> {
    info!("Will run \"{}\" to deploy", options.deploy.command);
    if options.deploy.secret.is_some() {
        info!("Using GitHub HMAC authentication");
    } else {
        warn!("Accepting all POSTs without authentication");
    }

    let coordinator = init_deploy_worker(options, shutdown_manager)?;
    init_socket_server(options, coordinator, shutdown_manager, shutdown_tx.subscribe()).await
}

fn init_deploy_worker(
    options: &AppOptions,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Coordinator, AgentError> {
    info!("Initializing deploy worker...");

    let deployer = Arc::new(CommandDeployer::new(options.deploy.command.clone()));
    let (coordinator, worker_handle) = Coordinator::spawn(deployer);

    shutdown_manager.with_deploy_worker_handle(worker_handle)?;
    Ok(coordinator)
}

async fn init_socket_server(
    options: &AppOptions,
    coordinator: Coordinator,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), AgentError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(coordinator, options.deploy.secret.clone());

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    socket_server_handle: Option<JoinHandle<Result<(), AgentError>>>,
    deploy_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            socket_server_handle: None,
            deploy_worker_handle: None,
        }
    }

    pub fn with_deploy_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), AgentError> {
        if self.deploy_worker_handle.is_some() {
            return Err(AgentError::ShutdownError(
                "deploy_worker_handle already set".to_string(),
            ));
        }
        self.deploy_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), AgentError>>,
    ) -> Result<(), AgentError> {
        if self.socket_server_handle.is_some() {
            return Err(AgentError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), AgentError> {
        let _ = self.shutdown_tx.send(());

        let max_delay = self.lifecycle_options.max_shutdown_delay;
        match tokio::time::timeout(max_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!("Shutdown timed out after {:?}", max_delay);
                Err(AgentError::ShutdownError(format!(
                    "timed out after {:?}",
                    max_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), AgentError> {
        info!("Shutting down deploy agent...");

        // 1. Socket server. Dropping the router releases the last coordinator
        // handle, which lets the deploy worker finish.
        if let Some(handle) = self.socket_server_handle.take() {
            handle
                .await
                .map_err(|e| AgentError::ShutdownError(e.to_string()))??;
        }

        // 2. Deploy worker, after any in-flight deployment completes
        if let Some(handle) = self.deploy_worker_handle.take() {
            handle
                .await
                .map_err(|e| AgentError::ShutdownError(e.to_string()))?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
