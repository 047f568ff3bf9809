//! Single-flight deploy coordinator
//!
//! One worker task owns the [`Deployer`]. Callers never queue: a trigger
//! either takes the single busy permit and hands its request to the worker,
//! or it is rejected on the spot because a deployment is already running.
//!
//! The permit travels with the request and is released by the worker only
//! after the result has been posted, so the worker is `Idle` exactly when the
//! permit is available and two deployments can never overlap.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::deploy::executor::Deployer;
use crate::models::deployment::{DeployResult, Outcome};

/// Detail reported when a request cannot reach the worker
pub const WORKER_STOPPED: &str = "deploy worker is not running";

/// A pending "deploy now" request
struct DeployRequest {
    reply: oneshot::Sender<DeployResult>,
    permit: OwnedSemaphorePermit,
}

/// Handle used to trigger deployments. Cheap to clone.
///
/// The worker stops once every handle has been dropped.
#[derive(Clone)]
pub struct Coordinator {
    requests: mpsc::Sender<DeployRequest>,
    idle: Arc<Semaphore>,
}

impl Coordinator {
    /// Start the deploy worker and return a handle to it
    pub fn spawn(deployer: Arc<dyn Deployer>) -> (Self, JoinHandle<()>) {
        // Only the permit holder ever sends, so one slot is all the channel needs
        let (requests, receiver) = mpsc::channel(1);
        let handle = tokio::spawn(run_worker(deployer, receiver));

        let coordinator = Self {
            requests,
            idle: Arc::new(Semaphore::new(1)),
        };
        (coordinator, handle)
    }

    /// Whether a deployment is running right now
    pub fn is_busy(&self) -> bool {
        self.idle.available_permits() == 0
    }

    /// Attempt a deployment.
    ///
    /// Returns [`Outcome::Rejected`] immediately if a deployment is in
    /// progress. Otherwise waits for the deployment to finish and returns its
    /// result. Dropping the returned future after the handoff does not cancel
    /// the deployment.
    pub async fn try_trigger(&self) -> Outcome {
        let permit = match self.idle.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Deploy in progress, rejecting trigger");
                return Outcome::Rejected;
            }
        };

        let (reply, result) = oneshot::channel();
        if self
            .requests
            .try_send(DeployRequest { reply, permit })
            .is_err()
        {
            warn!("Deploy trigger accepted but the worker is gone");
            return Outcome::Accepted(worker_stopped());
        }

        match result.await {
            Ok(result) => Outcome::Accepted(result),
            Err(_) => Outcome::Accepted(worker_stopped()),
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("busy", &self.is_busy())
            .finish()
    }
}

fn worker_stopped() -> DeployResult {
    DeployResult::Failure {
        detail: WORKER_STOPPED.to_string(),
    }
}

async fn run_worker(deployer: Arc<dyn Deployer>, mut requests: mpsc::Receiver<DeployRequest>) {
    info!("Deploy worker starting...");

    while let Some(DeployRequest { reply, permit }) = requests.recv().await {
        let result = deployer.execute().await;

        if reply.send(result).is_err() {
            warn!("Deploy finished after its requester went away, result dropped");
        }

        // Back to idle only once the result is posted
        drop(permit);
    }

    info!("Deploy worker shutting down...");
}
