//! Test doubles shared by the integration tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use gad_agent::deploy::executor::Deployer;
use gad_agent::models::deployment::DeployResult;

/// Deployer that blocks until released, recording how it was called
pub struct GatedDeployer {
    result: DeployResult,
    started: Notify,
    release: Semaphore,
    runs: AtomicUsize,
}

impl GatedDeployer {
    pub fn new(result: DeployResult) -> Self {
        Self {
            result,
            started: Notify::new(),
            release: Semaphore::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    /// Wait until a deployment has started
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let one blocked deployment finish
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Deployer for GatedDeployer {
    async fn execute(&self) -> DeployResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
        self.result.clone()
    }
}

/// Deployer that records how many runs overlap
pub struct OverlapDeployer {
    duration: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    runs: AtomicUsize,
}

impl OverlapDeployer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Deployer for OverlapDeployer {
    async fn execute(&self) -> DeployResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(self.duration).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        DeployResult::Success
    }
}

/// Write a shell script into `dir` and return a deploy command line running it
pub fn script_command(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    format!("sh {}", path.display())
}
