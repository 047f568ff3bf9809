//! Coordinator tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use gad_agent::deploy::coordinator::Coordinator;
use gad_agent::deploy::executor::CommandDeployer;
use gad_agent::models::deployment::{DeployResult, Outcome};

use crate::support::{GatedDeployer, OverlapDeployer};

#[tokio::test]
async fn test_trigger_while_busy_is_rejected() {
    let deployer = Arc::new(GatedDeployer::new(DeployResult::Success));
    let (coordinator, _handle) = Coordinator::spawn(deployer.clone());

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.try_trigger().await }
    });
    deployer.wait_started().await;

    assert!(coordinator.is_busy());
    assert_eq!(coordinator.try_trigger().await, Outcome::Rejected);
    assert_eq!(coordinator.try_trigger().await, Outcome::Rejected);

    deployer.release_one();
    assert_eq!(first.await.unwrap(), Outcome::Accepted(DeployResult::Success));
    assert_eq!(deployer.runs(), 1);
}

#[tokio::test]
async fn test_rejection_leaves_in_flight_result_untouched() {
    let failure = DeployResult::failure("exit status: 7", b"original output");
    let deployer = Arc::new(GatedDeployer::new(failure.clone()));
    let (coordinator, _handle) = Coordinator::spawn(deployer.clone());

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.try_trigger().await }
    });
    deployer.wait_started().await;

    for _ in 0..5 {
        assert!(coordinator.try_trigger().await.is_rejected());
    }

    deployer.release_one();
    assert_eq!(first.await.unwrap(), Outcome::Accepted(failure));
    assert_eq!(deployer.runs(), 1);
}

#[tokio::test]
async fn test_abandoned_trigger_keeps_coordinator_busy() {
    let deployer = Arc::new(GatedDeployer::new(DeployResult::Success));
    let (coordinator, _handle) = Coordinator::spawn(deployer.clone());

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.try_trigger().await }
    });
    deployer.wait_started().await;

    // The caller goes away while its deployment runs
    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    assert!(coordinator.is_busy());
    assert_eq!(coordinator.try_trigger().await, Outcome::Rejected);

    deployer.release_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    deployer.release_one();
    assert_eq!(
        coordinator.try_trigger().await,
        Outcome::Accepted(DeployResult::Success)
    );
    assert_eq!(deployer.runs(), 2);
}

#[tokio::test]
async fn test_coordinator_returns_to_idle() {
    let deployer = Arc::new(GatedDeployer::new(DeployResult::Success));
    let (coordinator, _handle) = Coordinator::spawn(deployer.clone());

    for run in 1..=3 {
        let trigger = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.try_trigger().await }
        });
        deployer.wait_started().await;
        deployer.release_one();

        assert!(trigger.await.unwrap().is_accepted());
        assert_eq!(deployer.runs(), run);
    }
    assert!(!coordinator.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_never_overlap() {
    let deployer = Arc::new(OverlapDeployer::new(Duration::from_millis(15)));
    let (coordinator, _handle) = Coordinator::spawn(deployer.clone());

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let coordinator = coordinator.clone();
        tasks.push(tokio::spawn(async move {
            let mut accepted = 0;
            for _ in 0..10 {
                match coordinator.try_trigger().await {
                    Outcome::Accepted(result) => {
                        assert_eq!(result, DeployResult::Success);
                        accepted += 1;
                    }
                    Outcome::Rejected => tokio::time::sleep(Duration::from_millis(2)).await,
                }
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        accepted += task.await.unwrap();
    }

    assert_eq!(deployer.max_active(), 1);
    assert!(accepted >= 1);
    // Every accepted trigger got the result of its own run
    assert_eq!(deployer.runs(), accepted);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_command_rejects_second_trigger_immediately() {
    let deployer = Arc::new(CommandDeployer::new("sleep 2".parse().unwrap()));
    let (coordinator, _handle) = Coordinator::spawn(deployer);

    let started = Instant::now();
    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.try_trigger().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second_started = Instant::now();
    let second = coordinator.try_trigger().await;

    assert_eq!(second, Outcome::Rejected);
    assert!(second_started.elapsed() < Duration::from_millis(500));

    assert_eq!(first.await.unwrap(), Outcome::Accepted(DeployResult::Success));
    assert!(started.elapsed() >= Duration::from_millis(1900));
}
