//! Deployment module

pub mod command;
pub mod coordinator;
pub mod executor;
