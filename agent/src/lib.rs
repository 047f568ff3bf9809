//! Webhook deploy agent library
//!
//! Listens for authenticated webhook POSTs and runs one configured deploy
//! command per request, never more than one at a time.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod server;
pub mod utils;
