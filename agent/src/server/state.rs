//! Server state

use secrecy::SecretString;

use crate::deploy::coordinator::Coordinator;

/// Server state shared across handlers
pub struct ServerState {
    pub coordinator: Coordinator,

    /// Shared webhook secret, `None` accepts every POST
    pub secret: Option<SecretString>,
}

impl ServerState {
    pub fn new(coordinator: Coordinator, secret: Option<SecretString>) -> Self {
        Self {
            coordinator,
            secret,
        }
    }
}
