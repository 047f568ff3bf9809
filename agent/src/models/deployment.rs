//! Deployment models

use std::fmt;

/// Separator between the failure description and the captured output
pub const DETAIL_SEPARATOR: &str = "\n---\n";

/// Result of a single run of the deploy command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployResult {
    /// The command exited with status zero
    Success,

    /// The command exited nonzero or could not be started
    Failure {
        /// Error description, [`DETAIL_SEPARATOR`], then the combined output
        detail: String,
    },
}

impl DeployResult {
    /// Build a failure from an error description and the captured output
    pub fn failure(error: impl fmt::Display, output: &[u8]) -> Self {
        DeployResult::Failure {
            detail: format!(
                "{}{}{}",
                error,
                DETAIL_SEPARATOR,
                String::from_utf8_lossy(output)
            ),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeployResult::Success)
    }

    /// Failure detail, `None` on success
    pub fn detail(&self) -> Option<&str> {
        match self {
            DeployResult::Success => None,
            DeployResult::Failure { detail } => Some(detail),
        }
    }
}

/// What happened to a trigger attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The deployment ran; carries its result
    Accepted(DeployResult),

    /// Another deployment was already running; nothing was done
    Rejected,
}

impl Outcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected)
    }

    pub fn is_accepted(&self) -> bool {
        !self.is_rejected()
    }
}
