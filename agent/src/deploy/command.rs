//! Deploy command line

use std::fmt;
use std::str::FromStr;

use crate::errors::AgentError;

/// Default command run on each deployment
pub const DEFAULT_DEPLOY_COMMAND: &str = "git pull";

/// A deploy command split into a program and its arguments.
///
/// The command line is split on whitespace only. There is no shell quoting or
/// escaping, so an argument can never contain a space: `echo "a b"` runs
/// `echo` with the two arguments `"a` and `b"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCommand {
    program: String,
    args: Vec<String>,
}

impl DeployCommand {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for DeployCommand {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            args: vec!["pull".to_string()],
        }
    }
}

impl FromStr for DeployCommand {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AgentError::ConfigError("deploy command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl fmt::Display for DeployCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
