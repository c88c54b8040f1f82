// src/engine/policy.rs

//! Choosing between in-process and isolated execution.

use std::fmt;

use tracing::warn;

use crate::config::ExecutionConfig;
use crate::errors::{FeaturedagError, Result};
use crate::isolate::docker::IN_CONTAINER_ENV;
use crate::isolate::IsolationBackend;
use crate::types::{ExecutionMode, WhenUnavailable};

/// Setting this to `1` forces in-process execution.
pub const NO_DOCKER_ENV: &str = "FEATUREDAG_NO_DOCKER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    InProcess,
    Isolated,
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPath::InProcess => f.write_str("in-process"),
            ExecutionPath::Isolated => f.write_str("isolated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionPolicy {
    pub mode: ExecutionMode,
    pub when_unavailable: WhenUnavailable,
    /// Isolation switched off through the environment.
    pub disabled_by_env: bool,
    /// Already running inside an isolated environment.
    pub inside_isolation: bool,
}

impl ExecutionPolicy {
    /// Policy from config, with the environment switches read from the
    /// current process.
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            mode: config.mode,
            when_unavailable: config.when_unavailable,
            disabled_by_env: env_flag(NO_DOCKER_ENV),
            inside_isolation: env_flag(IN_CONTAINER_ENV),
        }
    }

    /// Decide how to run, probing `backend` only when it matters.
    pub async fn select(&self, backend: &dyn IsolationBackend) -> Result<ExecutionPath> {
        if self.inside_isolation {
            return Ok(ExecutionPath::InProcess);
        }
        if self.disabled_by_env {
            warn!(
                env = NO_DOCKER_ENV,
                "isolation disabled by environment; running untrusted script code in-process"
            );
            return Ok(ExecutionPath::InProcess);
        }

        match self.mode {
            ExecutionMode::InProcess => Ok(ExecutionPath::InProcess),
            ExecutionMode::Isolated => {
                if backend.is_available().await? {
                    Ok(ExecutionPath::Isolated)
                } else {
                    Err(unavailable(backend))
                }
            }
            ExecutionMode::Auto => {
                if backend.is_available().await? {
                    return Ok(ExecutionPath::Isolated);
                }
                match self.when_unavailable {
                    WhenUnavailable::Reject => Err(unavailable(backend)),
                    WhenUnavailable::InProcess => {
                        warn!(
                            backend = backend.name(),
                            "isolation unavailable; falling back to in-process execution"
                        );
                        Ok(ExecutionPath::InProcess)
                    }
                }
            }
        }
    }
}

fn unavailable(backend: &dyn IsolationBackend) -> FeaturedagError {
    FeaturedagError::IsolatedExecution(format!(
        "isolation backend '{}' is not available",
        backend.name()
    ))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1")
}
