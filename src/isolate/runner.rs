// src/isolate/runner.rs

//! Host side of an isolated run.
//!
//! A run moves `Staged -> Running -> Collected -> Cleaned`; any of the first
//! three can end in `Failed`, which still goes through cleanup. If the run
//! future is dropped midway, [`InstanceGuard`] and the staging directory's
//! own drop remove the container and the files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::{ExecutionResult, KnownValues};
use crate::errors::{FeaturedagError, Result};
use crate::isolate::backend::{InstanceExit, InstanceId, IsolationBackend};
use crate::isolate::outcome::StagedOutcome;
use crate::isolate::staging::StagingDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Staged,
    Running,
    Collected,
    Cleaned,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Staged => "staged",
            RunPhase::Running => "running",
            RunPhase::Collected => "collected",
            RunPhase::Cleaned => "cleaned",
            RunPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Removes a started instance if the run is abandoned before cleanup.
struct InstanceGuard {
    backend: Arc<dyn IsolationBackend>,
    id: Option<InstanceId>,
}

impl InstanceGuard {
    fn new(backend: Arc<dyn IsolationBackend>) -> Self {
        Self { backend, id: None }
    }

    fn disarm(&mut self) -> Option<InstanceId> {
        self.id.take()
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            warn!(instance = %id, "run abandoned; removing instance in the background");
            self.backend.remove_detached(&id);
        }
    }
}

/// Runs a script against a known-values snapshot inside an isolation
/// backend.
#[derive(Debug, Clone)]
pub struct IsolatedRunner {
    backend: Arc<dyn IsolationBackend>,
    staging_root: Option<PathBuf>,
    timeout: Duration,
}

impl IsolatedRunner {
    pub fn new(
        backend: Arc<dyn IsolationBackend>,
        staging_root: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            staging_root,
            timeout,
        }
    }

    pub fn backend(&self) -> &Arc<dyn IsolationBackend> {
        &self.backend
    }

    /// Run `script` in isolation and return its execution result.
    ///
    /// Errors reported by the isolated side keep their original kind; any
    /// failure to obtain a result at all is an `IsolatedExecution` error.
    pub async fn run(&self, script: &Path, known: &KnownValues) -> Result<ExecutionResult> {
        let source = tokio::fs::read_to_string(script).await.map_err(|e| {
            FeaturedagError::IsolatedExecution(format!(
                "cannot read script {}: {e}",
                script.display()
            ))
        })?;

        let staging = StagingDir::create(self.staging_root.as_deref(), &source, known)
            .map_err(|e| FeaturedagError::IsolatedExecution(format!("staging failed: {e}")))?;
        debug!(staging = ?staging.path(), phase = %RunPhase::Staged, "isolated run");

        let mut guard = InstanceGuard::new(Arc::clone(&self.backend));
        let outcome = self.drive(&staging, &mut guard).await;
        if let Err(err) = &outcome {
            debug!(phase = %RunPhase::Failed, error = %err, "isolated run");
        }

        self.cleanup(guard.disarm(), staging).await;
        outcome
    }

    async fn drive(
        &self,
        staging: &StagingDir,
        guard: &mut InstanceGuard,
    ) -> Result<ExecutionResult> {
        let launched = tokio::time::timeout(self.timeout, self.launch(staging, guard)).await;
        let (id, exit) = match launched {
            Ok(launched) => launched?,
            Err(_) => {
                return Err(FeaturedagError::IsolatedExecution(format!(
                    "timed out after {:?}",
                    self.timeout
                )));
            }
        };
        log_instance_output(&id, &exit);

        let result_path = staging.layout().result_path();
        let bytes = match tokio::fs::read(&result_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(FeaturedagError::IsolatedExecution(format!(
                    "no result produced (exit code {}): {e}{}",
                    exit.code,
                    stderr_tail(&exit)
                )));
            }
        };
        let outcome: StagedOutcome = serde_json::from_slice(&bytes).map_err(|e| {
            FeaturedagError::IsolatedExecution(format!(
                "corrupt result file: {e}{}",
                stderr_tail(&exit)
            ))
        })?;
        debug!(instance = %id, phase = %RunPhase::Collected, "isolated run");

        outcome.into_result()
    }

    /// Create, start and wait for the instance. The guard is armed as soon
    /// as the instance exists.
    async fn launch(
        &self,
        staging: &StagingDir,
        guard: &mut InstanceGuard,
    ) -> Result<(InstanceId, InstanceExit)> {
        let id = self.backend.create(staging.layout()).await?;
        guard.id = Some(id.clone());

        self.backend.start(&id).await?;
        debug!(instance = %id, phase = %RunPhase::Running, "isolated run");

        let exit = self.backend.wait(&id).await?;
        Ok((id, exit))
    }

    /// Remove the instance and the staging directory. Failures are logged and
    /// never replace the run's own outcome.
    async fn cleanup(&self, instance: Option<InstanceId>, staging: StagingDir) {
        if let Some(id) = instance {
            if let Err(err) = self.backend.remove(&id).await {
                warn!(instance = %id, error = %err, "failed to remove instance");
            }
        }

        let path = staging.path().to_path_buf();
        match staging.close() {
            Ok(()) => info!(staging = ?path, phase = %RunPhase::Cleaned, "isolated run"),
            Err(e) => warn!(staging = ?path, error = %e, "failed to remove staging directory"),
        }
    }
}

/// Number of trailing stderr lines carried in error messages.
const STDERR_TAIL_LINES: usize = 10;

/// Last lines of the instance's stderr, formatted for appending to an
/// error message; empty if there was none.
fn stderr_tail(exit: &InstanceExit) -> String {
    let lines: Vec<&str> = exit
        .stderr
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return String::new();
    }
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
    format!("\nstderr:\n{}", tail.join("\n"))
}

fn log_instance_output(id: &InstanceId, exit: &InstanceExit) {
    for line in exit.stdout.lines() {
        debug!(instance = %id, "stdout: {}", line);
    }
    for line in exit.stderr.lines() {
        warn!(instance = %id, "stderr: {}", line);
    }
    if !exit.success() {
        warn!(instance = %id, exit_code = exit.code, "instance exited unsuccessfully");
    }
}
