// src/isolate/backend.rs

//! Pluggable isolation backend abstraction.
//!
//! The runner talks to an `IsolationBackend` instead of invoking a container
//! CLI directly, so tests can swap in a fake backend that never starts a real
//! container.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::isolate::staging::StagingLayout;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Opaque handle of one started isolated instance (a container id for
/// docker).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(pub String);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an instance finished, with its captured output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceExit {
    pub code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl InstanceExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait abstracting the sandbox that runs a staged script.
///
/// Production code uses [`crate::isolate::DockerBackend`].
pub trait IsolationBackend: Send + Sync + fmt::Debug {
    /// Short name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether the backend (and its image) can be used right now.
    fn is_available(&self) -> BackendFuture<'_, bool>;

    /// Create (but do not start) an instance over the given staging
    /// directory. From here on the instance exists and must be removed.
    fn create(&self, staging: &StagingLayout) -> BackendFuture<'_, InstanceId>;

    /// Start a created instance.
    fn start(&self, id: &InstanceId) -> BackendFuture<'_, ()>;

    /// Wait for the instance to exit and collect its output.
    fn wait(&self, id: &InstanceId) -> BackendFuture<'_, InstanceExit>;

    /// Force-remove the instance.
    fn remove(&self, id: &InstanceId) -> BackendFuture<'_, ()>;

    /// Best-effort removal that must not block; used when a run is dropped
    /// before it could clean up.
    fn remove_detached(&self, id: &InstanceId);
}
