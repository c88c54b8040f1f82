// src/engine/pipeline.rs

//! Script execution paths.
//!
//! [`run_source`] is the in-process pipeline: extract, validate, load and
//! schedule. [`ScriptRunner`] picks between that and an isolated run using
//! the configured [`ExecutionPolicy`].

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::dag::{validate_dependencies, ExecutionResult, KnownValues, Scheduler};
use crate::errors::Result;
use crate::exec::{InterpreterLoader, ScriptLoader};
use crate::fs::FileSystem;
use crate::isolate::{DockerBackend, IsolatedRunner, IsolationBackend};
use crate::script::extract_declarations;
use crate::types::ResultScope;

use super::policy::{ExecutionPath, ExecutionPolicy};

/// Knobs for a single in-process run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Check resolvability before scheduling. Without it, missing producers
    /// surface as a scheduling stall instead.
    pub validate: bool,
    pub scope: ResultScope,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            validate: true,
            scope: ResultScope::Full,
        }
    }
}

/// Run already-read script text in-process.
///
/// `script` is handed to the loader so it can locate the callables.
pub async fn run_source(
    source: &str,
    script: &Path,
    known: KnownValues,
    loader: &dyn ScriptLoader,
    options: RunOptions,
) -> Result<ExecutionResult> {
    let table = extract_declarations(source)?;
    debug!(script = ?script, units = table.len(), "extracted declarations");

    if options.validate {
        validate_dependencies(&table, &known.names())?;
    }

    let registry = loader.load(script, &table)?;
    Scheduler::new(&table)
        .run(&registry, known, options.scope)
        .await
}

/// Read `script` through `fs` and run it in-process.
pub async fn run_script(
    fs: &dyn FileSystem,
    script: &Path,
    known: KnownValues,
    loader: &dyn ScriptLoader,
    options: RunOptions,
) -> Result<ExecutionResult> {
    let source = fs.read_to_string(script)?;
    run_source(&source, script, known, loader, options).await
}

/// Runs scripts on whichever path the execution policy selects.
#[derive(Clone)]
pub struct ScriptRunner {
    policy: ExecutionPolicy,
    isolated: IsolatedRunner,
    loader: Arc<dyn ScriptLoader>,
    fs: Arc<dyn FileSystem>,
    options: RunOptions,
}

impl std::fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("policy", &self.policy)
            .field("isolated", &self.isolated)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptRunner {
    pub fn new(
        policy: ExecutionPolicy,
        isolated: IsolatedRunner,
        loader: Arc<dyn ScriptLoader>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            policy,
            isolated,
            loader,
            fs,
            options: RunOptions::default(),
        }
    }

    /// Production wiring: docker isolation, interpreter loader, real
    /// filesystem, environment-aware policy.
    pub fn from_config(config: &ConfigFile) -> Self {
        let backend: Arc<dyn IsolationBackend> =
            Arc::new(DockerBackend::from_config(&config.isolation));
        let isolated = IsolatedRunner::new(
            backend,
            config.isolation.staging_root.clone(),
            config.execution.timeout,
        );
        Self::new(
            ExecutionPolicy::from_config(&config.execution),
            isolated,
            Arc::new(InterpreterLoader::new(config.interpreter.program.clone())),
            Arc::new(crate::fs::RealFileSystem),
        )
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Run `script` against `known`.
    pub async fn run(&self, script: &Path, known: KnownValues) -> Result<ExecutionResult> {
        let path = self.policy.select(self.isolated.backend().as_ref()).await?;
        info!(script = ?script, path = %path, "running feature script");

        match path {
            ExecutionPath::InProcess => {
                run_script(
                    self.fs.as_ref(),
                    script,
                    known,
                    self.loader.as_ref(),
                    self.options,
                )
                .await
            }
            ExecutionPath::Isolated => {
                let result = self.isolated.run(script, &known).await?;
                Ok(result.scoped(self.options.scope))
            }
        }
    }
}
