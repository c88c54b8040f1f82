// src/isolate/docker.rs

//! Docker CLI backend.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::IsolationConfig;
use crate::errors::{FeaturedagError, Result};
use crate::isolate::backend::{BackendFuture, InstanceExit, InstanceId, IsolationBackend};
use crate::isolate::staging::{StagingLayout, INPUT_DIR, OUTPUT_DIR};

/// Where the staging directory appears inside the container.
pub const CONTAINER_STAGING_DIR: &str = "/staging";

/// Environment marker set inside the container.
pub const IN_CONTAINER_ENV: &str = "FEATUREDAG_IN_CONTAINER";

#[derive(Debug, Clone)]
pub struct DockerBackend {
    docker: String,
    image: String,
    command: Vec<String>,
    memory: Option<String>,
    cpus: Option<String>,
    network: bool,
}

impl DockerBackend {
    pub fn from_config(config: &IsolationConfig) -> Self {
        Self {
            docker: config.docker.clone(),
            image: config.image.clone(),
            command: config.command.clone(),
            memory: config.memory.clone(),
            cpus: config.cpus.clone(),
            network: config.network,
        }
    }

    /// Arguments for `docker create` over the given staging directory.
    pub fn create_args(&self, staging: &StagingLayout) -> Vec<String> {
        let mut args = vec!["create".to_string()];
        if !self.network {
            args.extend(["--network".to_string(), "none".to_string()]);
        }
        if let Some(memory) = &self.memory {
            args.extend(["--memory".to_string(), memory.clone()]);
        }
        if let Some(cpus) = &self.cpus {
            args.extend(["--cpus".to_string(), cpus.clone()]);
        }
        args.extend([
            "-e".to_string(),
            format!("{IN_CONTAINER_ENV}=1"),
            "-v".to_string(),
            format!(
                "{}:{CONTAINER_STAGING_DIR}/{INPUT_DIR}:ro",
                staging.input_dir().display()
            ),
            "-v".to_string(),
            format!(
                "{}:{CONTAINER_STAGING_DIR}/{OUTPUT_DIR}",
                staging.output_dir().display()
            ),
            self.image.clone(),
        ]);
        args.extend(self.command.iter().cloned());
        args
    }

    /// Run one docker CLI command to completion; non-zero exit is an error.
    async fn docker(&self, args: &[String]) -> Result<String> {
        debug!(docker = %self.docker, ?args, "running docker command");
        let output = Command::new(&self.docker)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                FeaturedagError::IsolatedExecution(format!("failed to run '{}': {e}", self.docker))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FeaturedagError::IsolatedExecution(format!(
                "'{} {}' failed: {}",
                self.docker,
                args.first().map(String::as_str).unwrap_or_default(),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl IsolationBackend for DockerBackend {
    fn name(&self) -> &str {
        "docker"
    }

    fn is_available(&self) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            let args = [
                "image".to_string(),
                "inspect".to_string(),
                self.image.clone(),
            ];
            match self.docker(&args).await {
                Ok(_) => Ok(true),
                Err(err) => {
                    debug!(image = %self.image, error = %err, "docker image not available");
                    Ok(false)
                }
            }
        })
    }

    fn create(&self, staging: &StagingLayout) -> BackendFuture<'_, InstanceId> {
        let args = self.create_args(staging);
        Box::pin(async move {
            let id = InstanceId(self.docker(&args).await?);
            if id.0.is_empty() {
                return Err(FeaturedagError::IsolatedExecution(
                    "docker create returned no container id".to_string(),
                ));
            }
            debug!(container = %id, image = %self.image, "container created");
            Ok(id)
        })
    }

    fn start(&self, id: &InstanceId) -> BackendFuture<'_, ()> {
        let id = id.clone();
        Box::pin(async move {
            self.docker(&["start".to_string(), id.0.clone()]).await?;
            info!(container = %id, image = %self.image, "container started");
            Ok(())
        })
    }

    fn wait(&self, id: &InstanceId) -> BackendFuture<'_, InstanceExit> {
        let id = id.clone();
        Box::pin(async move {
            let code_text = self.docker(&["wait".to_string(), id.0.clone()]).await?;
            let code = code_text.parse::<i64>().map_err(|_| {
                FeaturedagError::IsolatedExecution(format!(
                    "unexpected 'docker wait' output: {code_text:?}"
                ))
            })?;

            let logs = Command::new(&self.docker)
                .args(["logs", &id.0])
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await;
            let (stdout, stderr) = match logs {
                Ok(out) => (
                    String::from_utf8_lossy(&out.stdout).into_owned(),
                    String::from_utf8_lossy(&out.stderr).into_owned(),
                ),
                Err(e) => {
                    warn!(container = %id, error = %e, "could not collect container logs");
                    (String::new(), String::new())
                }
            };

            Ok(InstanceExit {
                code,
                stdout,
                stderr,
            })
        })
    }

    fn remove(&self, id: &InstanceId) -> BackendFuture<'_, ()> {
        let id = id.clone();
        Box::pin(async move {
            self.docker(&["rm".to_string(), "-f".to_string(), id.0.clone()])
                .await?;
            debug!(container = %id, "container removed");
            Ok(())
        })
    }

    fn remove_detached(&self, id: &InstanceId) {
        let spawned = std::process::Command::new(&self.docker)
            .args(["rm", "-f", &id.0])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            warn!(container = %id, error = %e, "failed to remove abandoned container");
        }
    }
}
