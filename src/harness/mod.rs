// src/harness/mod.rs

//! Admission check for new feature scripts.
//!
//! A script is accepted only if it runs cleanly against the canonical sample
//! in [`sample`], on whichever path the execution policy selects. There is
//! no partial credit: the first error is returned as-is.

pub mod sample;

use std::path::Path;

use tracing::{info, warn};

use crate::dag::ExecutionResult;
use crate::engine::ScriptRunner;
use crate::errors::Result;

pub use sample::canonical_known_values;

#[derive(Debug, Clone)]
pub struct ValidationHarness {
    runner: ScriptRunner,
}

impl ValidationHarness {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }

    /// Run `script` against the canonical sample.
    pub async fn verify(&self, script: &Path) -> Result<ExecutionResult> {
        info!(script = ?script, "verifying feature script");
        match self.runner.run(script, canonical_known_values()).await {
            Ok(result) => {
                info!(
                    script = ?script,
                    computed = result.computed.len(),
                    rounds = result.rounds.len(),
                    "feature script verified"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(script = ?script, error = %err.report(), "feature script rejected");
                Err(err)
            }
        }
    }
}
