// src/isolate/entry.rs

//! Isolated side of a run (`featuredag run-staged`).

use std::fs;
use std::path::Path;

use tracing::{error, info};

use crate::dag::{ExecutionResult, KnownValues};
use crate::engine::pipeline::{run_source, RunOptions};
use crate::errors::Result;
use crate::exec::ScriptLoader;
use crate::isolate::outcome::StagedOutcome;
use crate::isolate::staging::StagingLayout;

/// Run the staged script against the staged known values and write
/// `output/result.json`.
///
/// Every failure of the run itself becomes an error outcome in the result
/// file; only failing to write that file is returned as an error.
pub async fn run_staged(staging_dir: &Path, loader: &dyn ScriptLoader) -> Result<StagedOutcome> {
    let layout = StagingLayout::new(staging_dir);
    let result = execute(&layout, loader).await;
    if let Err(err) = &result {
        error!(error = %err, "staged run failed");
    }

    let outcome = StagedOutcome::from_result(result);
    fs::write(layout.result_path(), serde_json::to_vec(&outcome)?)?;
    info!(result = ?layout.result_path(), "wrote staged outcome");
    Ok(outcome)
}

async fn execute(layout: &StagingLayout, loader: &dyn ScriptLoader) -> Result<ExecutionResult> {
    let script = layout.script_path();
    let source = fs::read_to_string(&script)?;
    let known: KnownValues = serde_json::from_slice(&fs::read(layout.known_values_path())?)?;
    run_source(&source, &script, known, loader, RunOptions::default()).await
}
