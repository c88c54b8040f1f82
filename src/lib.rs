// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod harness;
pub mod isolate;
pub mod job;
pub mod logging;
pub mod script;
pub mod timeseries;
pub mod types;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, ExecArgs, InputArgs, OutputFormat};
use crate::config::{load_or_default, ConfigFile};
use crate::dag::{DeclarationTable, KnownValues, UnitGraph};
use crate::engine::{FeaturizeRequest, Featurizer, RunOptions, ScriptRunner};
use crate::errors::FeaturedagError;
use crate::exec::{BuiltinLibrary, InterpreterLoader};
use crate::fs::{FileSystem, RealFileSystem};
use crate::harness::ValidationHarness;
use crate::isolate::{run_staged, StagedOutcome};
use crate::script::extract_from_path;
use crate::timeseries::read_time_series;
use crate::types::ResultScope;

/// High-level entry point used by `main.rs`.
///
/// Loads the configuration, then dispatches to the selected subcommand.
/// Results go to stdout as JSON; logs go to stderr.
pub async fn run(args: CliArgs) -> Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    debug!(?config, "configuration loaded");
    let fs = RealFileSystem;

    match args.command {
        Command::Extract { script, format, dot } => extract_command(&fs, &script, format, dot),
        Command::Run {
            script,
            inputs,
            exec,
            no_validate,
            computed_only,
        } => {
            let known = load_inputs(&fs, &inputs)?;
            let options = RunOptions {
                validate: !no_validate,
                scope: if computed_only {
                    ResultScope::Computed
                } else {
                    ResultScope::Full
                },
            };
            let runner =
                ScriptRunner::from_config(&with_exec_args(config, &exec)).with_options(options);
            let result = runner.run(&script, known).await.map_err(reported)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Command::Featurize {
            inputs,
            exec,
            features,
            script,
            output,
        } => {
            let known = load_inputs(&fs, &inputs)?;
            let runner = ScriptRunner::from_config(&with_exec_args(config, &exec));
            let featurizer = Featurizer::new(BuiltinLibrary::new()?, runner);
            let values = featurizer
                .featurize(FeaturizeRequest {
                    known,
                    features_to_use: features,
                    script,
                })
                .await
                .map_err(reported)?;

            let json = serde_json::to_string_pretty(&values)?;
            match output {
                Some(path) => {
                    fs.write(&path, json.as_bytes())?;
                    info!(path = ?path, features = values.len(), "features written");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
        Command::Verify { script, exec } => {
            let runner = ScriptRunner::from_config(&with_exec_args(config, &exec));
            let result = ValidationHarness::new(runner)
                .verify(&script)
                .await
                .map_err(reported)?;
            println!("{}", serde_json::to_string_pretty(&result.computed_values())?);
            Ok(())
        }
        Command::RunStaged { staging_dir } => {
            let loader = InterpreterLoader::new(config.interpreter.program.clone());
            match run_staged(&staging_dir, &loader).await? {
                StagedOutcome::Ok { result } => {
                    info!(computed = result.computed.len(), "staged run succeeded")
                }
                StagedOutcome::Error { kind, .. } => info!(%kind, "staged run reported an error"),
            }
            Ok(())
        }
    }
}

fn with_exec_args(mut config: ConfigFile, exec: &ExecArgs) -> ConfigFile {
    if let Some(mode) = exec.mode {
        config.execution.mode = mode;
    }
    config
}

/// Render an error as "Kind: message" for script authors.
fn reported(err: FeaturedagError) -> anyhow::Error {
    anyhow!(err.report())
}

/// Known values from `--known` and `--series`. Values from the JSON file win
/// over the same names read from the series.
fn load_inputs(fs: &dyn FileSystem, inputs: &InputArgs) -> Result<KnownValues> {
    let mut known = match &inputs.known {
        Some(path) => serde_json::from_str::<KnownValues>(&fs.read_to_string(path)?)?,
        None => KnownValues::new(),
    };

    if let Some(path) = &inputs.series {
        let series = read_time_series(fs, path)?;
        debug!(path = ?path, epochs = series.len(), "time series loaded");
        for (name, value) in series.into_known_values().into_inner() {
            known.insert_if_absent(name, value);
        }
    }

    Ok(known)
}

fn extract_command(
    fs: &dyn FileSystem,
    script: &Path,
    format: OutputFormat,
    dot: bool,
) -> Result<()> {
    let table = extract_from_path(fs, script).map_err(reported)?;

    if dot {
        let graph = UnitGraph::build(&table, &BTreeSet::new());
        println!("{}", graph.to_dot());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        OutputFormat::Text => print_table(&table),
    }
    Ok(())
}

fn print_table(table: &DeclarationTable) {
    println!("units ({}):", table.len());
    for unit in table.units() {
        println!("  - {}", unit.name);
        if !unit.requires.is_empty() {
            println!("      requires: {}", join(&unit.requires));
        }
        if !unit.provides.is_empty() {
            println!("      provides: {}", join(&unit.provides));
        }
    }

    let external = table.external_requirements();
    if !external.is_empty() {
        println!();
        println!("inputs needed: {}", join(&external));
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
