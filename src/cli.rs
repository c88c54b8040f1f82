// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::ExecutionMode;

/// Command-line arguments for `featuredag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "featuredag",
    version,
    about = "Extract, validate and run dependency-annotated feature scripts.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Featuredag.toml` in the current working directory if it
    /// exists, built-in defaults otherwise.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FEATUREDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the units a script declares, without running anything.
    Extract {
        script: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print the unit dependency graph in Graphviz dot format instead.
        #[arg(long)]
        dot: bool,
    },

    /// Run a script against known values and print the result as JSON.
    Run {
        script: PathBuf,

        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        exec: ExecArgs,

        /// Skip the up-front resolvability check.
        #[arg(long)]
        no_validate: bool,

        /// Only print values computed by units.
        #[arg(long)]
        computed_only: bool,
    },

    /// Compute selected built-in and custom features for one time series.
    Featurize {
        #[command(flatten)]
        inputs: InputArgs,

        #[command(flatten)]
        exec: ExecArgs,

        /// Feature names to compute (comma separated or repeated).
        #[arg(long, short = 'f', value_delimiter = ',', required = true)]
        features: Vec<String>,

        /// Custom feature script.
        #[arg(long, value_name = "PATH")]
        script: Option<PathBuf>,

        /// Write the features here instead of stdout.
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Admission check: run a script against the canonical sample data.
    Verify {
        script: PathBuf,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Isolated-side entry point: run a staged script and write its outcome.
    #[command(hide = true)]
    RunStaged {
        #[arg(long, value_name = "DIR")]
        staging_dir: PathBuf,
    },
}

/// Where a run's known values come from.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// JSON object of known values (name -> number or array of numbers).
    #[arg(long, value_name = "PATH")]
    pub known: Option<PathBuf>,

    /// Time-series text file providing `t`, `m` and optionally `e`.
    #[arg(long, value_name = "PATH")]
    pub series: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Override `[execution].mode` (auto, in_process, isolated).
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featurize_accepts_comma_separated_features() {
        let args = CliArgs::try_parse_from([
            "featuredag",
            "featurize",
            "--series",
            "lc.dat",
            "-f",
            "std,avg_mag",
            "--mode",
            "in-process",
        ])
        .unwrap();

        match args.command {
            Command::Featurize { features, exec, .. } => {
                assert_eq!(features, vec!["std", "avg_mag"]);
                assert_eq!(exec.mode, Some(ExecutionMode::InProcess));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "featuredag",
            "extract",
            "feats.py",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
