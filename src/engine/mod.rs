// src/engine/mod.rs

//! Orchestration for featuredag runs.
//!
//! This module ties together:
//! - the in-process pipeline (extract, validate, load, schedule)
//! - the execution policy deciding between in-process and isolated runs
//! - featurization over built-in units plus an optional custom script
//!
//! The pure pipeline lives in [`pipeline`]; [`policy`] is the only place
//! that looks at the environment.

pub mod featurize;
pub mod pipeline;
pub mod policy;

pub use featurize::{FeaturizeRequest, Featurizer};
pub use pipeline::{run_script, run_source, RunOptions, ScriptRunner};
pub use policy::{ExecutionPath, ExecutionPolicy, NO_DOCKER_ENV};
