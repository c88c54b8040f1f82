// src/isolate/mod.rs

//! Isolated execution of untrusted scripts.
//!
//! - [`staging`] owns the on-disk staging layout and its lifetime.
//! - [`backend`] provides the `IsolationBackend` trait; [`docker`] is the
//!   production implementation.
//! - [`runner`] drives a host-side run through staging, execution, result
//!   collection and cleanup.
//! - [`entry`] is what runs on the isolated side.
//! - [`outcome`] is the result file format both sides share.

pub mod backend;
pub mod docker;
pub mod entry;
pub mod outcome;
pub mod runner;
pub mod staging;

pub use backend::{BackendFuture, InstanceExit, InstanceId, IsolationBackend};
pub use docker::DockerBackend;
pub use entry::run_staged;
pub use outcome::StagedOutcome;
pub use runner::{IsolatedRunner, RunPhase};
pub use staging::{StagingDir, StagingLayout};
