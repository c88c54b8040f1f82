// src/dag/mod.rs

//! Declarations, dependency checks and wave scheduling.
//!
//! - [`declaration`] holds unit declarations and the per-script table.
//! - [`known`] holds feature values and the per-run known-values mapping.
//! - [`validate`] is the up-front resolvability check.
//! - [`scheduler`] runs units in rounds; [`state_manager`] owns per-run state.
//! - [`scheduler_step`] and [`result`] are the step and final result types.
//! - [`graph`] builds a producer/consumer graph for pruning and diagnostics.

pub mod declaration;
pub mod graph;
pub mod known;
pub mod result;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod validate;

pub use declaration::{DeclarationTable, UnitDeclaration, UnitName};
pub use graph::{prune_for, UnitGraph};
pub use known::{FeatureValue, KnownValues};
pub use result::ExecutionResult;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use validate::{unresolvable_names, validate_dependencies};
