// src/dag/scheduler_step.rs

//! Step-by-step result types for the wave scheduler.

use crate::dag::UnitName;

/// Structured result of a single scheduling round.
///
/// Useful for tests that want to step the scheduler manually and make
/// assertions about what ran when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStep {
    /// 1-based round number.
    pub round: usize,
    /// Units executed in this round, in execution order.
    pub executed: Vec<UnitName>,
    /// Names newly written to the known values by this round.
    pub newly_known: Vec<String>,
    /// Whether the pending set is empty after this round.
    pub run_finished: bool,
}
