use tracing::{debug, info, warn};

use crate::dag::result::ExecutionResult;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::StateManager;
use crate::dag::{DeclarationTable, KnownValues};
use crate::errors::{FeaturedagError, Result};
use crate::exec::guard::invoke_guarded;
use crate::exec::unit::UnitRegistry;
use crate::types::ResultScope;

/// Wave scheduler: runs declared units in rounds against live known values.
///
/// Each round executes every pending unit whose requirements are all known
/// at the start of the round, merges their outputs, and repeats. A round
/// that executes nothing while units remain is a stall, which covers both
/// dependency cycles and producers that are genuinely missing.
///
/// Runnability is recomputed from the live state every round instead of
/// maintaining dependency counts; unit counts are small.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler<'a> {
    table: &'a DeclarationTable,
}

impl<'a> Scheduler<'a> {
    pub fn new(table: &'a DeclarationTable) -> Self {
        Self { table }
    }

    /// Begin a run over a fresh known-values snapshot.
    pub fn start(&self, known: KnownValues) -> StateManager<'a> {
        debug!(
            units = self.table.len(),
            known = known.len(),
            "scheduler: starting run"
        );
        StateManager::new(self.table, known)
    }

    /// Execute one round. Units within a round run sequentially, in name
    /// order.
    ///
    /// Returns `SchedulingStall` if nothing was runnable while units remain.
    pub async fn step_round(
        &self,
        state: &mut StateManager<'a>,
        units: &UnitRegistry,
    ) -> Result<SchedulerStep> {
        let round = state.rounds_completed() + 1;
        let runnable = state.collect_runnable();

        if runnable.is_empty() {
            if state.all_units_done() {
                return Ok(SchedulerStep {
                    round,
                    executed: Vec::new(),
                    newly_known: Vec::new(),
                    run_finished: true,
                });
            }
            let stalled = state.stalled_units();
            warn!(
                round,
                pending = stalled.len(),
                "scheduler: no runnable units; stalling"
            );
            return Err(FeaturedagError::SchedulingStall { stalled });
        }

        let mut executed = Vec::with_capacity(runnable.len());
        let mut newly_known = Vec::new();

        for decl in runnable {
            let unit = units
                .get(&decl.name)
                .ok_or_else(|| FeaturedagError::UnitFailed {
                    unit: decl.name.clone(),
                    message: "no callable loaded for this unit".to_string(),
                })?;

            let args = state.arguments_for(decl);
            debug!(unit = %decl.name, round, "executing unit");
            let outputs = invoke_guarded(decl, unit, args).await?;
            newly_known.extend(state.record_outputs(decl, outputs));
            executed.push(decl.name.clone());
        }

        info!(round, units = ?executed, "scheduler: round complete");
        state.close_round(executed.clone());

        Ok(SchedulerStep {
            round,
            executed,
            newly_known,
            run_finished: state.all_units_done(),
        })
    }

    /// Run rounds until every unit has executed or the run stalls.
    pub async fn run(
        &self,
        units: &UnitRegistry,
        known: KnownValues,
        scope: ResultScope,
    ) -> Result<ExecutionResult> {
        let mut state = self.start(known);

        while !state.all_units_done() {
            self.step_round(&mut state, units).await?;
        }

        let result = state.into_result();
        info!(
            rounds = result.rounds.len(),
            computed = result.computed.len(),
            "scheduler: run finished"
        );
        Ok(result.scoped(scope))
    }
}
