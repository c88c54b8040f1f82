// src/dag/state_manager.rs

//! Per-run state for the wave scheduler.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::result::ExecutionResult;
use crate::dag::{DeclarationTable, KnownValues, UnitDeclaration, UnitName};
use crate::errors::StalledUnit;
use crate::exec::unit::{Arguments, Outputs};

/// Mutable state of one scheduling run.
///
/// Owns the run's known values and pending set; nothing here is shared
/// between runs.
#[derive(Debug)]
pub struct StateManager<'a> {
    table: &'a DeclarationTable,
    known: KnownValues,
    pending: BTreeSet<UnitName>,
    computed: BTreeSet<String>,
    rounds: Vec<Vec<UnitName>>,
}

impl<'a> StateManager<'a> {
    pub fn new(table: &'a DeclarationTable, known: KnownValues) -> Self {
        Self {
            table,
            known,
            pending: table.unit_names().map(str::to_string).collect(),
            computed: BTreeSet::new(),
            rounds: Vec::new(),
        }
    }

    pub fn known(&self) -> &KnownValues {
        &self.known
    }

    pub fn pending(&self) -> &BTreeSet<UnitName> {
        &self.pending
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds.len()
    }

    pub fn all_units_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending units whose requirements are all currently known, in name
    /// order.
    ///
    /// Callers take this snapshot before executing anything in a round, so
    /// outputs written during the round (including a unit's own outputs)
    /// cannot make another unit runnable in the same round.
    pub fn collect_runnable(&self) -> Vec<&'a UnitDeclaration> {
        self.pending
            .iter()
            .filter_map(|name| self.table.get(name))
            .filter(|decl| decl.requires.iter().all(|r| self.known.contains(r)))
            .collect()
    }

    /// Arguments for a call: every required name that is currently known.
    pub fn arguments_for(&self, decl: &UnitDeclaration) -> Arguments {
        decl.requires
            .iter()
            .filter_map(|r| self.known.get(r).map(|v| (r.clone(), v.clone())))
            .collect()
    }

    /// Merge a unit's outputs (first writer wins) and drop it from the
    /// pending set. Returns the names that were newly written.
    pub fn record_outputs(&mut self, decl: &UnitDeclaration, outputs: Outputs) -> Vec<String> {
        let mut written = Vec::new();

        for (name, value) in outputs {
            if self.known.insert_if_absent(name.clone(), value) {
                self.computed.insert(name.clone());
                written.push(name);
            } else {
                debug!(
                    unit = %decl.name,
                    name = %name,
                    "name already known; keeping existing value"
                );
            }
        }

        self.pending.remove(&decl.name);
        written
    }

    pub fn close_round(&mut self, executed: Vec<UnitName>) {
        self.rounds.push(executed);
    }

    /// Remaining units with the required names they are still waiting on.
    pub fn stalled_units(&self) -> Vec<StalledUnit> {
        self.pending
            .iter()
            .filter_map(|name| self.table.get(name))
            .map(|decl| StalledUnit {
                name: decl.name.clone(),
                unresolved: decl
                    .requires
                    .iter()
                    .filter(|r| !self.known.contains(r))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    pub fn into_result(self) -> ExecutionResult {
        ExecutionResult {
            values: self.known,
            computed: self.computed,
            rounds: self.rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::FeatureValue;

    #[test]
    fn own_outputs_do_not_satisfy_a_unit() {
        let table = DeclarationTable::from_declarations(vec![UnitDeclaration::new(
            "self_ref",
            ["x"],
            ["x"],
        )])
        .unwrap();
        let state = StateManager::new(&table, KnownValues::new());
        assert!(state.collect_runnable().is_empty());

        let stalled = state.stalled_units();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].unresolved, vec!["x".to_string()]);
    }

    #[test]
    fn record_outputs_respects_existing_values() {
        let decl = UnitDeclaration::new("a", Vec::<String>::new(), ["x", "y"]);
        let table = DeclarationTable::from_declarations(vec![decl.clone()]).unwrap();
        let mut state = StateManager::new(&table, KnownValues::new().with("x", 5.0));

        let outputs: Outputs = [
            ("x".to_string(), FeatureValue::Scalar(1.0)),
            ("y".to_string(), FeatureValue::Scalar(2.0)),
        ]
        .into_iter()
        .collect();

        let written = state.record_outputs(&decl, outputs);
        assert_eq!(written, vec!["y".to_string()]);
        assert!(state.all_units_done());
        assert_eq!(state.known().get("x"), Some(&FeatureValue::Scalar(5.0)));
    }
}
