// src/dag/result.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dag::{FeatureValue, KnownValues, UnitName};
use crate::types::ResultScope;

/// Outcome of a successful scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Final known values (caller inputs plus unit outputs, subject to scope).
    pub values: KnownValues,
    /// Names that were written by executed units.
    pub computed: BTreeSet<String>,
    /// Units executed per round; `rounds[0]` is round 1.
    pub rounds: Vec<Vec<UnitName>>,
}

impl ExecutionResult {
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    /// Only the values computed by units.
    pub fn computed_values(&self) -> KnownValues {
        self.values.restricted_to(&self.computed)
    }

    /// 1-based round in which `unit` executed.
    pub fn round_of(&self, unit: &str) -> Option<usize> {
        self.rounds
            .iter()
            .position(|round| round.iter().any(|u| u == unit))
            .map(|idx| idx + 1)
    }

    /// Apply a result scope.
    pub fn scoped(mut self, scope: ResultScope) -> Self {
        if scope == ResultScope::Computed {
            self.values = self.computed_values();
        }
        self
    }
}
