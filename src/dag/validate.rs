// src/dag/validate.rs

//! Up-front dependency resolution check.
//!
//! This only proves that *some* producer exists for every required name; it
//! does not prove that a consistent order exists. Cycles are detected by the
//! scheduler as a stall.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::DeclarationTable;
use crate::errors::{FeaturedagError, Result};

/// Names in `all_required` that are neither known nor provided by any unit.
pub fn unresolvable_names(table: &DeclarationTable, known: &BTreeSet<String>) -> Vec<String> {
    table
        .all_required()
        .iter()
        .filter(|name| !known.contains(*name) && !table.all_provided().contains(*name))
        .cloned()
        .collect()
}

/// Fail with every unresolvable name at once.
pub fn validate_dependencies(table: &DeclarationTable, known: &BTreeSet<String>) -> Result<()> {
    let names = unresolvable_names(table, known);
    if names.is_empty() {
        debug!(units = table.len(), "all required names resolvable");
        return Ok(());
    }
    Err(FeaturedagError::UnresolvableDependency { names })
}
