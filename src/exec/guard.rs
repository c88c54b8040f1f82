// src/exec/guard.rs

//! Contract checks around a single unit invocation.

use tracing::{debug, trace};

use crate::dag::UnitDeclaration;
use crate::errors::{FeaturedagError, Result};
use crate::exec::unit::{Arguments, FeatureUnit, Outputs};

/// Invoke `unit` exactly once, enforcing its declared contract.
///
/// - every `requires` name must be among `args`
///   (`MissingRequiredParameter` otherwise, and the unit is not called);
/// - the returned mapping must contain every `provides` name
///   (`MissingRequiredReturnKey` otherwise).
///
/// On success only the declared outputs are returned; undeclared keys are
/// dropped. On failure nothing is returned, so callers cannot merge partial
/// output.
pub async fn invoke_guarded(
    decl: &UnitDeclaration,
    unit: &dyn FeatureUnit,
    args: Arguments,
) -> Result<Outputs> {
    if let Some(missing) = decl.requires.iter().find(|r| !args.contains_key(*r)) {
        return Err(FeaturedagError::MissingRequiredParameter {
            unit: decl.name.clone(),
            parameter: missing.clone(),
        });
    }

    trace!(unit = %decl.name, args = args.len(), "invoking unit");
    let mut returned = unit
        .call(args)
        .await
        .map_err(|e| FeaturedagError::UnitFailed {
            unit: decl.name.clone(),
            message: format!("{e:#}"),
        })?;

    if let Some(missing) = decl.provides.iter().find(|p| !returned.contains_key(*p)) {
        return Err(FeaturedagError::MissingRequiredReturnKey {
            unit: decl.name.clone(),
            key: missing.clone(),
        });
    }

    let undeclared: Vec<String> = returned
        .keys()
        .filter(|k| !decl.provides.contains(*k))
        .cloned()
        .collect();
    if !undeclared.is_empty() {
        debug!(unit = %decl.name, ?undeclared, "dropping undeclared return keys");
        returned.retain(|k, _| decl.provides.contains(k));
    }

    Ok(returned)
}
