// src/engine/featurize.rs

//! Computing a requested set of features from built-ins and an optional
//! custom script.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dag::{prune_for, validate_dependencies, KnownValues, Scheduler};
use crate::errors::{FeaturedagError, Result};
use crate::exec::BuiltinLibrary;
use crate::script::extract_from_path;
use crate::types::ResultScope;

use super::pipeline::ScriptRunner;

/// One featurization request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturizeRequest {
    /// Inputs: at least `t` and `m`, optionally `e` and meta-features.
    pub known: KnownValues,
    /// Exactly the names to return.
    pub features_to_use: Vec<String>,
    /// Custom feature script run after the built-ins.
    #[serde(default)]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Featurizer {
    builtins: BuiltinLibrary,
    scripts: ScriptRunner,
}

impl Featurizer {
    pub fn new(builtins: BuiltinLibrary, scripts: ScriptRunner) -> Self {
        Self { builtins, scripts }
    }

    pub fn builtins(&self) -> &BuiltinLibrary {
        &self.builtins
    }

    /// Compute `request.features_to_use`.
    ///
    /// Only the built-ins needed for the requested names (and for the custom
    /// script's inputs) run. The custom script then sees the inputs plus every
    /// built-in output. Input values always win over computed ones.
    pub async fn featurize(&self, request: FeaturizeRequest) -> Result<KnownValues> {
        let FeaturizeRequest {
            known,
            features_to_use,
            script,
        } = request;
        let requested: BTreeSet<String> = features_to_use.into_iter().collect();
        let known_names = known.names();

        let custom = match &script {
            Some(path) => Some(extract_from_path(self.scripts.fs(), path)?),
            None => None,
        };

        let unproducible: Vec<String> = requested
            .iter()
            .filter(|name| {
                !known_names.contains(*name)
                    && !self.builtins.table().all_provided().contains(*name)
                    && !custom
                        .as_ref()
                        .is_some_and(|t| t.all_provided().contains(*name))
            })
            .cloned()
            .collect();
        if !unproducible.is_empty() {
            return Err(FeaturedagError::UnresolvableDependency {
                names: unproducible,
            });
        }

        let mut targets = requested.clone();
        if let Some(table) = &custom {
            targets.extend(table.external_requirements());
        }
        let pruned = prune_for(self.builtins.table(), &targets, &known_names);
        validate_dependencies(&pruned, &known_names)?;
        debug!(
            units = ?pruned.unit_names().collect::<Vec<_>>(),
            "selected built-in units"
        );

        let mut values = Scheduler::new(&pruned)
            .run(self.builtins.registry(), known, ResultScope::Full)
            .await?
            .values;

        if let Some(path) = &script {
            let custom_result = self.scripts.run(path, values.clone()).await?;
            for (name, value) in custom_result.values.into_inner() {
                values.insert_if_absent(name, value);
            }
        }

        info!(features = requested.len(), "featurization complete");
        Ok(values.restricted_to(&requested))
    }
}
