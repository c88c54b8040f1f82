// src/exec/loader.rs

//! Pluggable script loading.
//!
//! Turning a script into callables is the one dynamic-loading step in the
//! system; everything else works with a [`UnitRegistry`]. Production code uses
//! [`crate::exec::InterpreterLoader`]; tests and built-in units use
//! [`StaticLoader`].

use std::path::Path;

use crate::dag::DeclarationTable;
use crate::errors::Result;
use crate::exec::unit::UnitRegistry;

/// Trait abstracting how a script's declared units become callables.
pub trait ScriptLoader: Send + Sync {
    /// Load the script at `script` and return a callable for each declared
    /// unit in `table`.
    fn load(&self, script: &Path, table: &DeclarationTable) -> Result<UnitRegistry>;
}

/// Loader that ignores the script and hands out a fixed registry.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    registry: UnitRegistry,
}

impl StaticLoader {
    pub fn new(registry: UnitRegistry) -> Self {
        Self { registry }
    }
}

impl ScriptLoader for StaticLoader {
    fn load(&self, _script: &Path, _table: &DeclarationTable) -> Result<UnitRegistry> {
        Ok(self.registry.clone())
    }
}
