// src/exec/unit.rs

//! Executable feature units and the name -> unit registry.
//!
//! A unit is just "a named callable": the dependency contract lives in the
//! [`crate::dag::UnitDeclaration`], and the scheduler looks units up here by
//! name.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::FeatureValue;

/// Arguments assembled for one call: required name -> value.
pub type Arguments = BTreeMap<String, FeatureValue>;

/// Mapping returned by a unit.
pub type Outputs = BTreeMap<String, FeatureValue>;

pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Outputs>> + Send + 'a>>;

/// Trait abstracting how a single unit is invoked.
///
/// In-process Rust closures use [`FnUnit`]; script functions run through an
/// interpreter process (see [`crate::exec::interpreter`]).
pub trait FeatureUnit: Send + Sync {
    fn call(&self, args: Arguments) -> UnitFuture<'_>;
}

/// Adapter for plain synchronous closures.
pub struct FnUnit<F> {
    f: F,
}

impl<F> FnUnit<F>
where
    F: Fn(&Arguments) -> anyhow::Result<Outputs> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FeatureUnit for FnUnit<F>
where
    F: Fn(&Arguments) -> anyhow::Result<Outputs> + Send + Sync,
{
    fn call(&self, args: Arguments) -> UnitFuture<'_> {
        let result = (self.f)(&args);
        Box::pin(std::future::ready(result))
    }
}

/// Name -> callable lookup produced by a [`crate::exec::ScriptLoader`].
#[derive(Clone, Default)]
pub struct UnitRegistry {
    units: HashMap<String, Arc<dyn FeatureUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, unit: Arc<dyn FeatureUnit>) {
        self.units.insert(name.into(), unit);
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Arguments) -> anyhow::Result<Outputs> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnUnit::new(f)));
    }

    pub fn get(&self, name: &str) -> Option<&dyn FeatureUnit> {
        self.units.get(name).map(|u| u.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Add every unit of `other`, keeping existing entries on name clashes.
    pub fn extend(&mut self, other: &UnitRegistry) {
        for (name, unit) in &other.units {
            self.units
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(unit));
        }
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.units.keys().collect();
        names.sort();
        f.debug_struct("UnitRegistry").field("units", &names).finish()
    }
}
