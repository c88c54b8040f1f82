// src/dag/declaration.rs

//! Unit declarations and the per-script declaration table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{FeaturedagError, Result};

/// Canonical unit name type.
pub type UnitName = String;

/// The dependency contract of one feature unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDeclaration {
    pub name: UnitName,
    /// Names that must be known before the unit can run.
    pub requires: BTreeSet<String>,
    /// Names the unit's return value must contain.
    pub provides: BTreeSet<String>,
}

impl UnitDeclaration {
    pub fn new<R, P>(name: impl Into<String>, requires: R, provides: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            name: name.into(),
            requires: requires.into_iter().map(Into::into).collect(),
            provides: provides.into_iter().map(Into::into).collect(),
        }
    }
}

/// All unit declarations of one script, keyed by unit name.
///
/// Built once and read-only afterwards; `all_required` / `all_provided` are
/// derived at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationTable {
    units: BTreeMap<UnitName, UnitDeclaration>,
    all_required: BTreeSet<String>,
    all_provided: BTreeSet<String>,
}

impl DeclarationTable {
    /// Build a table, rejecting duplicate unit names.
    ///
    /// Declarations built without a source have no line to point at, so a
    /// duplicate is reported as a parse error at line 0.
    pub fn from_declarations(decls: impl IntoIterator<Item = UnitDeclaration>) -> Result<Self> {
        let mut units = BTreeMap::new();
        let mut all_required = BTreeSet::new();
        let mut all_provided = BTreeSet::new();

        for decl in decls {
            if units.contains_key(&decl.name) {
                return Err(FeaturedagError::Parse {
                    line: 0,
                    message: format!("duplicate unit declaration '{}'", decl.name),
                });
            }
            all_required.extend(decl.requires.iter().cloned());
            all_provided.extend(decl.provides.iter().cloned());
            units.insert(decl.name.clone(), decl);
        }

        Ok(Self {
            units,
            all_required,
            all_provided,
        })
    }

    pub fn get(&self, name: &str) -> Option<&UnitDeclaration> {
        self.units.get(name)
    }

    /// Declarations in name order.
    pub fn units(&self) -> impl Iterator<Item = &UnitDeclaration> {
        self.units.values()
    }

    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn all_required(&self) -> &BTreeSet<String> {
        &self.all_required
    }

    pub fn all_provided(&self) -> &BTreeSet<String> {
        &self.all_provided
    }

    /// Units whose `provides` contains `name`.
    pub fn providers_of<'s>(&'s self, name: &str) -> impl Iterator<Item = &'s UnitDeclaration> {
        self.units.values().filter(move |d| d.provides.contains(name))
    }

    /// Required names that no unit in this table provides.
    pub fn external_requirements(&self) -> BTreeSet<String> {
        self.all_required
            .difference(&self.all_provided)
            .cloned()
            .collect()
    }

    /// Sub-table containing only the named units.
    pub fn subset<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let keep: BTreeSet<&str> = names.into_iter().collect();
        let decls = self
            .units
            .values()
            .filter(|d| keep.contains(d.name.as_str()))
            .cloned();
        // A subset of a valid table cannot contain duplicates.
        Self::from_declarations(decls).unwrap_or_default()
    }
}
