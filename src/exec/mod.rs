// src/exec/mod.rs

//! Unit execution layer.
//!
//! Everything that turns a declared unit into a call lives here. The
//! scheduler only sees a [`UnitRegistry`] and goes through
//! [`invoke_guarded`] for every call.
//!
//! - [`unit`] defines the [`FeatureUnit`] trait and the name -> unit registry.
//! - [`guard`] checks a call's arguments and return value against the
//!   unit's declaration.
//! - [`loader`] provides the [`ScriptLoader`] seam; [`interpreter`] is the
//!   production loader that runs script functions in an interpreter process.
//! - [`builtin`] holds the built-in feature units.

pub mod builtin;
pub mod guard;
pub mod interpreter;
pub mod loader;
pub mod unit;

pub use builtin::BuiltinLibrary;
pub use guard::invoke_guarded;
pub use interpreter::{InterpreterLoader, InterpreterUnit};
pub use loader::{ScriptLoader, StaticLoader};
pub use unit::{Arguments, FeatureUnit, FnUnit, Outputs, UnitFuture, UnitRegistry};
