// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] defines the TOML-facing raw types and the validated
//!   [`ConfigFile`].
//! - [`validate`] implements `TryFrom<RawConfigFile> for ConfigFile`.
//! - [`loader`] reads files and applies the default-path fallback.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ExecutionConfig, InterpreterConfig, IsolationConfig, RawConfigFile,
    RawExecutionSection,
};
pub use validate::parse_duration;
