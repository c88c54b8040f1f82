// src/errors.rs

//! Crate-wide error type, error classification and result alias.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A unit left in the pending set when a scheduling round made no progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalledUnit {
    pub name: String,
    /// Required names that were still absent from the known values.
    pub unresolved: Vec<String>,
}

impl fmt::Display for StalledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (waiting on {})", self.name, self.unresolved.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum FeaturedagError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unresolvable required names: {}", .names.join(", "))]
    UnresolvableDependency { names: Vec<String> },

    #[error(
        "scheduling stalled with {} unit(s) pending: {}",
        .stalled.len(),
        join_stalled(.stalled)
    )]
    SchedulingStall { stalled: Vec<StalledUnit> },

    #[error("unit '{unit}': required arg '{parameter}' not provided in function call")]
    MissingRequiredParameter { unit: String, parameter: String },

    #[error("unit '{unit}': key '{key}' not present in function return value")]
    MissingRequiredReturnKey { unit: String, key: String },

    #[error("unit '{unit}' failed: {message}")]
    UnitFailed { unit: String, message: String },

    #[error("isolated execution failed: {0}")]
    IsolatedExecution(String),

    /// An error reported from inside an isolated environment, with its
    /// original classification.
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_stalled(stalled: &[StalledUnit]) -> String {
    stalled
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serializable classification of a [`FeaturedagError`].
///
/// This is what crosses process boundaries (container result files, job
/// outcomes); the message travels alongside it as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    UnresolvableDependency,
    SchedulingStall,
    MissingRequiredParameter,
    MissingRequiredReturnKey,
    UnitFailed,
    IsolatedExecution,
    Config,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::UnresolvableDependency => "UnresolvableDependencyError",
            ErrorKind::SchedulingStall => "SchedulingStallError",
            ErrorKind::MissingRequiredParameter => "MissingRequiredParameterError",
            ErrorKind::MissingRequiredReturnKey => "MissingRequiredReturnKeyError",
            ErrorKind::UnitFailed => "UnitFailedError",
            ErrorKind::IsolatedExecution => "IsolatedExecutionError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
            ErrorKind::Other => "Error",
        };
        f.write_str(s)
    }
}

impl FeaturedagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeaturedagError::Parse { .. } => ErrorKind::Parse,
            FeaturedagError::UnresolvableDependency { .. } => ErrorKind::UnresolvableDependency,
            FeaturedagError::SchedulingStall { .. } => ErrorKind::SchedulingStall,
            FeaturedagError::MissingRequiredParameter { .. } => ErrorKind::MissingRequiredParameter,
            FeaturedagError::MissingRequiredReturnKey { .. } => ErrorKind::MissingRequiredReturnKey,
            FeaturedagError::UnitFailed { .. } => ErrorKind::UnitFailed,
            FeaturedagError::IsolatedExecution(_) => ErrorKind::IsolatedExecution,
            FeaturedagError::Remote { kind, .. } => *kind,
            FeaturedagError::ConfigError(_) | FeaturedagError::TomlError(_) => ErrorKind::Config,
            FeaturedagError::IoError(_) => ErrorKind::Io,
            FeaturedagError::JsonError(_) | FeaturedagError::Other(_) => ErrorKind::Other,
        }
    }

    /// "Kind: message" rendering used when surfacing errors to script authors.
    pub fn report(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FeaturedagError>;
