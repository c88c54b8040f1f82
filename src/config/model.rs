// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExecutionMode, WhenUnavailable};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [execution]
/// mode = "auto"
/// when_unavailable = "reject"
/// timeout = "300s"
///
/// [isolation]
/// image = "featuredag/base"
/// memory = "512m"
///
/// [interpreter]
/// program = "python3"
/// ```
///
/// All sections are optional and have reasonable defaults. Durations are
/// still strings here; [`ConfigFile`] is the validated form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub execution: RawExecutionSection,

    #[serde(default)]
    pub isolation: IsolationConfig,

    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawExecutionSection {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// What `mode = "auto"` does when isolation is unavailable.
    #[serde(default)]
    pub when_unavailable: WhenUnavailable,

    /// Upper bound on one isolated run, e.g. `"300s"`, `"5m"`, `"1500ms"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,
}

fn default_timeout() -> String {
    "300s".to_string()
}

impl Default for RawExecutionSection {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            when_unavailable: WhenUnavailable::default(),
            timeout: default_timeout(),
        }
    }
}

/// `[isolation]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsolationConfig {
    /// Docker CLI executable.
    #[serde(default = "default_docker")]
    pub docker: String,

    #[serde(default = "default_image")]
    pub image: String,

    /// Command run inside the container; must end up calling `run-staged`.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Parent directory for staging directories; system temp dir if unset.
    #[serde(default)]
    pub staging_root: Option<PathBuf>,

    #[serde(default = "default_memory")]
    pub memory: Option<String>,

    #[serde(default)]
    pub cpus: Option<String>,

    /// Give the container network access.
    #[serde(default)]
    pub network: bool,
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_image() -> String {
    "featuredag/base".to_string()
}

fn default_command() -> Vec<String> {
    ["featuredag", "run-staged", "--staging-dir", "/staging"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_memory() -> Option<String> {
    Some("512m".to_string())
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            image: default_image(),
            command: default_command(),
            staging_root: None,
            memory: default_memory(),
            cpus: None,
            network: false,
        }
    }
}

/// `[interpreter]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterpreterConfig {
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_program() -> String {
    "python3".to_string()
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
        }
    }
}

/// Validated `[execution]` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    pub when_unavailable: WhenUnavailable,
    pub timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            when_unavailable: WhenUnavailable::default(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub execution: ExecutionConfig,
    pub isolation: IsolationConfig,
    pub interpreter: InterpreterConfig,
}

impl ConfigFile {
    /// Assemble without validation; callers must have validated the parts.
    pub(crate) fn new_unchecked(
        execution: ExecutionConfig,
        isolation: IsolationConfig,
        interpreter: InterpreterConfig,
    ) -> Self {
        Self {
            execution,
            isolation,
            interpreter,
        }
    }
}
