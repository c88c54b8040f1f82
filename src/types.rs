use std::str::FromStr;
use serde::Deserialize;

/// Which execution path a script run should take.
///
/// - `Auto`: use isolated execution when the host supports it, otherwise
///   apply [`WhenUnavailable`].
/// - `InProcess`: always run the script on the host.
/// - `Isolated`: always run inside a container; fail if that is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Auto,
    InProcess,
    Isolated,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Auto
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(ExecutionMode::Auto),
            "in_process" => Ok(ExecutionMode::InProcess),
            "isolated" => Ok(ExecutionMode::Isolated),
            other => Err(format!(
                "invalid execution mode: {other} \
                 (expected \"auto\", \"in_process\" or \"isolated\")"
            )),
        }
    }
}

/// What `ExecutionMode::Auto` does when no isolated environment is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhenUnavailable {
    /// Refuse to run the script.
    Reject,
    /// Run the script on the host, with a warning.
    InProcess,
}

impl Default for WhenUnavailable {
    fn default() -> Self {
        WhenUnavailable::Reject
    }
}

/// Which names an execution result should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultScope {
    /// Everything in the final known values.
    #[default]
    Full,
    /// Only names written by executed units.
    Computed,
}
