// src/isolate/outcome.rs

use serde::{Deserialize, Serialize};

use crate::dag::ExecutionResult;
use crate::errors::{ErrorKind, FeaturedagError, Result};

/// What the isolated side writes to `output/result.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StagedOutcome {
    Ok { result: ExecutionResult },
    Error { kind: ErrorKind, message: String },
}

impl StagedOutcome {
    pub fn from_result(result: Result<ExecutionResult>) -> Self {
        match result {
            Ok(result) => StagedOutcome::Ok { result },
            Err(err) => StagedOutcome::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    /// Back to a host-side result; error outcomes keep their original kind.
    pub fn into_result(self) -> Result<ExecutionResult> {
        match self {
            StagedOutcome::Ok { result } => Ok(result),
            StagedOutcome::Error { kind, message } => {
                Err(FeaturedagError::Remote { kind, message })
            }
        }
    }
}
