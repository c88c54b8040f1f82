// src/job.rs

//! Queue-facing job boundary.
//!
//! A job is self-contained (inputs, requested names, optional script) and
//! always yields a [`JobOutcome`]; errors become failed outcomes rather than
//! propagating to the caller.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::dag::KnownValues;
use crate::engine::{FeaturizeRequest, Featurizer};
use crate::errors::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturizeJob {
    /// Caller's name for the job, echoed in the outcome (e.g. a file name).
    pub label: String,
    pub known: KnownValues,
    pub features_to_use: Vec<String>,
    #[serde(default)]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Completed { features: KnownValues },
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub label: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, JobStatus::Completed { .. })
    }
}

/// Run one job to an outcome.
pub async fn run_job(featurizer: &Featurizer, job: FeaturizeJob) -> JobOutcome {
    let FeaturizeJob {
        label,
        known,
        features_to_use,
        script,
    } = job;

    let request = FeaturizeRequest {
        known,
        features_to_use,
        script,
    };

    let status = match featurizer.featurize(request).await {
        Ok(features) => {
            info!(job = %label, features = features.len(), "job completed");
            JobStatus::Completed { features }
        }
        Err(err) => {
            warn!(job = %label, error = %err.report(), "job failed");
            JobStatus::Failed {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    };

    JobOutcome { label, status }
}

/// Run jobs concurrently, at most `limit` at a time. Outcomes come back in
/// input order.
pub async fn run_jobs(
    featurizer: Arc<Featurizer>,
    jobs: Vec<FeaturizeJob>,
    limit: usize,
) -> Vec<JobOutcome> {
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs {
        let permit = semaphore.clone().acquire_owned().await;
        let featurizer = Arc::clone(&featurizer);
        let label = job.label.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            run_job(&featurizer, job).await
        });
        handles.push((label, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (label, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => outcomes.push(JobOutcome {
                label,
                status: JobStatus::Failed {
                    kind: ErrorKind::Other,
                    message: format!("job task panicked: {e}"),
                },
            }),
        }
    }

    outcomes
}
