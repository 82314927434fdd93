//! Jobs, batches and measurement counts

use crate::{BackendError, Result};
use qproof_core::Circuit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Measurement counts: bitstring -> occurrences
pub type Counts = BTreeMap<String, u64>;

/// Job lifecycle: `QUEUED → RUNNING → {COMPLETED | FAILED | CANCELLED}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// No further transitions happen from this status
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Queued
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single circuit execution tracked by an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Provider-assigned identifier
    pub id: String,
    /// Experiment that owns this job, if known
    pub experiment_id: Option<String>,
    pub provider: String,
    pub backend: String,
    pub shots: u64,
    pub status: JobStatus,
    pub submitted_at: u64,
    pub completed_at: Option<u64>,
    /// Populated once `COMPLETED` and sanity-checked
    pub counts: Option<Counts>,
    pub error: Option<String>,
}

impl Job {
    pub(crate) fn queued(
        id: String,
        experiment_id: Option<String>,
        provider: &str,
        backend: &str,
        shots: u64,
    ) -> Self {
        Self {
            id,
            experiment_id,
            provider: provider.to_string(),
            backend: backend.to_string(),
            shots,
            status: JobStatus::Queued,
            submitted_at: now_unix(),
            completed_at: None,
            counts: None,
            error: None,
        }
    }

    pub(crate) fn finish(&mut self, status: JobStatus, counts: Option<Counts>, error: Option<String>) {
        self.status = status;
        self.counts = counts;
        self.error = error;
        self.completed_at = Some(now_unix());
    }
}

/// A parameter-sweep style group of jobs on one backend
///
/// Member order matches the order of the submitted circuits; `results[i]` and
/// `errors[i]` belong to `circuits[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    pub id: String,
    pub experiment_id: Option<String>,
    pub backend: String,
    pub shots: u64,
    pub status: JobStatus,
    pub circuits: Vec<Circuit>,
    pub job_ids: Vec<String>,
    /// Per-circuit counts; kept even when the batch fails
    pub results: Vec<Option<Counts>>,
    pub errors: Vec<Option<String>>,
    pub submitted_at: u64,
    pub completed_at: Option<u64>,
}

impl BatchJob {
    /// Number of members that have completed
    pub fn completed_members(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }
}

/// Combine member statuses into a batch status
///
/// Any failed or cancelled member fails the batch; the batch completes only
/// when every member has.
pub fn aggregate_status(members: &[JobStatus]) -> JobStatus {
    if members
        .iter()
        .any(|s| matches!(s, JobStatus::Failed | JobStatus::Cancelled))
    {
        JobStatus::Failed
    } else if !members.is_empty() && members.iter().all(|s| *s == JobStatus::Completed) {
        JobStatus::Completed
    } else if members
        .iter()
        .any(|s| matches!(s, JobStatus::Running | JobStatus::Completed))
    {
        JobStatus::Running
    } else {
        JobStatus::Queued
    }
}

/// Reject counts that cannot have come from a real measurement
///
/// # Errors
/// Returns `BackendError::SuspectedSyntheticData` if the total is zero, a key
/// is not a non-empty binary string, or every outcome among more than two has
/// exactly the same count, or if the counts do not sum within `u64`.
pub fn sanity_check_counts(counts: &Counts) -> Result<()> {
    let total = counts
        .values()
        .try_fold(0u64, |acc, n| acc.checked_add(*n))
        .ok_or_else(|| {
            BackendError::SuspectedSyntheticData("measurement total overflows u64".to_string())
        })?;
    if total == 0 {
        return Err(BackendError::SuspectedSyntheticData(
            "measurement total is zero".to_string(),
        ));
    }
    if let Some(bad) = counts
        .keys()
        .find(|k| k.is_empty() || !k.bytes().all(|b| b == b'0' || b == b'1'))
    {
        return Err(BackendError::SuspectedSyntheticData(format!(
            "outcome key '{}' is not a bitstring",
            bad
        )));
    }
    let mut values = counts.values().filter(|n| **n > 0);
    let first = values.next().copied();
    let observed = counts.values().filter(|n| **n > 0).count();
    if observed > 2 && values.all(|n| Some(*n) == first) {
        return Err(BackendError::SuspectedSyntheticData(format!(
            "perfectly uniform distribution over {} outcomes",
            observed
        )));
    }
    Ok(())
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
