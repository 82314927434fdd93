//! Provider transport trait
//!
//! A [`QuantumProvider`] is the thin seam between qproof and one hardware
//! vendor. It knows how to talk to the vendor and nothing else: fail-closed
//! checks, job bookkeeping and batching live in
//! [`ProviderAdapter`](crate::ProviderAdapter), which is the only type the
//! orchestrator talks to.

use crate::{BackendDescriptor, Counts, JobStatus, Result};
use qproof_core::Circuit;
use serde::{Deserialize, Serialize};

/// Trait for hardware provider transports
///
/// # Example
///
/// ```no_run
/// use qproof_backend::{QuantumProvider, Result};
/// use qproof_core::Circuit;
///
/// fn submit_everywhere<P: QuantumProvider>(provider: &P, circuit: &Circuit) -> Result<Vec<String>> {
///     provider
///         .list_backends()?
///         .iter()
///         .map(|b| provider.submit_job(circuit, &b.candidate.name, 1024))
///         .collect()
/// }
/// ```
pub trait QuantumProvider: Send + Sync {
    /// Provider name, used as the credential key (e.g. `ibm`)
    fn name(&self) -> &str;

    /// Live view of the provider's backends
    fn list_backends(&self) -> Result<Vec<BackendDescriptor>>;

    /// Submit a circuit, returning the provider-assigned job id
    fn submit_job(&self, circuit: &Circuit, backend: &str, shots: u64) -> Result<String>;

    /// Current status of a job, with counts once completed
    fn job(&self, job_id: &str) -> Result<ProviderJob>;

    /// Forward a cancellation request
    fn cancel_job(&self, job_id: &str) -> Result<()>;
}

/// A provider's answer to a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderJob {
    pub status: JobStatus,
    #[serde(default)]
    pub counts: Option<Counts>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProviderJob {
    pub fn pending(status: JobStatus) -> Self {
        Self {
            status,
            counts: None,
            error: None,
        }
    }

    pub fn completed(counts: Counts) -> Self {
        Self {
            status: JobStatus::Completed,
            counts: Some(counts),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            counts: None,
            error: Some(error.into()),
        }
    }
}

const SIMULATED_TOKENS: &[&str] = &[
    "simulator",
    "aer",
    "fake",
    "mock",
    "synthetic",
    "emulator",
    "statevector",
];

/// Name-based detection of non-hardware backends
///
/// Returns the matching token. Matching is case-insensitive on `_`/`-`/`.`
/// separated tokens, plus substring matches for the longer markers.
///
/// ```
/// use qproof_backend::provider::simulated_name_token;
///
/// assert_eq!(simulated_name_token("aer_simulator"), Some("aer"));
/// assert_eq!(simulated_name_token("fake_kyiv"), Some("fake"));
/// assert_eq!(simulated_name_token("ibm_sim_2"), Some("sim"));
/// assert_eq!(simulated_name_token("ibm_kyiv"), None);
/// ```
pub fn simulated_name_token(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    for token in lower.split(|c: char| c == '_' || c == '-' || c == '.') {
        if token == "sim" {
            return Some("sim");
        }
        if let Some(hit) = SIMULATED_TOKENS.iter().find(|t| **t == token) {
            return Some(hit);
        }
    }
    // long markers embedded without separators, e.g. "qasmsimulator"
    SIMULATED_TOKENS
        .iter()
        .filter(|t| t.len() > 4)
        .find(|t| lower.contains(**t))
        .copied()
}

/// True if the name denotes a simulated device
#[inline]
pub fn is_simulated_name(name: &str) -> bool {
    simulated_name_token(name).is_some()
}
