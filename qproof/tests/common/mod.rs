//! Scripted hardware provider shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use qproof::{ExecutionConfig, Orchestrator};
use qproof_backend::{
    BackendCandidate, BackendDescriptor, BackendError, Counts, JobStatus, ProviderJob,
    QuantumProvider, Result,
};
use qproof_core::Circuit;
use qproof_ledger::{ExecutionMode, Ledger};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct Fleet {
    pub name: &'static str,
    pub backends: Vec<BackendDescriptor>,
    pub answers: Mutex<HashMap<String, ProviderJob>>,
    pub submitted: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    listings: AtomicUsize,
    /// From this listing on, every backend reports as a simulator
    pub turns_simulated_at: Option<usize>,
    pub reject_submissions: bool,
    pub listing_down: bool,
}

impl Fleet {
    pub fn new(name: &'static str, backends: Vec<BackendDescriptor>) -> Self {
        Self {
            name,
            backends,
            answers: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
            turns_simulated_at: None,
            reject_submissions: false,
            listing_down: false,
        }
    }

    /// Three IBM-style devices: `ibm_kyiv` (5 pending), `ibm_fez` (1 pending)
    /// and an offline `ibm_torino`
    pub fn standard() -> Self {
        Self::new(
            "fleet",
            vec![
                BackendDescriptor::hardware(BackendCandidate::new("ibm_kyiv", 127, 5, true)),
                BackendDescriptor::hardware(BackendCandidate::new("ibm_fez", 156, 1, true)),
                BackendDescriptor::hardware(BackendCandidate::new("ibm_torino", 133, 0, false)),
            ],
        )
    }

    pub fn answer(&self, job_id: &str, job: ProviderJob) {
        self.answers.lock().insert(job_id.to_string(), job);
    }

    pub fn complete(&self, job_id: &str, counts: &[(&str, u64)]) {
        let counts: Counts = counts.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self.answer(job_id, ProviderJob::completed(counts));
    }

    pub fn fail(&self, job_id: &str, error: &str) {
        self.answer(job_id, ProviderJob::failed(error));
    }

    pub fn job_id(&self, n: usize) -> String {
        format!("{}-job-{}", self.name, n)
    }
}

impl QuantumProvider for Fleet {
    fn name(&self) -> &str {
        self.name
    }

    fn list_backends(&self) -> Result<Vec<BackendDescriptor>> {
        if self.listing_down {
            return Err(BackendError::CommunicationError("listing unavailable".to_string()));
        }
        let n = self.listings.fetch_add(1, Ordering::SeqCst);
        let simulated = self.turns_simulated_at.map_or(false, |at| n >= at);
        Ok(self
            .backends
            .iter()
            .cloned()
            .map(|mut d| {
                d.simulated |= simulated;
                d
            })
            .collect())
    }

    fn submit_job(&self, _circuit: &Circuit, _backend: &str, _shots: u64) -> Result<String> {
        if self.reject_submissions {
            return Err(BackendError::JobSubmissionFailed("queue closed".to_string()));
        }
        let mut submitted = self.submitted.lock();
        let id = self.job_id(submitted.len());
        submitted.push(id.clone());
        Ok(id)
    }

    fn job(&self, job_id: &str) -> Result<ProviderJob> {
        Ok(self
            .answers
            .lock()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| ProviderJob::pending(JobStatus::Queued)))
    }

    fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.cancelled.lock().push(job_id.to_string());
        Ok(())
    }
}

/// `QPU` configuration with a credential for `fleet` and all three devices
/// allowlisted
pub fn qpu_config() -> ExecutionConfig {
    ExecutionConfig::new(ExecutionMode::Qpu)
        .with_credential("fleet", "fleet-token")
        .with_allowlist(["ibm_kyiv", "ibm_fez", "ibm_torino"])
}

pub fn qpu(fleet: &Arc<Fleet>) -> Orchestrator {
    Orchestrator::new(qpu_config(), Arc::new(Ledger::new())).with_provider(fleet.clone())
}

pub const BELL_COUNTS: &[(&str, u64)] = &[("00", 498), ("11", 502)];
