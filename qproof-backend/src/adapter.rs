//! Fail-closed provider adapter
//!
//! [`ProviderAdapter`] wraps any [`QuantumProvider`] and gives it the uniform
//! `list_backends / submit / poll / submit_batch / poll_batch / cancel`
//! contract. It carries two checks that do not trust anything upstream:
//!
//! - before submission, a backend whose name or descriptor marks it as a
//!   simulator is rejected with [`BackendError::SimulatedBackendRejected`];
//! - on completion, counts go through [`sanity_check_counts`] and a failing job
//!   is marked `FAILED` instead of being handed out.

use crate::provider::simulated_name_token;
use crate::result::{aggregate_status, now_unix};
use crate::{
    sanity_check_counts, BackendCandidate, BackendDescriptor, BackendError, BatchJob, Job,
    JobStatus, QuantumProvider, Result,
};
use dashmap::DashMap;
use qproof_core::Circuit;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Uniform, fail-closed front for one provider
pub struct ProviderAdapter {
    provider: Arc<dyn QuantumProvider>,
    jobs: DashMap<String, Job>,
    batches: DashMap<String, BatchJob>,
}

impl ProviderAdapter {
    pub fn new(provider: Arc<dyn QuantumProvider>) -> Self {
        Self {
            provider,
            jobs: DashMap::new(),
            batches: DashMap::new(),
        }
    }

    /// Name of the wrapped provider
    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Live hardware backends
    ///
    /// Anything the provider flags as simulated, or whose name looks like a
    /// simulator, is dropped from the listing.
    pub fn list_backends(&self) -> Result<Vec<BackendCandidate>> {
        let descriptors = self.provider.list_backends()?;
        Ok(descriptors
            .into_iter()
            .filter(|d| !d.simulated && simulated_name_token(&d.candidate.name).is_none())
            .map(|d| d.candidate)
            .collect())
    }

    /// Confirm `backend` is a live hardware device of this provider
    ///
    /// # Errors
    /// - `SimulatedBackendRejected` if the name or the provider's descriptor
    ///   marks the backend as simulated
    /// - `UnknownBackend` if the provider does not list it
    pub fn ensure_hardware(&self, backend: &str) -> Result<BackendDescriptor> {
        if let Some(token) = simulated_name_token(backend) {
            return Err(self.reject(backend, format!("name token '{}'", token)));
        }
        let descriptor = self
            .provider
            .list_backends()?
            .into_iter()
            .find(|d| d.candidate.name == backend)
            .ok_or_else(|| BackendError::UnknownBackend {
                provider: self.name().to_string(),
                backend: backend.to_string(),
            })?;
        if descriptor.simulated {
            return Err(self.reject(backend, "provider reports a simulator".to_string()));
        }
        Ok(descriptor)
    }

    fn reject(&self, backend: &str, reason: String) -> BackendError {
        warn!(provider = self.name(), backend, reason = %reason, "simulated backend rejected");
        BackendError::SimulatedBackendRejected {
            backend: backend.to_string(),
            reason,
        }
    }

    /// Submit one circuit; the returned job is `QUEUED`
    ///
    /// The owning experiment id is taken from the circuit's `request_id`
    /// metadata.
    ///
    /// # Errors
    /// `InvalidShots` for zero shots, `Circuit` if the circuit is malformed,
    /// plus every error of [`ensure_hardware`](Self::ensure_hardware) and the
    /// provider's own submission errors.
    pub fn submit(&self, circuit: &Circuit, backend: &str, shots: u64) -> Result<Job> {
        if shots == 0 {
            return Err(BackendError::InvalidShots(shots));
        }
        circuit.validate()?;
        self.ensure_hardware(backend)?;

        let job_id = self.provider.submit_job(circuit, backend, shots)?;
        let job = Job::queued(
            job_id.clone(),
            circuit.metadata().request_id.clone(),
            self.name(),
            backend,
            shots,
        );
        info!(provider = self.name(), backend, job_id = %job_id, shots, "job submitted");
        self.jobs.insert(job_id, job.clone());
        Ok(job)
    }

    /// Current state of a job
    ///
    /// Terminal jobs are answered from the local record without touching the
    /// provider, so repeated polls are stable.
    ///
    /// # Errors
    /// `JobNotFound` for ids this adapter never issued. `SuspectedSyntheticData`
    /// when completed counts fail the sanity check; the job is then `FAILED`.
    pub fn poll(&self, job_id: &str) -> Result<Job> {
        if let Some(job) = self.jobs.get(job_id) {
            if job.status.is_terminal() {
                return Ok(job.value().clone());
            }
        } else {
            return Err(BackendError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }

        let remote = self.provider.job(job_id)?;
        debug!(provider = self.name(), job_id, status = %remote.status, "job polled");

        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| BackendError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        match remote.status {
            JobStatus::Completed => {
                let counts = remote.counts.unwrap_or_default();
                if let Err(err) = sanity_check_counts(&counts) {
                    warn!(provider = self.name(), job_id, error = %err, "count data rejected");
                    job.finish(JobStatus::Failed, None, Some(err.to_string()));
                    return Err(err);
                }
                job.finish(JobStatus::Completed, Some(counts), None);
            }
            JobStatus::Failed | JobStatus::Cancelled => {
                let error = remote
                    .error
                    .unwrap_or_else(|| format!("job ended {}", remote.status));
                job.finish(remote.status, None, Some(error));
            }
            status => job.status = status,
        }
        Ok(job.value().clone())
    }

    /// Forward a cancellation; the job becomes `CANCELLED` unless already terminal
    pub fn cancel(&self, job_id: &str) -> Result<Job> {
        if !self.jobs.contains_key(job_id) {
            return Err(BackendError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }
        self.provider.cancel_job(job_id)?;
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| BackendError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        if !job.status.is_terminal() {
            job.finish(JobStatus::Cancelled, None, Some("cancelled by caller".to_string()));
        }
        info!(provider = self.name(), job_id, "job cancelled");
        Ok(job.value().clone())
    }

    /// Submit every circuit to one backend as a batch
    ///
    /// If any member submission fails, members already submitted are
    /// cancelled on a best-effort basis and the error is returned.
    pub fn submit_batch(&self, circuits: Vec<Circuit>, backend: &str, shots: u64) -> Result<BatchJob> {
        if circuits.is_empty() {
            return Err(BackendError::EmptyBatch);
        }

        let mut job_ids = Vec::with_capacity(circuits.len());
        for circuit in &circuits {
            match self.submit(circuit, backend, shots) {
                Ok(job) => job_ids.push(job.id),
                Err(err) => {
                    for id in &job_ids {
                        if let Err(cancel_err) = self.cancel(id) {
                            warn!(job_id = %id, error = %cancel_err, "batch rollback cancel failed");
                        }
                    }
                    return Err(err);
                }
            }
        }

        let n = circuits.len();
        let batch = BatchJob {
            id: format!("batch-{}", uuid::Uuid::new_v4()),
            experiment_id: circuits[0].metadata().request_id.clone(),
            backend: backend.to_string(),
            shots,
            status: JobStatus::Queued,
            circuits,
            job_ids,
            results: vec![None; n],
            errors: vec![None; n],
            submitted_at: now_unix(),
            completed_at: None,
        };
        info!(provider = self.name(), batch_id = %batch.id, members = n, "batch submitted");
        self.batches.insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    /// Poll every member and aggregate
    ///
    /// Results stay keyed by the original circuit index; completed members
    /// keep their counts even if a sibling fails.
    pub fn poll_batch(&self, batch_id: &str) -> Result<BatchJob> {
        let job_ids = match self.batches.get(batch_id) {
            Some(batch) if batch.status.is_terminal() => return Ok(batch.value().clone()),
            Some(batch) => batch.job_ids.clone(),
            None => {
                return Err(BackendError::BatchNotFound {
                    batch_id: batch_id.to_string(),
                })
            }
        };

        let mut members = Vec::with_capacity(job_ids.len());
        for id in &job_ids {
            let job = match self.poll(id) {
                Ok(job) => job,
                Err(err) if err.is_fail_closed() => self
                    .jobs
                    .get(id)
                    .map(|j| j.value().clone())
                    .ok_or_else(|| BackendError::JobNotFound { job_id: id.clone() })?,
                Err(err) => return Err(err),
            };
            members.push(job);
        }

        let mut batch = self
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| BackendError::BatchNotFound {
                batch_id: batch_id.to_string(),
            })?;
        for (i, job) in members.iter().enumerate() {
            batch.results[i] = job.counts.clone();
            batch.errors[i] = job.error.clone();
        }
        let statuses: Vec<JobStatus> = members.iter().map(|j| j.status).collect();
        batch.status = aggregate_status(&statuses);
        if batch.status.is_terminal() {
            batch.completed_at = Some(now_unix());
            info!(batch_id, status = %batch.status, completed = batch.completed_members(), "batch finished");
        }
        Ok(batch.value().clone())
    }

    /// Local record of a job
    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|j| j.value().clone())
    }

    /// Local record of a batch
    pub fn batch(&self, batch_id: &str) -> Option<BatchJob> {
        self.batches.get(batch_id).map(|b| b.value().clone())
    }
}

impl std::fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("provider", &self.name())
            .field("jobs", &self.jobs.len())
            .field("batches", &self.batches.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Counts, ProviderJob};
    use qproof_core::ExperimentFamily;
    use std::sync::Mutex;

    /// Provider double that answers every status query from a script
    pub struct Script {
        pub backends: Vec<BackendDescriptor>,
        pub answer: Mutex<ProviderJob>,
        pub submitted: Mutex<Vec<String>>,
        pub cancelled: Mutex<Vec<String>>,
        pub fail_after: Option<usize>,
    }

    impl Script {
        pub fn new(backends: Vec<BackendDescriptor>) -> Self {
            Self {
                backends,
                answer: Mutex::new(ProviderJob::pending(JobStatus::Queued)),
                submitted: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
                fail_after: None,
            }
        }

        pub fn answer(&self, job: ProviderJob) {
            *self.answer.lock().unwrap() = job;
        }

        pub fn complete(&self, counts: &[(&str, u64)]) {
            let counts: Counts = counts.iter().map(|(k, v)| (k.to_string(), *v)).collect();
            self.answer(ProviderJob::completed(counts));
        }
    }

    impl QuantumProvider for Script {
        fn name(&self) -> &str {
            "script"
        }

        fn list_backends(&self) -> Result<Vec<BackendDescriptor>> {
            Ok(self.backends.clone())
        }

        fn submit_job(&self, _circuit: &Circuit, _backend: &str, _shots: u64) -> Result<String> {
            let mut submitted = self.submitted.lock().unwrap();
            if Some(submitted.len()) == self.fail_after {
                return Err(BackendError::JobSubmissionFailed("queue full".to_string()));
            }
            let id = format!("job-{}", submitted.len());
            submitted.push(id.clone());
            Ok(id)
        }

        fn job(&self, _job_id: &str) -> Result<ProviderJob> {
            Ok(self.answer.lock().unwrap().clone())
        }

        fn cancel_job(&self, job_id: &str) -> Result<()> {
            self.cancelled.lock().unwrap().push(job_id.to_string());
            Ok(())
        }
    }

    fn backends() -> Vec<BackendDescriptor> {
        vec![
            BackendDescriptor::hardware(BackendCandidate::new("ibm_kyiv", 127, 3, true)),
            BackendDescriptor {
                candidate: BackendCandidate::new("cloud_q", 32, 0, true),
                simulated: true,
            },
            BackendDescriptor::hardware(BackendCandidate::new("aer_simulator", 32, 0, true)),
        ]
    }

    fn adapter() -> (Arc<Script>, ProviderAdapter) {
        let script = Arc::new(Script::new(backends()));
        let adapter = ProviderAdapter::new(script.clone());
        (script, adapter)
    }

    fn bell() -> Circuit {
        ExperimentFamily::Bell.build_circuit(Some("exp-1")).unwrap()
    }

    #[test]
    fn test_listing_hides_simulators() {
        let (_, adapter) = adapter();
        let names: Vec<String> = adapter.list_backends().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ibm_kyiv"]);
    }

    #[test]
    fn test_submit_rejects_simulated_backends() {
        let (script, adapter) = adapter();
        for backend in ["aer_simulator", "cloud_q", "fake_kyiv"] {
            let err = adapter.submit(&bell(), backend, 100).unwrap_err();
            assert!(matches!(err, BackendError::SimulatedBackendRejected { .. }), "{}", backend);
        }
        assert!(script.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_submit_rejects_unknown_and_zero_shots() {
        let (_, adapter) = adapter();
        assert!(matches!(
            adapter.submit(&bell(), "ibm_nowhere", 100),
            Err(BackendError::UnknownBackend { .. })
        ));
        assert!(matches!(adapter.submit(&bell(), "ibm_kyiv", 0), Err(BackendError::InvalidShots(0))));
    }

    #[test]
    fn test_poll_lifecycle() {
        let (script, adapter) = adapter();
        let job = adapter.submit(&bell(), "ibm_kyiv", 1000).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.experiment_id.as_deref(), Some("exp-1"));

        script.answer(ProviderJob::pending(JobStatus::Running));
        assert_eq!(adapter.poll(&job.id).unwrap().status, JobStatus::Running);

        script.complete(&[("00", 480), ("11", 490), ("01", 20), ("10", 10)]);
        let done = adapter.poll(&job.id).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.counts.as_ref().unwrap()["11"], 490);

        // terminal jobs are not re-fetched
        script.answer(ProviderJob::failed("late"));
        assert_eq!(adapter.poll(&job.id).unwrap(), done);
    }

    #[test]
    fn test_uniform_counts_fail_the_job() {
        let (script, adapter) = adapter();
        let job = adapter.submit(&bell(), "ibm_kyiv", 1000).unwrap();
        script.complete(&[("00", 250), ("01", 250), ("10", 250), ("11", 250)]);

        let err = adapter.poll(&job.id).unwrap_err();
        assert!(matches!(err, BackendError::SuspectedSyntheticData(_)));
        let job = adapter.poll(&job.id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.counts.is_none());
    }

    #[test]
    fn test_cancel() {
        let (script, adapter) = adapter();
        let job = adapter.submit(&bell(), "ibm_kyiv", 10).unwrap();
        assert_eq!(adapter.cancel(&job.id).unwrap().status, JobStatus::Cancelled);
        assert_eq!(script.cancelled.lock().unwrap().as_slice(), [job.id.clone()]);
        assert!(matches!(adapter.poll("nope"), Err(BackendError::JobNotFound { .. })));
    }

    #[test]
    fn test_batch_partial_failure_keeps_results() {
        let (script, adapter) = adapter();
        let circuits = vec![bell(), bell()];
        let batch = adapter.submit_batch(circuits, "ibm_kyiv", 100).unwrap();
        assert!(batch.id.starts_with("batch-"));
        assert_eq!(adapter.poll_batch(&batch.id).unwrap().status, JobStatus::Queued);

        script.complete(&[("00", 60), ("11", 40)]);
        adapter.poll(&batch.job_ids[0]).unwrap();
        script.answer(ProviderJob::failed("calibration drift"));

        let polled = adapter.poll_batch(&batch.id).unwrap();
        assert_eq!(polled.status, JobStatus::Failed);
        assert!(polled.results[0].is_some());
        assert!(polled.results[1].is_none());
        assert_eq!(polled.errors[1].as_deref(), Some("calibration drift"));
    }

    #[test]
    fn test_batch_submission_rollback() {
        let mut script = Script::new(backends());
        script.fail_after = Some(1);
        let script = Arc::new(script);
        let adapter = ProviderAdapter::new(script.clone());

        let err = adapter.submit_batch(vec![bell(), bell(), bell()], "ibm_kyiv", 10).unwrap_err();
        assert!(matches!(err, BackendError::JobSubmissionFailed(_)));
        assert_eq!(script.cancelled.lock().unwrap().as_slice(), ["job-0".to_string()]);
        assert!(matches!(adapter.submit_batch(Vec::new(), "ibm_kyiv", 10), Err(BackendError::EmptyBatch)));
    }

    #[test]
    fn test_batch_completion() {
        let (script, adapter) = adapter();
        let batch = adapter.submit_batch(vec![bell(), bell(), bell()], "ibm_kyiv", 100).unwrap();
        let counts: Counts = [("00".to_string(), 55), ("11".to_string(), 45)].into_iter().collect();
        script.answer(ProviderJob::completed(counts.clone()));
        let done = adapter.poll_batch(&batch.id).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.completed_members(), 3);
        assert!(done.results.iter().all(|r| r.as_ref() == Some(&counts)));
    }
}
