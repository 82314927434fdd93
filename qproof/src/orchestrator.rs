//! Experiment orchestrator
//!
//! Runs every experiment through the same sequence:
//!
//! 1. [`ExecutionGate`] on a fresh configuration snapshot
//! 2. backend selection ([`select`]) over live candidates
//! 3. circuit construction and validation
//! 4. execution: a [`ProviderAdapter`] job in `QPU` mode, the
//!    [`SyntheticSampler`] in `DEV` mode
//! 5. a ledger entry: `CLASS_B` for hardware, `CLASS_C` for synthetic runs
//!
//! A later poll that observes `COMPLETED` seals the `CLASS_B` entry exactly
//! once. `FAILED` and `CANCELLED` experiments keep their entry at `CLASS_B`.
//! Polls and cancels accept the experiment id or the provider's job or batch
//! id.

use crate::messages::policy_trace;
use crate::{
    Denial, DenialCode, ExecutionConfig, ExecutionGate, ExperimentRequest, ExperimentResponse,
    OrchestratorError, PollResponse, RequestFlags, Result, SweepPollResponse, SweepRequest,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use qproof_backend::{
    select, BackendCandidate, BackendError, Counts, JobStatus, PolicyDecision, ProviderAdapter,
    QuantumProvider, SyntheticSampler,
};
use qproof_core::{Circuit, ExperimentFamily};
use qproof_ledger::{
    ChainState, EvidenceEntry, ExecutionMode, Ledger, LedgerError, PolicyTrace, SignedChainHead,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where an experiment's work lives
#[derive(Clone)]
enum Route {
    Synthetic,
    Job {
        adapter: Arc<ProviderAdapter>,
        job_id: String,
    },
    Batch {
        adapter: Arc<ProviderAdapter>,
        batch_id: String,
    },
    /// Submission failed; nothing to poll
    Unsubmitted,
}

struct Experiment {
    id: String,
    evidence_id: String,
    backend: String,
    sweep: bool,
    route: Route,
    status: JobStatus,
    counts: Option<Counts>,
    results: Vec<Option<Counts>>,
    errors: Vec<Option<String>>,
    error: Option<String>,
}

impl Experiment {
    fn new(id: &str, evidence_id: &str, backend: &str, sweep: bool, route: Route) -> Self {
        Self {
            id: id.to_string(),
            evidence_id: evidence_id.to_string(),
            backend: backend.to_string(),
            sweep,
            route,
            status: JobStatus::Queued,
            counts: None,
            results: Vec::new(),
            errors: Vec::new(),
            error: None,
        }
    }

    fn synthetic(&self) -> bool {
        matches!(self.route, Route::Synthetic)
    }
}

/// What the ledger digests as the request: the caller's request bound to
/// the experiment id, the selected backend and the exact circuits sent
#[derive(Serialize)]
struct EvidenceRequest<'a, R: Serialize> {
    experiment_id: &'a str,
    request: &'a R,
    backend: &'a str,
    qasm: Vec<String>,
}

/// Outcome of the selection step
struct Plan {
    decision: PolicyDecision,
    backend: String,
    adapter: Option<Arc<ProviderAdapter>>,
}

/// Sequences gate, selection, execution and evidence for every experiment
///
/// # Example
/// ```
/// use qproof::{ExecutionConfig, ExperimentRequest, Orchestrator};
/// use qproof_core::ExperimentFamily;
/// use qproof_ledger::{EvidenceClass, Ledger};
/// use std::sync::Arc;
///
/// let orchestrator = Orchestrator::new(ExecutionConfig::default(), Arc::new(Ledger::new()));
/// let response = orchestrator
///     .submit(&ExperimentRequest::new(ExperimentFamily::Bell, 1024).simulated())
///     .unwrap();
/// let poll = orchestrator.poll(response.experiment_id().unwrap()).unwrap();
/// assert_eq!(poll.evidence_class, EvidenceClass::ClassC);
/// assert!(poll.synthetic);
/// ```
pub struct Orchestrator {
    config: RwLock<ExecutionConfig>,
    ledger: Arc<Ledger>,
    adapters: Vec<Arc<ProviderAdapter>>,
    sampler: SyntheticSampler,
    experiments: DashMap<String, Arc<Mutex<Experiment>>>,
    /// Provider job or batch id to experiment id
    aliases: DashMap<String, String>,
}

impl Orchestrator {
    pub fn new(config: ExecutionConfig, ledger: Arc<Ledger>) -> Self {
        Self {
            config: RwLock::new(config),
            ledger,
            adapters: Vec::new(),
            sampler: SyntheticSampler::new(),
            experiments: DashMap::new(),
            aliases: DashMap::new(),
        }
    }

    /// Register a hardware provider behind a fail-closed adapter
    ///
    /// The provider is only consulted when the configuration holds a
    /// credential under its name.
    pub fn with_provider(mut self, provider: Arc<dyn QuantumProvider>) -> Self {
        self.adapters.push(Arc::new(ProviderAdapter::new(provider)));
        self
    }

    pub fn with_sampler(mut self, sampler: SyntheticSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replace the configuration; in-flight requests keep their snapshot
    pub fn set_config(&self, config: ExecutionConfig) {
        *self.config.write() = config;
    }

    pub fn config(&self) -> ExecutionConfig {
        self.config.read().clone()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn gate(&self) -> ExecutionGate {
        ExecutionGate::new(self.config.read().clone())
    }

    /// Run a single-circuit experiment
    ///
    /// Fail-closed rejections come back as `Ok(ExperimentResponse::Denied)`.
    ///
    /// # Errors
    /// - `InvalidRequest` for zero shots
    /// - `Circuit` if the family's circuit is malformed
    /// - `ProviderFault` if hardware submission fails; the `CLASS_B` entry is
    ///   recorded and never sealed
    /// - `Ledger` for ledger faults
    pub fn submit(&self, request: &ExperimentRequest) -> Result<ExperimentResponse> {
        let gate = self.gate();
        let plan = match self.admit(&gate, request.backend_name.as_deref(), request.flags(), &request.family) {
            Ok(plan) => plan,
            Err(denial) => return Ok(denial.into()),
        };
        if request.shots == 0 {
            return Err(OrchestratorError::InvalidRequest(
                "shots must be positive".to_string(),
            ));
        }

        let experiment_id = new_experiment_id();
        let circuit = request.family.build_circuit(Some(&experiment_id))?;
        let evidence = EvidenceRequest {
            experiment_id: &experiment_id,
            request,
            backend: &plan.backend,
            qasm: vec![circuit.to_qasm()],
        };
        let trace = policy_trace(&plan.decision);

        let (evidence_id, job_id) = match &plan.adapter {
            None => {
                let run = self.sampler.run(&circuit, request.shots)?;
                let entry = self.ledger.create_entry(
                    &evidence,
                    ExecutionMode::Dev,
                    trace.clone(),
                    Some(serde_json::to_value(&run)?),
                )?;
                self.ledger.link(experiment_id.clone(), &entry.id)?;

                let mut experiment =
                    Experiment::new(&experiment_id, &entry.id, &plan.backend, false, Route::Synthetic);
                experiment.status = JobStatus::Completed;
                experiment.counts = Some(run.counts);
                self.register(experiment);
                (entry.id, None)
            }
            Some(adapter) => match adapter.submit(&circuit, &plan.backend, request.shots) {
                Ok(job) => {
                    let members = [job.id.clone()];
                    let entry =
                        self.bind_submission(&experiment_id, &evidence, trace.clone(), adapter, &job.id, &members)?;
                    self.register(Experiment::new(
                        &experiment_id,
                        &entry.id,
                        &plan.backend,
                        false,
                        Route::Job {
                            adapter: Arc::clone(adapter),
                            job_id: job.id.clone(),
                        },
                    ));
                    (entry.id, Some(job.id))
                }
                Err(err) => return self.submission_failed(&experiment_id, &evidence, &plan, trace, false, err),
            },
        };

        info!(
            experiment_id = %experiment_id,
            evidence_id = %evidence_id,
            backend = %plan.backend,
            mode = gate.mode().as_str(),
            "experiment accepted"
        );
        Ok(ExperimentResponse::Accepted {
            experiment_id,
            evidence_id,
            selected_backend: plan.backend,
            policy_trace: trace,
            job_id,
        })
    }

    /// Run one circuit per delay as a single sweep experiment
    ///
    /// The sweep owns one evidence entry, sealed only if every member
    /// completes.
    ///
    /// # Errors
    /// As [`submit`](Self::submit), plus `InvalidRequest` for an empty delay
    /// list or a family without an idle period.
    pub fn submit_sweep(&self, request: &SweepRequest) -> Result<ExperimentResponse> {
        let gate = self.gate();
        let plan = match self.admit(&gate, request.backend_name.as_deref(), request.flags(), &request.family) {
            Ok(plan) => plan,
            Err(denial) => return Ok(denial.into()),
        };
        if request.shots == 0 {
            return Err(OrchestratorError::InvalidRequest(
                "shots must be positive".to_string(),
            ));
        }
        if request.delays_us.is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "sweep needs at least one delay".to_string(),
            ));
        }

        let experiment_id = new_experiment_id();
        let circuits = sweep_circuits(&request.family, &request.delays_us, &experiment_id)?;
        let evidence = EvidenceRequest {
            experiment_id: &experiment_id,
            request,
            backend: &plan.backend,
            qasm: circuits.iter().map(Circuit::to_qasm).collect(),
        };
        let trace = policy_trace(&plan.decision);

        let (evidence_id, batch_id) = match &plan.adapter {
            None => {
                let runs = circuits
                    .iter()
                    .map(|c| self.sampler.run(c, request.shots))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let entry = self.ledger.create_entry(
                    &evidence,
                    ExecutionMode::Dev,
                    trace.clone(),
                    Some(json!({ "runs": runs })),
                )?;
                self.ledger.link(experiment_id.clone(), &entry.id)?;

                let mut experiment =
                    Experiment::new(&experiment_id, &entry.id, &plan.backend, true, Route::Synthetic);
                experiment.status = JobStatus::Completed;
                experiment.errors = vec![None; runs.len()];
                experiment.results = runs.into_iter().map(|r| Some(r.counts)).collect();
                self.register(experiment);
                (entry.id, None)
            }
            Some(adapter) => match adapter.submit_batch(circuits, &plan.backend, request.shots) {
                Ok(batch) => {
                    let entry = self.bind_submission(
                        &experiment_id,
                        &evidence,
                        trace.clone(),
                        adapter,
                        &batch.id,
                        &batch.job_ids,
                    )?;
                    let mut experiment = Experiment::new(
                        &experiment_id,
                        &entry.id,
                        &plan.backend,
                        true,
                        Route::Batch {
                            adapter: Arc::clone(adapter),
                            batch_id: batch.id.clone(),
                        },
                    );
                    experiment.results = batch.results;
                    experiment.errors = batch.errors;
                    self.register(experiment);
                    (entry.id, Some(batch.id))
                }
                Err(err) => return self.submission_failed(&experiment_id, &evidence, &plan, trace, true, err),
            },
        };

        info!(
            experiment_id = %experiment_id,
            evidence_id = %evidence_id,
            backend = %plan.backend,
            members = request.delays_us.len(),
            "sweep accepted"
        );
        Ok(ExperimentResponse::Accepted {
            experiment_id,
            evidence_id,
            selected_backend: plan.backend,
            policy_trace: trace,
            job_id: batch_id,
        })
    }

    /// Gate checks, then selection
    fn admit(
        &self,
        gate: &ExecutionGate,
        requested: Option<&str>,
        flags: RequestFlags,
        family: &ExperimentFamily,
    ) -> std::result::Result<Plan, Denial> {
        gate.admit(requested, flags)?;

        let min_qubits = family.min_qubits();
        let (decision, adapters) = match gate.mode() {
            ExecutionMode::Dev => (
                select(&[self.sampler.candidate()], min_qubits, requested),
                Vec::new(),
            ),
            ExecutionMode::Qpu => {
                let pairs = self.hardware_candidates(gate.config());
                let candidates: Vec<BackendCandidate> = pairs.iter().map(|(c, _)| c.clone()).collect();
                (select(&candidates, min_qubits, requested), pairs)
            }
        };

        let Some(backend) = decision.selected.clone() else {
            return Err(Denial::new(
                DenialCode::NoQualifyingBackend,
                format!(
                    "no operational backend with {} qubits ({})",
                    min_qubits,
                    decision.reason_strings().join(", ")
                ),
            ));
        };
        let adapter = adapters
            .into_iter()
            .find(|(c, _)| c.name == backend)
            .map(|(_, adapter)| adapter);
        // a QPU plan without an adapter would fall through to the sampler
        if gate.mode() == ExecutionMode::Qpu && adapter.is_none() {
            return Err(Denial::new(
                DenialCode::NoQualifyingBackend,
                format!("no provider owns backend '{}'", backend),
            ));
        }
        debug!(backend = %backend, reasons = ?decision.reasons, "backend selected");
        Ok(Plan {
            decision,
            backend,
            adapter,
        })
    }

    /// Allowlisted hardware backends of every credentialed provider
    fn hardware_candidates(&self, config: &ExecutionConfig) -> Vec<(BackendCandidate, Arc<ProviderAdapter>)> {
        let mut out = Vec::new();
        for adapter in &self.adapters {
            if !config.has_credential(adapter.name()) {
                debug!(provider = adapter.name(), "provider skipped: no credential");
                continue;
            }
            match adapter.list_backends() {
                Ok(backends) => out.extend(
                    backends
                        .into_iter()
                        .filter(|c| config.is_allowlisted(&c.name))
                        .map(|c| (c, Arc::clone(adapter))),
                ),
                Err(err) => warn!(provider = adapter.name(), error = %err, "backend listing failed"),
            }
        }
        out
    }

    /// Record a hardware submission that never reached the provider's queue
    fn submission_failed<R: Serialize>(
        &self,
        experiment_id: &str,
        evidence: &EvidenceRequest<'_, R>,
        plan: &Plan,
        trace: PolicyTrace,
        sweep: bool,
        err: BackendError,
    ) -> Result<ExperimentResponse> {
        if let BackendError::SimulatedBackendRejected { .. } = err {
            return Ok(Denial::new(DenialCode::SimulatedBackendRejected, err.to_string()).into());
        }

        let entry = self
            .ledger
            .create_entry(evidence, ExecutionMode::Qpu, trace, None)?;
        self.ledger.link(experiment_id.to_string(), &entry.id)?;
        let mut experiment = Experiment::new(experiment_id, &entry.id, &plan.backend, sweep, Route::Unsubmitted);
        experiment.status = JobStatus::Failed;
        experiment.error = Some(err.to_string());
        self.register(experiment);

        warn!(
            experiment_id,
            evidence_id = %entry.id,
            backend = %plan.backend,
            error = %err,
            "hardware submission failed"
        );
        Err(OrchestratorError::ProviderFault {
            experiment_id: experiment_id.to_string(),
            evidence_id: entry.id,
            source: err,
        })
    }

    /// `CLASS_B` entry and side-index links for work the provider already holds
    ///
    /// If the ledger refuses, every provider job in `members` is cancelled
    /// before the error propagates.
    fn bind_submission<R: Serialize>(
        &self,
        experiment_id: &str,
        evidence: &EvidenceRequest<'_, R>,
        trace: PolicyTrace,
        adapter: &ProviderAdapter,
        handle: &str,
        members: &[String],
    ) -> Result<EvidenceEntry> {
        let bound = self
            .ledger
            .create_entry(evidence, ExecutionMode::Qpu, trace, None)
            .and_then(|entry| {
                self.ledger.link(experiment_id.to_string(), &entry.id)?;
                self.ledger.link(handle.to_string(), &entry.id)?;
                Ok(entry)
            });
        match bound {
            Ok(entry) => Ok(entry),
            Err(err) => {
                error!(experiment_id, handle, error = %err, "evidence not recorded, cancelling provider work");
                for job_id in members {
                    if let Err(cancel_err) = adapter.cancel(job_id) {
                        warn!(experiment_id, job_id = %job_id, error = %cancel_err, "orphaned job not cancelled");
                    }
                }
                Err(err.into())
            }
        }
    }

    fn register(&self, experiment: Experiment) {
        let handle = match &experiment.route {
            Route::Job { job_id, .. } => Some(job_id.clone()),
            Route::Batch { batch_id, .. } => Some(batch_id.clone()),
            Route::Synthetic | Route::Unsubmitted => None,
        };
        let experiment_id = experiment.id.clone();
        self.experiments
            .insert(experiment_id.clone(), Arc::new(Mutex::new(experiment)));
        if let Some(handle) = handle {
            self.aliases.insert(handle, experiment_id);
        }
    }

    /// Look up by experiment id, then by provider job or batch id
    fn record(&self, id: &str) -> Result<Arc<Mutex<Experiment>>> {
        if let Some(experiment) = self.experiments.get(id) {
            return Ok(Arc::clone(experiment.value()));
        }
        self.aliases
            .get(id)
            .map(|alias| alias.value().clone())
            .and_then(|experiment_id| self.experiments.get(&experiment_id).map(|e| Arc::clone(e.value())))
            .ok_or_else(|| OrchestratorError::UnknownExperiment(id.to_string()))
    }

    /// Current state of a single-circuit experiment, by experiment or job id
    ///
    /// Observing `COMPLETED` seals the entry; terminal experiments are answered
    /// from their record, so repeated polls never touch the ledger again.
    ///
    /// # Errors
    /// `UnknownExperiment`, `WrongKind` for a sweep, `Backend` for transient
    /// provider errors, `Ledger` if sealing fails.
    pub fn poll(&self, id: &str) -> Result<PollResponse> {
        let record = self.record(id)?;
        let mut experiment = record.lock();
        if experiment.sweep {
            return Err(OrchestratorError::WrongKind {
                experiment_id: experiment.id.clone(),
                expected: "single-circuit experiment",
            });
        }

        let target = match &experiment.route {
            Route::Job { adapter, job_id } if !experiment.status.is_terminal() => {
                Some((Arc::clone(adapter), job_id.clone()))
            }
            _ => None,
        };
        if let Some((adapter, job_id)) = target {
            match adapter.poll(&job_id) {
                Ok(job) => match job.status {
                    JobStatus::Completed => {
                        let counts = job.counts.unwrap_or_default();
                        let sealed = json!({
                            "experiment_id": experiment.id,
                            "backend": experiment.backend,
                            "job_id": job_id,
                            "counts": counts,
                        });
                        self.seal(&experiment.evidence_id, &sealed)?;
                        experiment.counts = Some(counts);
                        experiment.status = JobStatus::Completed;
                    }
                    JobStatus::Failed | JobStatus::Cancelled => {
                        warn!(experiment_id = %experiment.id, status = %job.status, "experiment ended unsealed");
                        experiment.status = job.status;
                        experiment.error = job.error;
                    }
                    status => experiment.status = status,
                },
                Err(err) if err.is_fail_closed() => {
                    experiment.status = JobStatus::Failed;
                    experiment.error = Some(err.to_string());
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(PollResponse {
            experiment_id: experiment.id.clone(),
            status: experiment.status,
            counts: experiment.counts.clone(),
            evidence_id: experiment.evidence_id.clone(),
            evidence_class: self.evidence(&experiment.evidence_id)?.class,
            synthetic: experiment.synthetic(),
            error: experiment.error.clone(),
        })
    }

    /// Current state of a sweep, by experiment or batch id
    ///
    /// The entry is sealed only once every member has completed. A failed
    /// member fails the sweep; completed members' counts are still returned.
    pub fn poll_sweep(&self, id: &str) -> Result<SweepPollResponse> {
        let record = self.record(id)?;
        let mut experiment = record.lock();
        if !experiment.sweep {
            return Err(OrchestratorError::WrongKind {
                experiment_id: experiment.id.clone(),
                expected: "sweep",
            });
        }

        let target = match &experiment.route {
            Route::Batch { adapter, batch_id } if !experiment.status.is_terminal() => {
                Some((Arc::clone(adapter), batch_id.clone()))
            }
            _ => None,
        };
        if let Some((adapter, batch_id)) = target {
            let batch = adapter.poll_batch(&batch_id)?;
            if batch.status == JobStatus::Completed {
                let sealed = json!({
                    "experiment_id": experiment.id,
                    "backend": experiment.backend,
                    "batch_id": batch_id,
                    "results": batch.results,
                });
                self.seal(&experiment.evidence_id, &sealed)?;
            } else if batch.status == JobStatus::Failed {
                warn!(
                    experiment_id = %experiment.id,
                    completed = batch.completed_members(),
                    "sweep failed, partial results kept unsealed"
                );
                experiment.error = Some("one or more sweep members failed".to_string());
            }
            experiment.status = batch.status;
            experiment.results = batch.results;
            experiment.errors = batch.errors;
        }

        Ok(SweepPollResponse {
            experiment_id: experiment.id.clone(),
            status: experiment.status,
            results: experiment.results.clone(),
            errors: experiment.errors.clone(),
            evidence_id: experiment.evidence_id.clone(),
            evidence_class: self.evidence(&experiment.evidence_id)?.class,
            synthetic: experiment.synthetic(),
        })
    }

    /// Forward cancellation to the provider
    ///
    /// A cancelled experiment is terminal and its entry is never sealed.
    /// Terminal experiments are left as they are.
    pub fn cancel(&self, id: &str) -> Result<JobStatus> {
        let record = self.record(id)?;
        let mut experiment = record.lock();
        if experiment.status.is_terminal() {
            return Ok(experiment.status);
        }

        match experiment.route.clone() {
            Route::Job { adapter, job_id } => {
                let job = adapter.cancel(&job_id)?;
                experiment.status = job.status;
                experiment.error = job.error;
            }
            Route::Batch { adapter, batch_id } => {
                let job_ids = adapter
                    .batch(&batch_id)
                    .map(|b| b.job_ids)
                    .unwrap_or_default();
                for job_id in &job_ids {
                    if let Err(err) = adapter.cancel(job_id) {
                        warn!(experiment_id = %experiment.id, job_id = %job_id, error = %err, "member cancel failed");
                    }
                }
                let batch = adapter.poll_batch(&batch_id)?;
                experiment.status = batch.status;
                experiment.results = batch.results;
                experiment.errors = batch.errors;
            }
            Route::Synthetic | Route::Unsubmitted => {}
        }
        info!(experiment_id = %experiment.id, status = %experiment.status, "experiment cancelled");
        Ok(experiment.status)
    }

    fn seal(&self, evidence_id: &str, result: &serde_json::Value) -> Result<()> {
        let entry = self.ledger.seal_entry(evidence_id, result)?;
        info!(evidence_id, index = entry.index, "hardware evidence sealed");
        Ok(())
    }

    fn evidence(&self, evidence_id: &str) -> Result<EvidenceEntry> {
        self.ledger
            .entry(evidence_id)
            .ok_or_else(|| LedgerError::UnknownEntry(evidence_id.to_string()).into())
    }

    /// Current chain length and head digest
    pub fn chain_state(&self) -> ChainState {
        self.ledger.chain_state()
    }

    /// Signed chain state, if the ledger holds a signing key
    pub fn signed_chain_head(&self) -> Option<SignedChainHead> {
        self.ledger.signed_chain_head()
    }

    pub fn entry(&self, evidence_id: &str) -> Option<EvidenceEntry> {
        self.ledger.entry(evidence_id)
    }

    /// Entry recorded for an experiment, job or batch id
    pub fn entry_for(&self, id: &str) -> Option<EvidenceEntry> {
        self.ledger.entry_for(id)
    }

    pub fn all_entries(&self) -> Vec<EvidenceEntry> {
        self.ledger.all_entries()
    }

    /// Recompute the whole chain
    ///
    /// # Errors
    /// `Ledger(ChainMismatch)` at the first tampered index.
    pub fn verify_ledger(&self) -> Result<()> {
        Ok(self.ledger.verify()?)
    }
}

fn new_experiment_id() -> String {
    format!("exp-{}", uuid::Uuid::new_v4())
}

fn sweep_circuits(family: &ExperimentFamily, delays_us: &[f64], experiment_id: &str) -> Result<Vec<Circuit>> {
    delays_us
        .iter()
        .map(|delay| -> Result<Circuit> {
            let member = family.with_delay(*delay).ok_or_else(|| {
                OrchestratorError::InvalidRequest(format!(
                    "family '{}' has no idle period to sweep",
                    family.tag()
                ))
            })?;
            Ok(member.build_circuit(Some(experiment_id))?)
        })
        .collect()
}
