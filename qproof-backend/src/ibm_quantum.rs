//! IBM Quantum provider
//!
//! Talks to the Qiskit Runtime REST API with a bearer token. Circuits are
//! shipped as OpenQASM 3 through the sampler primitive.
//!
//! # Example
//!
//! ```no_run
//! use qproof_backend::ibm_quantum::{IbmConfig, IbmQuantumProvider};
//! use qproof_backend::ProviderAdapter;
//! use std::sync::Arc;
//!
//! let config = IbmConfig::new("your-api-token").with_instance("ibm-q/open/main");
//! let provider = IbmQuantumProvider::new(config)?;
//! let adapter = ProviderAdapter::new(Arc::new(provider));
//! let backends = adapter.list_backends()?;
//! # Ok::<(), qproof_backend::BackendError>(())
//! ```

use crate::{
    BackendCandidate, BackendDescriptor, BackendError, Counts, JobStatus, ProviderJob,
    QuantumProvider, Result,
};
use dashmap::DashMap;
use qproof_core::Circuit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Provider name, also the credential key
pub const IBM_PROVIDER: &str = "ibm";

/// IBM Quantum configuration
#[derive(Clone)]
pub struct IbmConfig {
    /// IBM Quantum API token
    pub api_token: String,

    /// IBM Quantum instance (hub/group/project)
    pub instance: Option<String>,

    /// API base URL (default: https://api.quantum.ibm.com)
    pub api_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

impl IbmConfig {
    /// Create a new configuration with an API token
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            instance: None,
            api_url: "https://api.quantum.ibm.com".to_string(),
            request_timeout_seconds: 30,
        }
    }

    /// Set the IBM Quantum instance (hub/group/project)
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set custom API URL
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }
}

impl fmt::Debug for IbmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmConfig")
            .field("api_token", &"<redacted>")
            .field("instance", &self.instance)
            .field("api_url", &self.api_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

/// IBM Quantum provider
pub struct IbmQuantumProvider {
    config: IbmConfig,

    /// HTTP client for API requests
    client: reqwest::blocking::Client,

    /// Classical register width per submitted job, for padding result keys
    widths: DashMap<String, usize>,
}

impl IbmQuantumProvider {
    /// Create a provider
    ///
    /// No request is made until the first call.
    ///
    /// # Errors
    /// `InvalidConfiguration` for an empty token, or if the HTTP client cannot
    /// be built.
    pub fn new(config: IbmConfig) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(BackendError::InvalidConfiguration(
                "IBM Quantum API token is empty".to_string(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BackendError::InvalidConfiguration(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            config,
            client,
            widths: DashMap::new(),
        })
    }

    pub fn config(&self) -> &IbmConfig {
        &self.config
    }

    fn get(&self, path: &str) -> Result<reqwest::blocking::Response> {
        let url = format!("{}{}", self.config.api_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;
        check_auth(response)
    }

    fn fetch_backend(&self, name: &str) -> Result<IbmBackendProperties> {
        let response = self.get(&format!("/v1/backends/{}", name))?;
        if !response.status().is_success() {
            return Err(BackendError::CommunicationError(format!(
                "Failed to fetch backend '{}': {}",
                name,
                response.status()
            )));
        }
        response
            .json::<IbmBackendProperties>()
            .map_err(|e| BackendError::ProtocolError(format!("Failed to parse backend properties: {}", e)))
    }

    fn fetch_results(&self, job_id: &str) -> Result<Counts> {
        let response = self.get(&format!("/v1/jobs/{}/results", job_id))?;
        if !response.status().is_success() {
            return Err(BackendError::CommunicationError(format!(
                "Failed to retrieve results for {}: {}",
                job_id,
                response.status()
            )));
        }
        let results: IbmResults = response
            .json()
            .map_err(|e| BackendError::ProtocolError(format!("Failed to parse results: {}", e)))?;
        let width = self.widths.get(job_id).map(|w| *w.value());
        parse_counts(&results, width)
    }
}

impl QuantumProvider for IbmQuantumProvider {
    fn name(&self) -> &str {
        IBM_PROVIDER
    }

    fn list_backends(&self) -> Result<Vec<BackendDescriptor>> {
        let response = self.get("/v1/backends")?;
        if !response.status().is_success() {
            return Err(BackendError::CommunicationError(format!(
                "Failed to list backends: {}",
                response.status()
            )));
        }
        let listing: IbmBackendList = response
            .json()
            .map_err(|e| BackendError::ProtocolError(format!("Failed to parse backend list: {}", e)))?;

        listing
            .devices
            .iter()
            .map(|name| {
                let props = self.fetch_backend(name)?;
                Ok(BackendDescriptor {
                    candidate: BackendCandidate::new(
                        props.name,
                        props.num_qubits,
                        props.pending_jobs.unwrap_or(0),
                        props.status.as_ref().map_or(true, |s| s.operational()),
                    ),
                    simulated: props.simulator,
                })
            })
            .collect()
    }

    fn submit_job(&self, circuit: &Circuit, backend: &str, shots: u64) -> Result<String> {
        let job_request = IbmJobRequest {
            program_id: "sampler".to_string(),
            backend: backend.to_string(),
            hub: self.config.instance.clone(),
            params: IbmJobParams {
                pubs: vec![IbmPub {
                    circuit: circuit.to_qasm(),
                    shots,
                }],
            },
        };

        let url = format!("{}/v1/jobs", self.config.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&job_request)
            .send()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;
        let response = check_auth(response)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(BackendError::JobSubmissionFailed(format!(
                "Failed to submit job: {} - {}",
                status, error_text
            )));
        }

        let job_response: IbmJobResponse = response
            .json()
            .map_err(|e| BackendError::ProtocolError(format!("Failed to parse job response: {}", e)))?;
        self.widths
            .insert(job_response.id.clone(), circuit.num_clbits());
        Ok(job_response.id)
    }

    fn job(&self, job_id: &str) -> Result<ProviderJob> {
        let response = self.get(&format!("/v1/jobs/{}", job_id))?;
        if !response.status().is_success() {
            return Err(BackendError::JobNotFound {
                job_id: job_id.to_string(),
            });
        }
        let info: IbmJobInfo = response
            .json()
            .map_err(|e| BackendError::ProtocolError(format!("Failed to parse job info: {}", e)))?;

        let status = map_status(&info.status);
        debug!(job_id, remote = %info.status, status = %status, "ibm job status");
        Ok(match status {
            JobStatus::Completed => ProviderJob::completed(self.fetch_results(job_id)?),
            JobStatus::Failed | JobStatus::Cancelled => ProviderJob {
                status,
                counts: None,
                error: info.reason.or(Some(format!("IBM job status {}", info.status))),
            },
            other => ProviderJob::pending(other),
        })
    }

    fn cancel_job(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/v1/jobs/{}/cancel", self.config.api_url, job_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;
        let response = check_auth(response)?;

        if !response.status().is_success() {
            return Err(BackendError::CommunicationError(format!(
                "Failed to cancel job {}: {}",
                job_id,
                response.status()
            )));
        }
        Ok(())
    }
}

fn check_auth(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(BackendError::AuthenticationFailed(format!(
            "IBM Quantum rejected the credential: {}",
            status
        )));
    }
    Ok(response)
}

/// Map a Qiskit Runtime job status onto the job lifecycle
///
/// Unknown statuses are treated as failures.
pub fn map_status(status: &str) -> JobStatus {
    match status.to_ascii_uppercase().as_str() {
        "QUEUED" | "VALIDATING" | "INITIALIZING" => JobStatus::Queued,
        "RUNNING" => JobStatus::Running,
        "COMPLETED" | "DONE" => JobStatus::Completed,
        "CANCELLED" | "CANCELED" => JobStatus::Cancelled,
        _ => JobStatus::Failed,
    }
}

/// Normalize a result key to a bitstring of `width` bits
///
/// Keys come back either as hex (`0x3`) or as binary strings.
fn normalize_key(key: &str, width: Option<usize>) -> Result<String> {
    let bits = if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        let value = u128::from_str_radix(hex, 16)
            .map_err(|_| BackendError::ProtocolError(format!("Bad hex outcome key '{}'", key)))?;
        format!("{:b}", value)
    } else if !key.is_empty() && key.bytes().all(|b| b == b'0' || b == b'1') {
        key.to_string()
    } else {
        return Err(BackendError::ProtocolError(format!("Bad outcome key '{}'", key)));
    };

    Ok(match width {
        Some(w) if bits.len() < w => format!("{:0>width$}", bits, width = w),
        _ => bits,
    })
}

fn parse_counts(results: &IbmResults, width: Option<usize>) -> Result<Counts> {
    let mut counts = Counts::new();
    for result in &results.results {
        let Some(ref raw) = result.counts else { continue };
        for (key, n) in raw {
            let slot = counts.entry(normalize_key(key, width)?).or_insert(0);
            *slot = slot.checked_add(*n).ok_or_else(|| {
                BackendError::SuspectedSyntheticData(format!("count for '{}' overflows u64", key))
            })?;
        }
    }
    if counts.is_empty() {
        return Err(BackendError::ProtocolError(
            "No measurement counts found in results".to_string(),
        ));
    }
    Ok(counts)
}

// IBM API data structures

#[derive(Debug, Deserialize)]
struct IbmBackendList {
    #[serde(default)]
    devices: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct IbmBackendProperties {
    #[serde(rename = "backend_name")]
    name: String,

    num_qubits: usize,

    #[serde(default)]
    simulator: bool,

    #[serde(default)]
    pending_jobs: Option<u64>,

    #[serde(default)]
    status: Option<IbmBackendStatus>,
}

#[derive(Debug, Clone, Deserialize)]
struct IbmBackendStatus {
    #[serde(default)]
    name: String,
}

impl IbmBackendStatus {
    fn operational(&self) -> bool {
        self.name.eq_ignore_ascii_case("online") || self.name.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Serialize)]
struct IbmJobRequest {
    program_id: String,
    backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hub: Option<String>,
    params: IbmJobParams,
}

#[derive(Debug, Serialize)]
struct IbmJobParams {
    pubs: Vec<IbmPub>,
}

#[derive(Debug, Serialize)]
struct IbmPub {
    circuit: String,
    shots: u64,
}

#[derive(Debug, Deserialize)]
struct IbmJobResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IbmJobInfo {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IbmResults {
    #[serde(default)]
    results: Vec<IbmPubResult>,
}

#[derive(Debug, Deserialize)]
struct IbmPubResult {
    #[serde(default)]
    counts: Option<HashMap<String, u64>>,
}
