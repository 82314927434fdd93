//! Inbound requests and outbound responses

use crate::{DenialCode, RequestFlags};
use qproof_backend::{Counts, JobStatus, PolicyDecision};
use qproof_core::ExperimentFamily;
use qproof_ledger::{EvidenceClass, PolicyTrace};
use serde::{Deserialize, Serialize};

/// Create-experiment request
///
/// # Example
/// ```
/// use qproof::ExperimentRequest;
///
/// let request: ExperimentRequest =
///     serde_json::from_str(r#"{"family":"ghz","qubits":3,"shots":2048,"backend_name":"ibm_kyiv"}"#).unwrap();
/// assert_eq!(request.shots, 2048);
/// assert!(!request.simulate);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    #[serde(flatten)]
    pub family: ExperimentFamily,
    pub shots: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_name: Option<String>,
    #[serde(default)]
    pub simulate: bool,
    #[serde(default)]
    pub mock: bool,
}

impl ExperimentRequest {
    pub fn new(family: ExperimentFamily, shots: u64) -> Self {
        Self {
            family,
            shots,
            backend_name: None,
            simulate: false,
            mock: false,
        }
    }

    pub fn on_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend_name = Some(backend.into());
        self
    }

    pub fn simulated(mut self) -> Self {
        self.simulate = true;
        self
    }

    pub fn mocked(mut self) -> Self {
        self.mock = true;
        self
    }

    pub fn flags(&self) -> RequestFlags {
        RequestFlags {
            simulate: self.simulate,
            mock: self.mock,
        }
    }
}

/// Parameter sweep over idle delays of one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    #[serde(flatten)]
    pub family: ExperimentFamily,
    pub delays_us: Vec<f64>,
    pub shots: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_name: Option<String>,
    #[serde(default)]
    pub simulate: bool,
    #[serde(default)]
    pub mock: bool,
}

impl SweepRequest {
    pub fn new(family: ExperimentFamily, delays_us: Vec<f64>, shots: u64) -> Self {
        Self {
            family,
            delays_us,
            shots,
            backend_name: None,
            simulate: false,
            mock: false,
        }
    }

    pub fn on_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend_name = Some(backend.into());
        self
    }

    pub fn simulated(mut self) -> Self {
        self.simulate = true;
        self
    }

    pub fn flags(&self) -> RequestFlags {
        RequestFlags {
            simulate: self.simulate,
            mock: self.mock,
        }
    }
}

/// Answer to a create-experiment or sweep request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentResponse {
    Accepted {
        experiment_id: String,
        evidence_id: String,
        selected_backend: String,
        policy_trace: PolicyTrace,
        /// Provider job or batch id; absent for synthetic runs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
    },
    Denied {
        denied_reason_code: DenialCode,
        detail: String,
    },
}

impl ExperimentResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn experiment_id(&self) -> Option<&str> {
        match self {
            Self::Accepted { experiment_id, .. } => Some(experiment_id),
            Self::Denied { .. } => None,
        }
    }

    pub fn evidence_id(&self) -> Option<&str> {
        match self {
            Self::Accepted { evidence_id, .. } => Some(evidence_id),
            Self::Denied { .. } => None,
        }
    }

    /// Provider handle; polls accept it in place of the experiment id
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Accepted { job_id, .. } => job_id.as_deref(),
            Self::Denied { .. } => None,
        }
    }

    pub fn denial_code(&self) -> Option<DenialCode> {
        match self {
            Self::Accepted { .. } => None,
            Self::Denied {
                denied_reason_code, ..
            } => Some(*denied_reason_code),
        }
    }
}

impl From<crate::Denial> for ExperimentResponse {
    fn from(denial: crate::Denial) -> Self {
        Self::Denied {
            denied_reason_code: denial.code,
            detail: denial.detail,
        }
    }
}

/// State of a single-circuit experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    pub experiment_id: String,
    pub status: JobStatus,
    /// Present once `COMPLETED`
    pub counts: Option<Counts>,
    pub evidence_id: String,
    pub evidence_class: EvidenceClass,
    /// Counts came from the synthetic sampler
    pub synthetic: bool,
    pub error: Option<String>,
}

/// State of a sweep experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPollResponse {
    pub experiment_id: String,
    pub status: JobStatus,
    /// Per-delay counts keyed by original index; partial on failure
    pub results: Vec<Option<Counts>>,
    pub errors: Vec<Option<String>>,
    pub evidence_id: String,
    pub evidence_class: EvidenceClass,
    pub synthetic: bool,
}

/// Record a selection decision as a ledger policy trace
pub fn policy_trace(decision: &PolicyDecision) -> PolicyTrace {
    PolicyTrace {
        selected_backend: decision.selected.clone(),
        reason_codes: decision.reason_strings(),
        policy_version: decision.policy_version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qproof_backend::{select, BackendCandidate};
    use qproof_core::TomographyBasis;

    #[test]
    fn test_request_wire_shape() {
        let request = ExperimentRequest::new(
            ExperimentFamily::Tomography {
                basis: TomographyBasis::YY,
                delay_us: 12.5,
            },
            1000,
        )
        .on_backend("ibm_fez");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["family"], "tomography");
        assert_eq!(json["basis"], "YY");
        assert_eq!(json["backend_name"], "ibm_fez");

        let back: ExperimentRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_denied_wire_shape() {
        let response: ExperimentResponse =
            crate::Denial::new(DenialCode::MockOverrideEnabled, "mock override is set").into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "DENIED");
        assert_eq!(json["denied_reason_code"], "MOCK_OVERRIDE_ENABLED");
        assert_eq!(response.denial_code(), Some(DenialCode::MockOverrideEnabled));
        assert!(response.experiment_id().is_none());
        assert!(response.job_id().is_none());
    }

    #[test]
    fn test_policy_trace_from_decision() {
        let decision = select(&[BackendCandidate::new("ibm_kyiv", 127, 0, true)], 2, Some("gone"));
        let trace = policy_trace(&decision);
        assert_eq!(trace.selected_backend.as_deref(), Some("ibm_kyiv"));
        assert_eq!(trace.reason_codes, vec!["EXPLICIT_REQUEST_UNQUALIFIED", "LEAST_LOADED"]);
        assert_eq!(trace.policy_version, decision.policy_version);
    }
}
