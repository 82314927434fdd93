//! Error types for experiment orchestration

use qproof_backend::BackendError;
use qproof_core::QuantumError;
use qproof_ledger::LedgerError;
use thiserror::Error;

/// Result type for orchestration
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors raised by the orchestrator
///
/// Policy denials are not errors: they come back as
/// [`ExperimentResponse::Denied`](crate::ExperimentResponse::Denied).
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Configuration could not be read or is inconsistent
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Request failed structural checks (zero shots, empty sweep, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Circuit for the requested family failed validation
    #[error(transparent)]
    Circuit(#[from] QuantumError),

    /// Hardware submission failed after selection
    ///
    /// The experiment's `CLASS_B` entry exists and stays unsealed.
    #[error("Provider fault in experiment {experiment_id} (evidence {evidence_id}): {source}")]
    ProviderFault {
        experiment_id: String,
        evidence_id: String,
        #[source]
        source: BackendError,
    },

    /// Backend error outside of submission (e.g. a transient poll failure)
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Ledger integrity fault
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unknown experiment: {0}")]
    UnknownExperiment(String),

    /// Single-job operation on a sweep, or the other way round
    #[error("Experiment {experiment_id} is not a {expected}")]
    WrongKind {
        experiment_id: String,
        expected: &'static str,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    /// True for tamper or programming faults in the ledger
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::Ledger(err) if err.is_integrity_fault())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_fault_keeps_source() {
        use std::error::Error as _;
        let err = OrchestratorError::ProviderFault {
            experiment_id: "exp-1".to_string(),
            evidence_id: "ev-1".to_string(),
            source: BackendError::JobSubmissionFailed("queue closed".to_string()),
        };
        assert!(err.to_string().contains("ev-1"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_integrity_fault_classification() {
        let err: OrchestratorError = LedgerError::ChainMismatch { index: 3 }.into();
        assert!(err.is_integrity_fault());
        assert!(!OrchestratorError::UnknownExperiment("x".to_string()).is_integrity_fault());
    }
}
