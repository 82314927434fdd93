//! Error types for backend operations

use thiserror::Error;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur during backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend denotes a simulator, emulator or other non-hardware device
    #[error("Simulated backend rejected: '{backend}' ({reason})")]
    SimulatedBackendRejected { backend: String, reason: String },

    /// Returned counts look generated rather than measured
    #[error("Suspected synthetic data: {0}")]
    SuspectedSyntheticData(String),

    /// Shot count must be positive
    #[error("Invalid shot count: {0}")]
    InvalidShots(u64),

    /// Batch submitted with no circuits
    #[error("Batch must contain at least one circuit")]
    EmptyBatch,

    /// Backend not offered by this provider
    #[error("Unknown backend '{backend}' for provider '{provider}'")]
    UnknownBackend { provider: String, backend: String },

    /// Circuit is not compatible with this backend
    #[error("Circuit incompatible with backend: {0}")]
    CircuitIncompatible(String),

    /// Circuit failed structural validation
    #[error(transparent)]
    Circuit(#[from] qproof_core::QuantumError),

    /// Backend communication error
    #[error("Backend communication error: {0}")]
    CommunicationError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Job submission failed
    #[error("Job submission failed: {0}")]
    JobSubmissionFailed(String),

    /// Job not found
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    /// Batch not found
    #[error("Batch not found: {batch_id}")]
    BatchNotFound { batch_id: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Provider answered with something outside its protocol
    #[error("Provider protocol error: {0}")]
    ProtocolError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),
}

impl BackendError {
    /// True for the adapter-local fail-closed rejections
    pub fn is_fail_closed(&self) -> bool {
        matches!(
            self,
            Self::SimulatedBackendRejected { .. } | Self::SuspectedSyntheticData(_)
        )
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::CommunicationError(err.to_string())
    }
}
