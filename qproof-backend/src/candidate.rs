//! Backend candidates fed to the selection policy

use serde::{Deserialize, Serialize};

/// A hardware target as seen at selection time
///
/// Candidates are supplied fresh on every selection call and never cached by
/// the policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCandidate {
    pub name: String,
    /// Qubit capacity
    pub qubits: usize,
    /// Jobs waiting in the backend's queue
    pub pending_jobs: u64,
    pub operational: bool,
}

impl BackendCandidate {
    pub fn new(name: impl Into<String>, qubits: usize, pending_jobs: u64, operational: bool) -> Self {
        Self {
            name: name.into(),
            qubits,
            pending_jobs,
            operational,
        }
    }

    /// Operational and large enough for `min_qubits`
    #[inline]
    pub fn qualifies(&self, min_qubits: usize) -> bool {
        self.operational && self.qubits >= min_qubits
    }
}

/// What a provider reports about one of its backends
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    #[serde(flatten)]
    pub candidate: BackendCandidate,
    /// Provider flags this backend as a simulator
    #[serde(default)]
    pub simulated: bool,
}

impl BackendDescriptor {
    pub fn hardware(candidate: BackendCandidate) -> Self {
        Self {
            candidate,
            simulated: false,
        }
    }
}
