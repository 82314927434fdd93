//! Evidence entries and chain verification

use crate::digest::{chain_digest, leaf_digest, policy_digest, Hash32};
use crate::{EvidenceClass, ExecutionMode, LedgerError, PolicyTrace, Result};
use serde::{Deserialize, Serialize};

/// One record in the evidence chain
///
/// Entries carry digests only. Raw request and result bytes never enter the
/// ledger, so a ledger read cannot leak secrets embedded in either.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub id: String,
    pub index: u64,
    pub class: EvidenceClass,
    pub mode: ExecutionMode,
    pub request_digest: Hash32,
    pub result_digest: Option<Hash32>,
    pub leaf_digest: Hash32,
    /// Running digest over entries `0..=index`
    pub chain_digest: Hash32,
    pub policy_trace: PolicyTrace,
    pub created_at: u64,
    pub sealed_at: Option<u64>,
}

impl EvidenceEntry {
    /// Leaf digest implied by the entry's request, policy trace and result
    pub fn expected_leaf(&self) -> Hash32 {
        leaf_digest(
            &self.request_digest,
            &policy_digest(&self.policy_trace),
            self.result_digest.as_ref(),
        )
    }

    /// Chain digest implied by `prev` and this entry's contents
    pub fn expected_chain(&self, prev: &Hash32) -> Hash32 {
        chain_digest(prev, self.index, self.class, &self.expected_leaf())
    }

    pub fn is_sealed(&self) -> bool {
        self.class == EvidenceClass::ClassA
    }

    /// Class and result presence agree with each other and with the mode
    fn is_well_formed(&self) -> bool {
        match (self.class, self.mode) {
            (EvidenceClass::ClassA, ExecutionMode::Qpu) => {
                self.result_digest.is_some() && self.sealed_at.is_some()
            }
            (EvidenceClass::ClassB, ExecutionMode::Qpu) => {
                self.result_digest.is_none() && self.sealed_at.is_none()
            }
            (EvidenceClass::ClassC, ExecutionMode::Dev) => self.sealed_at.is_none(),
            _ => false,
        }
    }
}

/// Recompute the whole chain from index 0
///
/// # Errors
/// Returns `LedgerError::ChainMismatch` with the first index whose stored
/// position, leaf or chain digest diverges from the recomputed value.
///
/// # Example
/// ```
/// use qproof_ledger::{verify_chain, ExecutionMode, Ledger, PolicyTrace};
/// use serde_json::json;
///
/// let ledger = Ledger::new();
/// ledger.create_entry(&json!({"shots": 100}), ExecutionMode::Qpu, PolicyTrace::default(), None).unwrap();
/// assert!(verify_chain(&ledger.all_entries()).is_ok());
/// ```
pub fn verify_chain(entries: &[EvidenceEntry]) -> Result<()> {
    let mut prev = Hash32::ZERO;
    for (position, entry) in entries.iter().enumerate() {
        let index = position as u64;
        let consistent = entry.index == index
            && entry.is_well_formed()
            && entry.leaf_digest == entry.expected_leaf()
            && entry.chain_digest == entry.expected_chain(&prev);
        if !consistent {
            return Err(LedgerError::ChainMismatch { index });
        }
        prev = entry.chain_digest;
    }
    Ok(())
}

/// Recompute leaf and chain digests for `entries[from..]` in place
pub(crate) fn relink(entries: &mut [EvidenceEntry], from: usize) {
    let mut prev = match from {
        0 => Hash32::ZERO,
        i => entries[i - 1].chain_digest,
    };
    for entry in entries.iter_mut().skip(from) {
        entry.leaf_digest = entry.expected_leaf();
        entry.chain_digest = entry.expected_chain(&prev);
        prev = entry.chain_digest;
    }
}
