//! Error types for the evidence ledger

use thiserror::Error;

/// Errors raised by the ledger
///
/// Integrity faults (`InvalidSealTarget`, `ChainMismatch`, `CorruptLog` and
/// `LinkConflict`) signal a programming error or tampering. They are always surfaced, never swallowed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Seal attempted on an unknown entry or one that is not `CLASS_B`
    #[error("Invalid seal target '{entry_id}': {reason}")]
    InvalidSealTarget { entry_id: String, reason: String },

    /// Recomputing the chain diverged from the stored digests at `index`
    #[error("Chain mismatch at index {index}")]
    ChainMismatch { index: u64 },

    /// A hardware-mode entry was created with a result attached
    #[error("Hardware results can only enter the ledger by sealing a CLASS_B entry")]
    PrematureResult,

    /// Value could not be canonicalized
    #[error("Canonicalization failed: {0}")]
    Canonicalization(#[from] serde_json::Error),

    /// Unrecognised execution mode string
    #[error("Invalid execution mode '{0}' (expected DEV or QPU)")]
    InvalidMode(String),

    /// Malformed hex digest
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// Side-index link to an entry that does not exist
    #[error("Unknown entry '{0}'")]
    UnknownEntry(String),

    /// Side-index key already bound to a different entry
    #[error("Link '{key}' already points at '{existing}', refusing '{requested}'")]
    LinkConflict {
        key: String,
        existing: String,
        requested: String,
    },

    /// Persistent log could not be read or written
    #[error("Ledger storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Persistent log contains a record that cannot be replayed
    #[error("Corrupt ledger log at line {line}: {reason}")]
    CorruptLog { line: usize, reason: String },

    /// Signed chain head failed verification
    #[error("Signature error: {0}")]
    Signature(String),
}

impl LedgerError {
    /// True for faults that indicate tampering or a broken invariant
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            Self::InvalidSealTarget { .. }
                | Self::ChainMismatch { .. }
                | Self::CorruptLog { .. }
                | Self::LinkConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::InvalidSealTarget {
            entry_id: "ev-1".to_string(),
            reason: "entry is CLASS_C".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid seal target 'ev-1': entry is CLASS_C");
        assert!(err.is_integrity_fault());

        let err = LedgerError::ChainMismatch { index: 4 };
        assert_eq!(err.to_string(), "Chain mismatch at index 4");
        assert!(!LedgerError::PrematureResult.is_integrity_fault());

        let err = LedgerError::LinkConflict {
            key: "job-1".to_string(),
            existing: "ev-a".to_string(),
            requested: "ev-b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Link 'job-1' already points at 'ev-a', refusing 'ev-b'"
        );
        assert!(err.is_integrity_fault());
    }
}
