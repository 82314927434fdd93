//! Tamper-evident evidence ledger for qproof
//!
//! Every experiment leaves exactly one [`EvidenceEntry`] in an append-only,
//! SHA-256 hash-chained log:
//! - [`canonicalize`]: order-independent byte encoding of requests and results
//! - [`digest`]: domain-separated request, result, leaf and chain digests
//! - [`apply_watermark`]: non-removable marker on synthetic (DEV) results
//! - [`Ledger`]: serialized index assignment, sealing, side index and persistence
//! - [`verify_chain`]: full recomputation reporting the first tampered index
//! - [`SignedChainHead`]: Ed25519 attestation of a chain state
//!
//! # Example
//! ```
//! use qproof_ledger::{ExecutionMode, Ledger, PolicyTrace};
//! use serde_json::json;
//!
//! let ledger = Ledger::new();
//! ledger
//!     .create_entry(&json!({"family": "bell"}), ExecutionMode::Dev, PolicyTrace::default(), Some(json!({"00": 7})))
//!     .unwrap();
//! assert_eq!(ledger.chain_state().length, 1);
//! assert!(ledger.verify().is_ok());
//! ```

#![forbid(unsafe_code)]

pub mod canonical;
pub mod digest;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod mode;
pub mod signing;
pub mod store;
pub mod watermark;

pub use canonical::{canonical_value, canonicalize};
pub use digest::Hash32;
pub use entry::{verify_chain, EvidenceEntry};
pub use error::LedgerError;
pub use ledger::{ChainState, Ledger};
pub use mode::{EvidenceClass, ExecutionMode, PolicyTrace};
pub use signing::{sign_chain_head, SignedChainHead};
pub use store::{LedgerStore, LogRecord};
pub use watermark::{apply_watermark, is_watermarked, SYNTHETIC_MARKER};

/// Type alias for results in qproof-ledger
pub type Result<T> = std::result::Result<T, LedgerError>;
