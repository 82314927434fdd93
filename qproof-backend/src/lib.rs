//! Hardware backends for qproof
//!
//! This crate decides *where* an experiment runs and is the only road to
//! real hardware:
//! - [`select`]: pure, deterministic backend selection with stable reason codes
//! - [`QuantumProvider`]: one transport per vendor (IBM Quantum REST,
//!   external process)
//! - [`ProviderAdapter`]: the uniform, fail-closed job interface on top of a
//!   provider, rejecting simulated backends and implausible count data
//! - [`SyntheticSampler`]: DEV-only synthetic counts, kept outside the
//!   provider hierarchy
//!
//! # Example
//!
//! ```
//! use qproof_backend::{select, BackendCandidate};
//!
//! let candidates = vec![
//!     BackendCandidate::new("ibm_kyiv", 127, 12, true),
//!     BackendCandidate::new("ibm_fez", 156, 3, true),
//!     BackendCandidate::new("ibm_torino", 133, 0, false),
//! ];
//! let decision = select(&candidates, 2, None);
//! assert_eq!(decision.selected.as_deref(), Some("ibm_fez"));
//! ```

pub mod adapter;
pub mod candidate;
pub mod error;
pub mod policy;
pub mod process;
pub mod provider;
pub mod result;
pub mod synthetic;

#[cfg(feature = "ibm-quantum")]
pub mod ibm_quantum;

pub use adapter::ProviderAdapter;
pub use candidate::{BackendCandidate, BackendDescriptor};
pub use error::{BackendError, Result};
pub use policy::{select, PolicyDecision, ReasonCode, POLICY_VERSION};
pub use process::ProcessProvider;
pub use provider::{is_simulated_name, ProviderJob, QuantumProvider};
pub use result::{aggregate_status, sanity_check_counts, BatchJob, Counts, Job, JobStatus};
pub use synthetic::{SyntheticConfig, SyntheticRun, SyntheticSampler};

#[cfg(feature = "ibm-quantum")]
pub use ibm_quantum::{IbmConfig, IbmQuantumProvider, IBM_PROVIDER};
