//! # qproof
//!
//! Fail-closed orchestration of quantum experiments with a tamper-evident
//! evidence ledger.
//!
//! Every request passes the [`ExecutionGate`] before anything runs. In `QPU`
//! mode the request goes to real hardware through a provider adapter and is
//! recorded as `CLASS_B`; the entry is sealed to `CLASS_A` only when the job
//! completes. In `DEV` mode counts come from the synthetic sampler and are
//! recorded as `CLASS_C`, which can never be sealed. A refused request is an
//! [`ExperimentResponse::Denied`] with a stable [`DenialCode`], never a
//! silent downgrade.
//!
//! ## Example
//!
//! ```
//! use qproof::{DenialCode, ExecutionConfig, ExperimentRequest, Orchestrator};
//! use qproof_core::ExperimentFamily;
//! use qproof_ledger::{ExecutionMode, Ledger};
//! use std::sync::Arc;
//!
//! // QPU mode without credentials is denied before any work happens
//! let config = ExecutionConfig::new(ExecutionMode::Qpu);
//! let orchestrator = Orchestrator::new(config, Arc::new(Ledger::new()));
//!
//! let response = orchestrator
//!     .submit(&ExperimentRequest::new(ExperimentFamily::Bell, 1024))
//!     .unwrap();
//! assert_eq!(response.denial_code(), Some(DenialCode::MissingHardwareCredential));
//! assert_eq!(orchestrator.chain_state().length, 0);
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod gate;
pub mod messages;
pub mod orchestrator;

pub use config::{ExecutionConfig, HardwareCredential};
pub use error::{OrchestratorError, Result};
pub use gate::{Denial, DenialCode, ExecutionGate, RequestFlags};
pub use messages::{
    policy_trace, ExperimentRequest, ExperimentResponse, PollResponse, SweepPollResponse,
    SweepRequest,
};
pub use orchestrator::Orchestrator;
