//! Provider-agnostic circuit IR for qproof
//!
//! This crate provides the representation every provider consumes:
//! - [`QubitId`] / [`ClbitId`]: Type-safe qubit and classical-bit addressing
//! - [`Gate`]: Tagged instruction variants
//! - [`Circuit`]: Immutable, validated gate sequence with provenance metadata
//! - [`CircuitBuilder`]: Fluent builder finalized once by `build()`
//! - [`qasm::to_qasm`]: Deterministic OpenQASM 3 rendering
//! - [`ExperimentFamily`]: Reference circuits for the supported experiments
//!
//! # Example
//! ```
//! use qproof_core::Circuit;
//!
//! let mut builder = Circuit::builder("bell", 2, 2);
//! builder.h(0).cx(0, 1).measure_all();
//! let circuit = builder.build().unwrap();
//!
//! assert!(circuit.to_qasm().contains("h q[0];"));
//! ```

#![forbid(unsafe_code)]

pub mod circuit;
pub mod circuit_builder;
pub mod error;
pub mod family;
pub mod gate;
pub mod qasm;
pub mod qubit;
pub mod validation;

// Re-exports for convenience
pub use circuit::{new_circuit, Circuit, CircuitMetadata};
pub use circuit_builder::CircuitBuilder;
pub use error::QuantumError;
pub use family::{
    bell_fidelity, detect_revival, ExperimentFamily, RevivalAnalysis, RevivalCriteria, SweepPoint,
    TomographyBasis,
};
pub use gate::{Gate, RotationKind, SingleQubitKind, TwoQubitKind};
pub use qubit::{ClbitId, QubitId};
pub use validation::{ValidationReport, Violation};

/// Type alias for results in qproof-core
pub type Result<T> = std::result::Result<T, QuantumError>;
