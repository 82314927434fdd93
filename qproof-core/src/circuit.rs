//! Quantum circuit representation

use crate::circuit_builder::CircuitBuilder;
use crate::validation::{self, ValidationReport};
use crate::{Gate, Result};
use serde::Serialize;

/// Provenance attached to a circuit
///
/// Metadata is descriptive only: it never affects the rendered wire format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CircuitMetadata {
    /// Experiment family tag (`bell`, `ghz`, ...)
    pub family: Option<String>,
    /// Unix timestamp (seconds) stamped at `build()`
    pub created_at: u64,
    /// Request that produced this circuit, if any
    pub request_id: Option<String>,
}

/// An immutable quantum circuit
///
/// Circuits are only produced by [`CircuitBuilder::build`], which validates
/// the gate sequence, so every `Circuit` in hand has in-range indices and
/// distinct two-qubit operands.
///
/// # Example
/// ```
/// use qproof_core::Circuit;
///
/// let mut builder = Circuit::builder("bell", 2, 2);
/// builder.h(0).cx(0, 1).measure_all();
/// let circuit = builder.build().unwrap();
///
/// assert_eq!(circuit.num_qubits(), 2);
/// assert_eq!(circuit.len(), 4);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Circuit {
    name: String,
    num_qubits: usize,
    num_clbits: usize,
    gates: Vec<Gate>,
    metadata: CircuitMetadata,
}

impl Circuit {
    /// Start building a circuit
    pub fn builder(name: impl Into<String>, num_qubits: usize, num_clbits: usize) -> CircuitBuilder {
        CircuitBuilder::new(name, num_qubits, num_clbits)
    }

    pub(crate) fn from_parts(
        name: String,
        num_qubits: usize,
        num_clbits: usize,
        gates: Vec<Gate>,
        metadata: CircuitMetadata,
    ) -> Self {
        Self {
            name,
            num_qubits,
            num_clbits,
            gates,
            metadata,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    #[inline]
    pub const fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    /// Get the gate sequence
    #[inline]
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    #[inline]
    pub fn metadata(&self) -> &CircuitMetadata {
        &self.metadata
    }

    /// Get the number of gates in the circuit
    #[inline]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the circuit is empty (no gates)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Count of measurement instructions
    pub fn num_measurements(&self) -> usize {
        self.gates.iter().filter(|g| g.is_measurement()).count()
    }

    /// Run every structural rule and collect the findings
    pub fn validation_report(&self) -> ValidationReport {
        validation::validate(self)
    }

    /// Validate the circuit
    ///
    /// # Errors
    /// Returns `QuantumError::MalformedCircuit` listing every violation found
    pub fn validate(&self) -> Result<()> {
        self.validation_report().into_result(&self.name)
    }

    /// Render to OpenQASM 3, see [`crate::qasm::to_qasm`]
    pub fn to_qasm(&self) -> String {
        crate::qasm::to_qasm(self)
    }
}

/// Alias for [`Circuit::builder`]
pub fn new_circuit(name: impl Into<String>, num_qubits: usize, num_clbits: usize) -> CircuitBuilder {
    Circuit::builder(name, num_qubits, num_clbits)
}
