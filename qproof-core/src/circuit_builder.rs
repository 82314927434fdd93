//! Fluent circuit builder
//!
//! Builder methods append exactly one gate each and never fail; all checking
//! happens once in [`CircuitBuilder::build`], so a single call reports every
//! problem in the sequence.

use crate::circuit::{Circuit, CircuitMetadata};
use crate::gate::{RotationKind, SingleQubitKind, TwoQubitKind};
use crate::{ClbitId, Gate, QubitId, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Incremental builder for [`Circuit`]
///
/// Indices are plain `usize` because circuit sizes come from runtime values
/// (experiment families, sweep configs).
///
/// # Example
/// ```
/// use qproof_core::Circuit;
///
/// let mut builder = Circuit::builder("ghz3", 3, 3);
/// builder.h(0).cx(0, 1).cx(1, 2).barrier([0, 1, 2]).measure_all();
/// let circuit = builder.build().unwrap();
/// assert_eq!(circuit.len(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct CircuitBuilder {
    name: String,
    num_qubits: usize,
    num_clbits: usize,
    gates: Vec<Gate>,
    family: Option<String>,
    request_id: Option<String>,
}

impl CircuitBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>, num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            gates: Vec::new(),
            family: None,
            request_id: None,
        }
    }

    #[inline]
    pub const fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of gates appended so far
    #[inline]
    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }

    /// Append an arbitrary gate
    pub fn push(&mut self, gate: Gate) -> &mut Self {
        self.gates.push(gate);
        self
    }

    /// Append a fixed single-qubit gate
    pub fn single(&mut self, kind: SingleQubitKind, qubit: usize) -> &mut Self {
        self.push(Gate::Single {
            kind,
            target: QubitId::new(qubit),
        })
    }

    /// Append a fixed two-qubit gate
    pub fn two(&mut self, kind: TwoQubitKind, control: usize, target: usize) -> &mut Self {
        self.push(Gate::Two {
            kind,
            control: QubitId::new(control),
            target: QubitId::new(target),
        })
    }

    /// Append a rotation
    pub fn rotation(&mut self, kind: RotationKind, qubit: usize, angle: f64) -> &mut Self {
        self.push(Gate::Rotation {
            kind,
            target: QubitId::new(qubit),
            angle,
        })
    }

    pub fn id(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::I, qubit)
    }

    pub fn x(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::X, qubit)
    }

    pub fn y(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::Y, qubit)
    }

    pub fn z(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::Z, qubit)
    }

    pub fn h(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::H, qubit)
    }

    pub fn s(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::S, qubit)
    }

    pub fn sdg(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::Sdg, qubit)
    }

    pub fn t(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::T, qubit)
    }

    pub fn tdg(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::Tdg, qubit)
    }

    pub fn sx(&mut self, qubit: usize) -> &mut Self {
        self.single(SingleQubitKind::SX, qubit)
    }

    pub fn cx(&mut self, control: usize, target: usize) -> &mut Self {
        self.two(TwoQubitKind::CX, control, target)
    }

    pub fn cz(&mut self, control: usize, target: usize) -> &mut Self {
        self.two(TwoQubitKind::CZ, control, target)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> &mut Self {
        self.two(TwoQubitKind::Swap, a, b)
    }

    pub fn rx(&mut self, qubit: usize, angle: f64) -> &mut Self {
        self.rotation(RotationKind::RX, qubit, angle)
    }

    pub fn ry(&mut self, qubit: usize, angle: f64) -> &mut Self {
        self.rotation(RotationKind::RY, qubit, angle)
    }

    pub fn rz(&mut self, qubit: usize, angle: f64) -> &mut Self {
        self.rotation(RotationKind::RZ, qubit, angle)
    }

    /// Phase gate `p(angle)`
    pub fn phase(&mut self, qubit: usize, angle: f64) -> &mut Self {
        self.rotation(RotationKind::P, qubit, angle)
    }

    /// Barrier across the given qubits
    pub fn barrier<I>(&mut self, qubits: I) -> &mut Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.push(Gate::Barrier {
            qubits: qubits.into_iter().map(QubitId::new).collect(),
        })
    }

    /// Idle `qubit` for `duration_us` microseconds
    pub fn delay(&mut self, qubit: usize, duration_us: f64) -> &mut Self {
        self.push(Gate::Delay {
            qubit: QubitId::new(qubit),
            duration_us,
        })
    }

    pub fn measure(&mut self, qubit: usize, clbit: usize) -> &mut Self {
        self.push(Gate::Measure {
            qubit: QubitId::new(qubit),
            clbit: ClbitId::new(clbit),
        })
    }

    /// Measure qubit `i` into classical bit `i` for every qubit
    pub fn measure_all(&mut self) -> &mut Self {
        for i in 0..self.num_qubits {
            self.measure(i, i);
        }
        self
    }

    /// Set the experiment family tag
    pub fn family(&mut self, tag: impl Into<String>) -> &mut Self {
        self.family = Some(tag.into());
        self
    }

    /// Link the circuit to the request that produced it
    pub fn request_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.request_id = Some(id.into());
        self
    }

    /// Freeze the gate sequence into an immutable, validated [`Circuit`]
    ///
    /// # Errors
    /// Returns `QuantumError::MalformedCircuit` listing every violation found
    pub fn build(self) -> Result<Circuit> {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let circuit = Circuit::from_parts(
            self.name,
            self.num_qubits,
            self.num_clbits,
            self.gates,
            CircuitMetadata {
                family: self.family,
                created_at,
                request_id: self.request_id,
            },
        );
        circuit.validate()?;
        Ok(circuit)
    }
}
