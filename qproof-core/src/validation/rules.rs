//! Structural rules every gate must satisfy

use crate::{ClbitId, Gate, QubitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single structural problem found in a circuit
///
/// `gate_index` is the position of the offending gate in the circuit's gate
/// sequence, so a caller can point at the exact instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    /// Circuit declared with zero qubits
    NoQubits,
    QubitOutOfRange {
        gate_index: usize,
        qubit: QubitId,
        num_qubits: usize,
    },
    ClbitOutOfRange {
        gate_index: usize,
        clbit: ClbitId,
        num_clbits: usize,
    },
    /// Two-qubit gate whose control and target coincide
    ControlEqualsTarget { gate_index: usize, qubit: QubitId },
    EmptyBarrier { gate_index: usize },
    DuplicateBarrierQubit { gate_index: usize, qubit: QubitId },
    NonFiniteAngle { gate_index: usize },
    /// Delay duration negative, NaN or infinite
    InvalidDelay { gate_index: usize },
}

impl Violation {
    /// Gate position the violation refers to (`None` for circuit-level rules)
    pub fn gate_index(&self) -> Option<usize> {
        match self {
            Self::NoQubits => None,
            Self::QubitOutOfRange { gate_index, .. }
            | Self::ClbitOutOfRange { gate_index, .. }
            | Self::ControlEqualsTarget { gate_index, .. }
            | Self::EmptyBarrier { gate_index }
            | Self::DuplicateBarrierQubit { gate_index, .. }
            | Self::NonFiniteAngle { gate_index }
            | Self::InvalidDelay { gate_index } => Some(*gate_index),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoQubits => write!(f, "circuit must declare at least one qubit"),
            Self::QubitOutOfRange {
                gate_index,
                qubit,
                num_qubits,
            } => write!(
                f,
                "gate {}: {} out of range (circuit has {} qubits)",
                gate_index, qubit, num_qubits
            ),
            Self::ClbitOutOfRange {
                gate_index,
                clbit,
                num_clbits,
            } => write!(
                f,
                "gate {}: {} out of range (circuit has {} classical bits)",
                gate_index, clbit, num_clbits
            ),
            Self::ControlEqualsTarget { gate_index, qubit } => write!(
                f,
                "gate {}: control and target are both {}",
                gate_index, qubit
            ),
            Self::EmptyBarrier { gate_index } => {
                write!(f, "gate {}: barrier with no qubits", gate_index)
            }
            Self::DuplicateBarrierQubit { gate_index, qubit } => {
                write!(f, "gate {}: barrier lists {} twice", gate_index, qubit)
            }
            Self::NonFiniteAngle { gate_index } => {
                write!(f, "gate {}: rotation angle is not finite", gate_index)
            }
            Self::InvalidDelay { gate_index } => write!(
                f,
                "gate {}: delay must be a finite, non-negative duration",
                gate_index
            ),
        }
    }
}

/// Append every violation of `gate` to `out`
pub(crate) fn check_gate(
    gate_index: usize,
    gate: &Gate,
    num_qubits: usize,
    num_clbits: usize,
    out: &mut Vec<Violation>,
) {
    for qubit in gate.qubits() {
        if qubit.index() >= num_qubits {
            out.push(Violation::QubitOutOfRange {
                gate_index,
                qubit,
                num_qubits,
            });
        }
    }

    match gate {
        Gate::Two {
            control, target, ..
        } if control == target => {
            out.push(Violation::ControlEqualsTarget {
                gate_index,
                qubit: *control,
            });
        }
        Gate::Rotation { angle, .. } if !angle.is_finite() => {
            out.push(Violation::NonFiniteAngle { gate_index });
        }
        Gate::Barrier { qubits } => {
            if qubits.is_empty() {
                out.push(Violation::EmptyBarrier { gate_index });
            }
            let mut seen = BTreeSet::new();
            for qubit in qubits {
                if !seen.insert(*qubit) {
                    out.push(Violation::DuplicateBarrierQubit {
                        gate_index,
                        qubit: *qubit,
                    });
                }
            }
        }
        Gate::Delay { duration_us, .. } if !duration_us.is_finite() || *duration_us < 0.0 => {
            out.push(Violation::InvalidDelay { gate_index });
        }
        Gate::Measure { clbit, .. } if clbit.index() >= num_clbits => {
            out.push(Violation::ClbitOutOfRange {
                gate_index,
                clbit: *clbit,
                num_clbits,
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RotationKind, TwoQubitKind};

    fn check(gate: Gate) -> Vec<Violation> {
        let mut out = Vec::new();
        check_gate(0, &gate, 2, 1, &mut out);
        out
    }

    #[test]
    fn test_valid_gate_has_no_violations() {
        let cx = Gate::Two {
            kind: TwoQubitKind::CX,
            control: QubitId::new(0),
            target: QubitId::new(1),
        };
        assert!(check(cx).is_empty());
    }

    #[test]
    fn test_two_qubit_gate_reports_range_and_equality() {
        let bad = Gate::Two {
            kind: TwoQubitKind::CZ,
            control: QubitId::new(4),
            target: QubitId::new(4),
        };
        let v = check(bad);
        // both operands out of range, plus control == target
        assert_eq!(v.len(), 3);
        assert!(matches!(v[2], Violation::ControlEqualsTarget { .. }));
    }

    #[test]
    fn test_barrier_rules() {
        assert_eq!(
            check(Gate::Barrier { qubits: vec![] }),
            vec![Violation::EmptyBarrier { gate_index: 0 }]
        );
        let dup = check(Gate::Barrier {
            qubits: vec![QubitId::new(1), QubitId::new(1)],
        });
        assert_eq!(
            dup,
            vec![Violation::DuplicateBarrierQubit {
                gate_index: 0,
                qubit: QubitId::new(1)
            }]
        );
    }

    #[test]
    fn test_numeric_rules() {
        let nan = Gate::Rotation {
            kind: RotationKind::RX,
            target: QubitId::new(0),
            angle: f64::NAN,
        };
        assert_eq!(check(nan), vec![Violation::NonFiniteAngle { gate_index: 0 }]);

        let negative = Gate::Delay {
            qubit: QubitId::new(0),
            duration_us: -1.0,
        };
        assert_eq!(check(negative), vec![Violation::InvalidDelay { gate_index: 0 }]);
    }

    #[test]
    fn test_measure_clbit_range() {
        let m = Gate::Measure {
            qubit: QubitId::new(0),
            clbit: ClbitId::new(1),
        };
        let v = check(m);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].gate_index(), Some(0));
        assert!(v[0].to_string().contains("c1 out of range"));
    }
}
