//! Gate vocabulary shared by every provider
//!
//! Gates are plain data: a tagged variant over the instruction shapes a
//! hardware target accepts. No matrices live here; execution is delegated to
//! the provider.

use crate::{ClbitId, QubitId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Fixed single-qubit unitaries
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SingleQubitKind {
    I,
    X,
    Y,
    Z,
    H,
    S,
    Sdg,
    T,
    Tdg,
    SX,
}

impl SingleQubitKind {
    /// OpenQASM 3 mnemonic
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::I => "id",
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::H => "h",
            Self::S => "s",
            Self::Sdg => "sdg",
            Self::T => "t",
            Self::Tdg => "tdg",
            Self::SX => "sx",
        }
    }
}

/// Fixed two-qubit unitaries
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwoQubitKind {
    CX,
    CZ,
    Swap,
}

impl TwoQubitKind {
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::CX => "cx",
            Self::CZ => "cz",
            Self::Swap => "swap",
        }
    }
}

/// Parametrized single-qubit rotations (angle in radians)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationKind {
    RX,
    RY,
    RZ,
    /// Phase gate `p(θ)`
    P,
}

impl RotationKind {
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::RX => "rx",
            Self::RY => "ry",
            Self::RZ => "rz",
            Self::P => "p",
        }
    }
}

/// A single instruction in a circuit
///
/// # Example
/// ```
/// use qproof_core::{Gate, QubitId, SingleQubitKind};
///
/// let h = Gate::Single { kind: SingleQubitKind::H, target: QubitId::new(0) };
/// assert_eq!(h.qubits().as_slice(), &[QubitId::new(0)]);
/// assert!(!h.is_measurement());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Gate {
    /// Fixed single-qubit unitary
    Single {
        kind: SingleQubitKind,
        target: QubitId,
    },
    /// Fixed two-qubit unitary
    Two {
        kind: TwoQubitKind,
        control: QubitId,
        target: QubitId,
    },
    /// Parametrized rotation
    Rotation {
        kind: RotationKind,
        target: QubitId,
        angle: f64,
    },
    /// Scheduling barrier across a set of qubits
    Barrier { qubits: Vec<QubitId> },
    /// Idle period on one qubit, in microseconds
    Delay { qubit: QubitId, duration_us: f64 },
    /// Z-basis measurement into a classical bit
    Measure { qubit: QubitId, clbit: ClbitId },
}

impl Gate {
    /// Qubits this gate touches, in declaration order
    pub fn qubits(&self) -> SmallVec<[QubitId; 4]> {
        match self {
            Self::Single { target, .. } | Self::Rotation { target, .. } => {
                SmallVec::from_slice(&[*target])
            }
            Self::Two {
                control, target, ..
            } => SmallVec::from_slice(&[*control, *target]),
            Self::Barrier { qubits } => qubits.iter().copied().collect(),
            Self::Delay { qubit, .. } | Self::Measure { qubit, .. } => {
                SmallVec::from_slice(&[*qubit])
            }
        }
    }

    /// Classical bit written by this gate, if any
    #[inline]
    pub fn clbit(&self) -> Option<ClbitId> {
        match self {
            Self::Measure { clbit, .. } => Some(*clbit),
            _ => None,
        }
    }

    #[inline]
    pub fn is_measurement(&self) -> bool {
        matches!(self, Self::Measure { .. })
    }

    /// Short instruction name (`h`, `cx`, `rz`, `barrier`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single { kind, .. } => kind.mnemonic(),
            Self::Two { kind, .. } => kind.mnemonic(),
            Self::Rotation { kind, .. } => kind.mnemonic(),
            Self::Barrier { .. } => "barrier",
            Self::Delay { .. } => "delay",
            Self::Measure { .. } => "measure",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { kind, target } => write!(f, "{} {}", kind.mnemonic(), target),
            Self::Two {
                kind,
                control,
                target,
            } => write!(f, "{} {}, {}", kind.mnemonic(), control, target),
            Self::Rotation {
                kind,
                target,
                angle,
            } => write!(f, "{}({}) {}", kind.mnemonic(), angle, target),
            Self::Barrier { qubits } => {
                let list: Vec<String> = qubits.iter().map(ToString::to_string).collect();
                write!(f, "barrier {}", list.join(", "))
            }
            Self::Delay { qubit, duration_us } => write!(f, "delay[{}us] {}", duration_us, qubit),
            Self::Measure { qubit, clbit } => write!(f, "measure {} -> {}", qubit, clbit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qubits_for_each_shape() {
        let cx = Gate::Two {
            kind: TwoQubitKind::CX,
            control: QubitId::new(1),
            target: QubitId::new(0),
        };
        assert_eq!(cx.qubits().as_slice(), &[QubitId::new(1), QubitId::new(0)]);

        let barrier = Gate::Barrier {
            qubits: vec![QubitId::new(0), QubitId::new(1), QubitId::new(2)],
        };
        assert_eq!(barrier.qubits().len(), 3);

        let m = Gate::Measure {
            qubit: QubitId::new(2),
            clbit: ClbitId::new(0),
        };
        assert!(m.is_measurement());
        assert_eq!(m.clbit(), Some(ClbitId::new(0)));
        assert_eq!(cx.clbit(), None);
    }

    #[test]
    fn test_display() {
        let rz = Gate::Rotation {
            kind: RotationKind::RZ,
            target: QubitId::new(0),
            angle: 0.5,
        };
        assert_eq!(rz.to_string(), "rz(0.5) q0");
        assert_eq!(rz.name(), "rz");

        let m = Gate::Measure {
            qubit: QubitId::new(1),
            clbit: ClbitId::new(1),
        };
        assert_eq!(m.to_string(), "measure q1 -> c1");
    }

    #[test]
    fn test_serde_tagged_shape() {
        let g = Gate::Single {
            kind: SingleQubitKind::Sdg,
            target: QubitId::new(3),
        };
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["op"], "single");
        assert_eq!(json["kind"], "sdg");
        assert_eq!(json["target"], 3);

        let back: Gate = serde_json::from_value(json).unwrap();
        assert_eq!(back, g);
    }
}
