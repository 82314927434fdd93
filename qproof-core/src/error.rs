//! Error types for circuit construction

use crate::validation::Violation;
use thiserror::Error;

/// Errors that can occur while building or inspecting circuits
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantumError {
    /// The circuit failed structural validation
    ///
    /// Carries every violation found, in gate order, not just the first.
    #[error("Malformed circuit '{name}': {} violation(s): {}", violations.len(), render_violations(violations))]
    MalformedCircuit {
        name: String,
        violations: Vec<Violation>,
    },

    /// Unknown experiment family tag
    #[error("Unknown experiment family '{0}'")]
    UnknownFamily(String),

    /// Tomography basis outside ZZ/XX/YY
    #[error("Unknown tomography basis '{0}'")]
    UnknownBasis(String),
}

impl QuantumError {
    /// Create a malformed circuit error
    pub fn malformed(name: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self::MalformedCircuit {
            name: name.into(),
            violations,
        }
    }

    /// Violations carried by a `MalformedCircuit` error (empty otherwise)
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::MalformedCircuit { violations, .. } => violations,
            _ => &[],
        }
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
