//! Structural validation of circuits
//!
//! Validation never stops at the first problem: every gate is checked and all
//! violations are reported together, in gate order.

mod report;
mod rules;

pub use report::ValidationReport;
pub use rules::Violation;

use crate::Circuit;

/// Run every structural rule against `circuit`
pub fn validate(circuit: &Circuit) -> ValidationReport {
    let mut violations = Vec::new();
    if circuit.num_qubits() == 0 {
        violations.push(Violation::NoQubits);
    }
    for (index, gate) in circuit.gates().iter().enumerate() {
        rules::check_gate(
            index,
            gate,
            circuit.num_qubits(),
            circuit.num_clbits(),
            &mut violations,
        );
    }
    ValidationReport::from(violations)
}
