//! Validation report aggregation

use super::rules::Violation;
use crate::{QuantumError, Result};

/// Every violation found in one pass over a circuit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Convert into `Ok(())` or a `MalformedCircuit` error carrying all violations
    ///
    /// # Errors
    /// Returns `QuantumError::MalformedCircuit` if any violation was recorded
    pub fn into_result(self, circuit_name: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(QuantumError::malformed(circuit_name, self.violations))
        }
    }

    /// Human-readable multi-line summary
    pub fn format(&self) -> String {
        if self.is_valid() {
            return "circuit validation passed\n".to_string();
        }
        let mut msg = format!(
            "circuit validation failed with {} violation(s)\n",
            self.violations.len()
        );
        for violation in &self.violations {
            msg.push_str(&format!("  - {}\n", violation));
        }
        msg
    }
}

impl From<Vec<Violation>> for ValidationReport {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.clone().into_result("c").is_ok());
        assert!(report.format().contains("passed"));
    }

    #[test]
    fn test_into_result_keeps_all_violations() {
        let mut report = ValidationReport::new();
        report.push(Violation::NoQubits);
        report.push(Violation::EmptyBarrier { gate_index: 3 });
        assert!(report.format().contains("2 violation(s)"));

        let err = report.into_result("ghz").unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }
}
