//! Execution modes, evidence classes and policy traces

use crate::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-wide execution mode
///
/// Read once from configuration at the start of a request and never changed
/// while that request is in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Development: every result is synthetic and watermarked
    #[serde(rename = "DEV")]
    Dev,
    /// Hardware: results come from a quantum processor
    #[serde(rename = "QPU")]
    Qpu,
}

impl ExecutionMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Qpu => "QPU",
        }
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Dev
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(Self::Dev),
            "QPU" => Ok(Self::Qpu),
            _ => Err(LedgerError::InvalidMode(s.to_string())),
        }
    }
}

/// Trust grade of a ledger entry
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EvidenceClass {
    /// Hardware-validated and sealed into the chain
    #[serde(rename = "CLASS_A")]
    ClassA,
    /// Submitted to hardware, result pending
    #[serde(rename = "CLASS_B")]
    ClassB,
    /// Synthetic, DEV only, permanently watermarked
    #[serde(rename = "CLASS_C")]
    ClassC,
}

impl EvidenceClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClassA => "CLASS_A",
            Self::ClassB => "CLASS_B",
            Self::ClassC => "CLASS_C",
        }
    }

    /// Byte bound into the chain digest
    pub const fn tag(&self) -> u8 {
        match self {
            Self::ClassA => b'A',
            Self::ClassB => b'B',
            Self::ClassC => b'C',
        }
    }

    /// `CLASS_A` and `CLASS_C` entries never change again
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::ClassB)
    }
}

impl fmt::Display for EvidenceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recorded justification for a backend-selection decision
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTrace {
    pub selected_backend: Option<String>,
    /// Reason codes in decision order
    pub reason_codes: Vec<String>,
    pub policy_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("dev".parse::<ExecutionMode>().unwrap(), ExecutionMode::Dev);
        assert_eq!(" QPU ".parse::<ExecutionMode>().unwrap(), ExecutionMode::Qpu);
        assert!(matches!(
            "prod".parse::<ExecutionMode>(),
            Err(LedgerError::InvalidMode(_))
        ));
        assert_eq!(ExecutionMode::default(), ExecutionMode::Dev);
    }

    #[test]
    fn test_class_strings_are_stable() {
        assert_eq!(
            serde_json::to_string(&EvidenceClass::ClassA).unwrap(),
            "\"CLASS_A\""
        );
        assert_eq!(EvidenceClass::ClassC.to_string(), "CLASS_C");
        assert_eq!(serde_json::to_string(&ExecutionMode::Qpu).unwrap(), "\"QPU\"");
    }

    #[test]
    fn test_terminal_classes() {
        assert!(EvidenceClass::ClassA.is_terminal());
        assert!(!EvidenceClass::ClassB.is_terminal());
        assert!(EvidenceClass::ClassC.is_terminal());
        assert_ne!(EvidenceClass::ClassA.tag(), EvidenceClass::ClassC.tag());
    }
}
