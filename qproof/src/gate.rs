//! Fail-closed execution gate
//!
//! The first thing every request meets. The gate holds one configuration
//! snapshot and answers two questions: may anything run in this environment,
//! and may this particular request run. Any failed check is a [`Denial`] with
//! a stable [`DenialCode`]; there is no path that downgrades to a weaker mode.

use crate::ExecutionConfig;
use qproof_ledger::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Stable cause of a denial
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialCode {
    /// The mock override is set; denied in every mode
    MockOverrideEnabled,
    /// The simulation override is set while in `QPU` mode
    SimulationOverrideInQpu,
    /// `QPU` mode without any hardware credential
    MissingHardwareCredential,
    /// A `QPU` request asked for `simulate` or `mock`
    SimulationRequestedInQpu,
    /// Requested backend is not on the allowlist
    BackendNotAllowlisted,
    /// Selection found no operational backend with enough qubits
    NoQualifyingBackend,
    /// A provider adapter refused the backend as a simulator
    SimulatedBackendRejected,
}

impl DenialCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MockOverrideEnabled => "MOCK_OVERRIDE_ENABLED",
            Self::SimulationOverrideInQpu => "SIMULATION_OVERRIDE_IN_QPU",
            Self::MissingHardwareCredential => "MISSING_HARDWARE_CREDENTIAL",
            Self::SimulationRequestedInQpu => "SIMULATION_REQUESTED_IN_QPU",
            Self::BackendNotAllowlisted => "BACKEND_NOT_ALLOWLISTED",
            Self::NoQualifyingBackend => "NO_QUALIFYING_BACKEND",
            Self::SimulatedBackendRejected => "SIMULATED_BACKEND_REJECTED",
        }
    }
}

impl fmt::Display for DenialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused request
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {detail}")]
pub struct Denial {
    pub code: DenialCode,
    /// Human-readable context; assert on `code`, not on this
    pub detail: String,
}

impl Denial {
    pub fn new(code: DenialCode, detail: impl Into<String>) -> Self {
        let denial = Self {
            code,
            detail: detail.into(),
        };
        warn!(code = code.as_str(), detail = %denial.detail, "request denied");
        denial
    }
}

/// Per-request flags asking for non-hardware execution
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RequestFlags {
    pub simulate: bool,
    pub mock: bool,
}

/// Gate holding one configuration snapshot
#[derive(Debug, Clone)]
pub struct ExecutionGate {
    config: ExecutionConfig,
}

impl ExecutionGate {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Environment-level checks, in order:
    /// 1. mock override set (any mode)
    /// 2. `QPU` with the simulation override set
    /// 3. `QPU` without a hardware credential
    ///
    /// # Example
    /// ```
    /// use qproof::{DenialCode, ExecutionConfig, ExecutionGate};
    /// use qproof_ledger::ExecutionMode;
    ///
    /// let gate = ExecutionGate::new(ExecutionConfig::new(ExecutionMode::Qpu));
    /// let denial = gate.check_environment().unwrap_err();
    /// assert_eq!(denial.code, DenialCode::MissingHardwareCredential);
    /// ```
    pub fn check_environment(&self) -> Result<(), Denial> {
        if self.config.allow_mock {
            return Err(Denial::new(
                DenialCode::MockOverrideEnabled,
                "mock override is set",
            ));
        }
        if self.mode() == ExecutionMode::Qpu {
            if self.config.allow_simulation {
                return Err(Denial::new(
                    DenialCode::SimulationOverrideInQpu,
                    "simulation override is set in QPU mode",
                ));
            }
            if !self.config.has_any_credential() {
                return Err(Denial::new(
                    DenialCode::MissingHardwareCredential,
                    "QPU mode requires a hardware credential",
                ));
            }
        }
        Ok(())
    }

    /// Request-level checks
    ///
    /// Denies `simulate`/`mock` in `QPU` mode, and any explicitly requested
    /// backend that is not allowlisted.
    pub fn validate_request(&self, requested_backend: Option<&str>, flags: RequestFlags) -> Result<(), Denial> {
        if self.mode() == ExecutionMode::Qpu && (flags.simulate || flags.mock) {
            return Err(Denial::new(
                DenialCode::SimulationRequestedInQpu,
                format!(
                    "QPU request carries simulate={} mock={}",
                    flags.simulate, flags.mock
                ),
            ));
        }
        if let Some(backend) = requested_backend {
            if !self.config.is_allowlisted(backend) {
                return Err(Denial::new(
                    DenialCode::BackendNotAllowlisted,
                    format!("backend '{}' is not allowlisted", backend),
                ));
            }
        }
        Ok(())
    }

    /// Both checks, environment first
    pub fn admit(&self, requested_backend: Option<&str>, flags: RequestFlags) -> Result<(), Denial> {
        self.check_environment()?;
        self.validate_request(requested_backend, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qpu() -> ExecutionConfig {
        ExecutionConfig::new(ExecutionMode::Qpu)
            .with_credential("ibm", "tok")
            .allow_backend("ibm_kyiv")
    }

    #[test]
    fn test_mock_override_denied_in_every_mode() {
        for mode in [ExecutionMode::Dev, ExecutionMode::Qpu] {
            let gate = ExecutionGate::new(qpu().with_allow_mock(true));
            let gate = ExecutionGate::new(ExecutionConfig { mode, ..gate.config().clone() });
            assert_eq!(gate.check_environment().unwrap_err().code, DenialCode::MockOverrideEnabled);
        }
    }

    #[test]
    fn test_simulation_override_only_matters_in_qpu() {
        let gate = ExecutionGate::new(qpu().with_allow_simulation(true));
        assert_eq!(gate.check_environment().unwrap_err().code, DenialCode::SimulationOverrideInQpu);

        let dev = ExecutionGate::new(ExecutionConfig::new(ExecutionMode::Dev).with_allow_simulation(true));
        assert!(dev.check_environment().is_ok());
    }

    #[test]
    fn test_missing_credential() {
        let gate = ExecutionGate::new(ExecutionConfig::new(ExecutionMode::Qpu).with_credential("ibm", " "));
        assert_eq!(gate.check_environment().unwrap_err().code, DenialCode::MissingHardwareCredential);
        assert!(ExecutionGate::new(ExecutionConfig::default()).check_environment().is_ok());
    }

    #[test]
    fn test_qpu_refuses_simulation_flags() {
        let gate = ExecutionGate::new(qpu());
        for flags in [
            RequestFlags { simulate: true, mock: false },
            RequestFlags { simulate: false, mock: true },
            RequestFlags { simulate: true, mock: true },
        ] {
            assert_eq!(
                gate.validate_request(None, flags).unwrap_err().code,
                DenialCode::SimulationRequestedInQpu
            );
        }
        assert!(gate.validate_request(Some("ibm_kyiv"), RequestFlags::default()).is_ok());
    }

    #[test]
    fn test_allowlist() {
        let gate = ExecutionGate::new(qpu());
        let denial = gate.validate_request(Some("ibm_fez"), RequestFlags::default()).unwrap_err();
        assert_eq!(denial.code, DenialCode::BackendNotAllowlisted);
        assert!(denial.to_string().starts_with("BACKEND_NOT_ALLOWLISTED"));
    }

    #[test]
    fn test_admit_checks_environment_first() {
        let gate = ExecutionGate::new(qpu().with_allow_mock(true));
        let denial = gate
            .admit(Some("ibm_fez"), RequestFlags { simulate: true, mock: false })
            .unwrap_err();
        assert_eq!(denial.code, DenialCode::MockOverrideEnabled);
    }

    #[test]
    fn test_code_serde() {
        assert_eq!(
            serde_json::to_string(&DenialCode::SimulationRequestedInQpu).unwrap(),
            "\"SIMULATION_REQUESTED_IN_QPU\""
        );
    }
}
