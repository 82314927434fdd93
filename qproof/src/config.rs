//! Execution configuration
//!
//! Everything the fail-closed gate consults: the execution mode, the two
//! override switches, the backend allowlist and per-provider hardware
//! credentials. A configuration is an explicit value; the orchestrator takes
//! one snapshot per request and nothing below it reads the environment.
//!
//! | key                          | meaning                                   |
//! |------------------------------|-------------------------------------------|
//! | `QPROOF_EXECUTION_MODE`      | `DEV` (default) or `QPU`                  |
//! | `QPROOF_ALLOW_MOCK`          | truthy: mock override                     |
//! | `QPROOF_ALLOW_SIMULATION`    | truthy: simulation override               |
//! | `QPROOF_BACKEND_ALLOWLIST`   | comma separated backend names             |
//! | `QPROOF_IBM_TOKEN`           | credential for provider `ibm`             |
//! | `QPROOF_CREDENTIAL_<NAME>`   | credential for provider `<name>`          |

use crate::{OrchestratorError, Result};
use qproof_ledger::ExecutionMode;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const ENV_MODE: &str = "QPROOF_EXECUTION_MODE";
pub const ENV_ALLOW_MOCK: &str = "QPROOF_ALLOW_MOCK";
pub const ENV_ALLOW_SIMULATION: &str = "QPROOF_ALLOW_SIMULATION";
pub const ENV_ALLOWLIST: &str = "QPROOF_BACKEND_ALLOWLIST";
pub const ENV_IBM_TOKEN: &str = "QPROOF_IBM_TOKEN";
pub const ENV_CREDENTIAL_PREFIX: &str = "QPROOF_CREDENTIAL_";

/// Secret credential for one hardware provider
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct HardwareCredential(String);

impl HardwareCredential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for handing to a provider transport
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for HardwareCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HardwareCredential(<redacted>)")
    }
}

/// Configuration consumed by the execution gate
///
/// # Example
/// ```
/// use qproof::ExecutionConfig;
/// use qproof_ledger::ExecutionMode;
///
/// let config = ExecutionConfig::new(ExecutionMode::Qpu)
///     .allow_backend("ibm_kyiv")
///     .with_credential("ibm", "token");
/// assert!(config.has_credential("ibm"));
/// assert!(config.is_allowlisted("ibm_kyiv"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Mock override; any value of `true` denies every request
    pub allow_mock: bool,
    /// Simulation override; denies every `QPU` request
    pub allow_simulation: bool,
    pub backend_allowlist: BTreeSet<String>,
    /// Keyed by provider name
    pub credentials: BTreeMap<String, HardwareCredential>,
}

impl ExecutionConfig {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_allow_mock(mut self, allow: bool) -> Self {
        self.allow_mock = allow;
        self
    }

    pub fn with_allow_simulation(mut self, allow: bool) -> Self {
        self.allow_simulation = allow;
        self
    }

    pub fn allow_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend_allowlist.insert(backend.into());
        self
    }

    pub fn with_allowlist<I, S>(mut self, backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_allowlist
            .extend(backends.into_iter().map(Into::into));
        self
    }

    pub fn with_credential(mut self, provider: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials
            .insert(provider.into(), HardwareCredential::new(secret));
        self
    }

    #[inline]
    pub fn is_allowlisted(&self, backend: &str) -> bool {
        self.backend_allowlist.contains(backend)
    }

    /// A non-blank credential exists for `provider`
    pub fn has_credential(&self, provider: &str) -> bool {
        self.credentials
            .get(provider)
            .map_or(false, |c| !c.is_blank())
    }

    /// At least one provider has a non-blank credential
    pub fn has_any_credential(&self) -> bool {
        self.credentials.values().any(|c| !c.is_blank())
    }

    pub fn credential(&self, provider: &str) -> Option<&HardwareCredential> {
        self.credentials.get(provider).filter(|c| !c.is_blank())
    }

    /// Read the process environment
    ///
    /// # Errors
    /// `Configuration` for an unparseable mode or boolean.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables, including generic
    /// `QPROOF_CREDENTIAL_<NAME>` entries
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let mut config = Self::from_lookup(|key| vars.get(key).cloned())?;
        for (key, value) in &vars {
            if let Some(provider) = key.strip_prefix(ENV_CREDENTIAL_PREFIX) {
                if !provider.is_empty() && !value.trim().is_empty() {
                    config
                        .credentials
                        .insert(provider.to_ascii_lowercase(), HardwareCredential::new(value.trim()));
                }
            }
        }
        Ok(config)
    }

    /// Build from a key lookup
    ///
    /// Reads the fixed keys only; generic `QPROOF_CREDENTIAL_<NAME>` entries
    /// need [`from_vars`](Self::from_vars), which can enumerate keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup(ENV_MODE) {
            Some(raw) if !raw.trim().is_empty() => raw
                .parse::<ExecutionMode>()
                .map_err(|e| OrchestratorError::Configuration(format!("{}: {}", ENV_MODE, e)))?,
            _ => ExecutionMode::Dev,
        };

        let mut config = Self::new(mode)
            .with_allow_mock(parse_flag(ENV_ALLOW_MOCK, lookup(ENV_ALLOW_MOCK))?)
            .with_allow_simulation(parse_flag(ENV_ALLOW_SIMULATION, lookup(ENV_ALLOW_SIMULATION))?);

        if let Some(list) = lookup(ENV_ALLOWLIST) {
            config = config.with_allowlist(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        if let Some(token) = lookup(ENV_IBM_TOKEN).filter(|t| !t.trim().is_empty()) {
            config = config.with_credential("ibm", token.trim());
        }
        Ok(config)
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OrchestratorError::Configuration(format!(
            "{}: '{}' is not a boolean",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_dev_and_closed() {
        let config = ExecutionConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config.mode, ExecutionMode::Dev);
        assert!(!config.allow_mock);
        assert!(!config.allow_simulation);
        assert!(config.backend_allowlist.is_empty());
        assert!(!config.has_any_credential());
    }

    #[test]
    fn test_full_environment() {
        let config = ExecutionConfig::from_vars(vars(&[
            ("QPROOF_EXECUTION_MODE", " qpu "),
            ("QPROOF_ALLOW_MOCK", "No"),
            ("QPROOF_ALLOW_SIMULATION", "ON"),
            ("QPROOF_BACKEND_ALLOWLIST", "ibm_kyiv, ibm_fez,,"),
            ("QPROOF_IBM_TOKEN", "tok-1"),
            ("QPROOF_CREDENTIAL_IONQ", "tok-2"),
            ("QPROOF_CREDENTIAL_BLANK", "  "),
        ]))
        .unwrap();
        assert_eq!(config.mode, ExecutionMode::Qpu);
        assert!(!config.allow_mock);
        assert!(config.allow_simulation);
        assert_eq!(config.backend_allowlist.len(), 2);
        assert!(config.is_allowlisted("ibm_fez"));
        assert_eq!(config.credential("ibm").unwrap().expose(), "tok-1");
        assert!(config.has_credential("ionq"));
        assert!(!config.has_credential("blank"));
    }

    #[test]
    fn test_bad_values_are_errors() {
        let err = ExecutionConfig::from_vars(vars(&[("QPROOF_EXECUTION_MODE", "SIM")])).unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
        let err = ExecutionConfig::from_vars(vars(&[("QPROOF_ALLOW_MOCK", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("QPROOF_ALLOW_MOCK"));
    }

    #[test]
    fn test_from_lookup_closure() {
        let config = ExecutionConfig::from_lookup(|key| match key {
            "QPROOF_EXECUTION_MODE" => Some("QPU".to_string()),
            "QPROOF_ALLOW_MOCK" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.mode, ExecutionMode::Qpu);
        assert!(config.allow_mock);
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let config = ExecutionConfig::new(ExecutionMode::Qpu).with_credential("ibm", "very-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
