//! Backend selection policy
//!
//! Chooses a hardware target from a set of candidates. [`select`] is a pure
//! function: no hidden state, no randomness. Identical inputs always yield
//! identical decisions, which is what lets a decision be recorded verbatim as
//! a policy trace.

use crate::BackendCandidate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version tag stamped on every decision
pub const POLICY_VERSION: &str = "qproof-policy/1";

/// Why the policy decided what it decided
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// The explicitly requested backend qualified and was chosen
    ExplicitOverride,
    /// A backend was requested explicitly but is absent, down or too small
    ExplicitRequestUnqualified,
    /// No operational candidate meets the qubit requirement
    NoQualifyingBackend,
    /// Chosen as the qualifying candidate with the shortest queue
    LeastLoaded,
}

impl ReasonCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitOverride => "EXPLICIT_OVERRIDE",
            Self::ExplicitRequestUnqualified => "EXPLICIT_REQUEST_UNQUALIFIED",
            Self::NoQualifyingBackend => "NO_QUALIFYING_BACKEND",
            Self::LeastLoaded => "LEAST_LOADED",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one selection call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Selected backend name, `None` if nothing qualified
    pub selected: Option<String>,
    /// Reasons in the order they were established
    pub reasons: Vec<ReasonCode>,
    pub policy_version: String,
}

impl PolicyDecision {
    #[inline]
    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    /// Reason codes as their stable strings
    pub fn reason_strings(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.as_str().to_string()).collect()
    }
}

/// Select a backend
///
/// 1. An `explicit` request that is present, operational and large enough
///    wins with `EXPLICIT_OVERRIDE`.
/// 2. Otherwise (recording `EXPLICIT_REQUEST_UNQUALIFIED` if a request was
///    made) candidates are filtered to operational ones with at least
///    `min_qubits`.
/// 3. No survivors: no selection, `NO_QUALIFYING_BACKEND`.
/// 4. Else the lowest `pending_jobs` wins with `LEAST_LOADED`, ties broken by
///    name.
///
/// # Example
/// ```
/// use qproof_backend::{select, BackendCandidate, ReasonCode};
///
/// let candidates = [
///     BackendCandidate::new("A", 5, 10, true),
///     BackendCandidate::new("B", 5, 2, true),
/// ];
/// let decision = select(&candidates, 5, None);
/// assert_eq!(decision.selected.as_deref(), Some("B"));
/// assert_eq!(decision.reasons, vec![ReasonCode::LeastLoaded]);
/// ```
pub fn select(
    candidates: &[BackendCandidate],
    min_qubits: usize,
    explicit: Option<&str>,
) -> PolicyDecision {
    let mut reasons = Vec::new();

    if let Some(requested) = explicit {
        let hit = candidates
            .iter()
            .find(|c| c.name == requested && c.qualifies(min_qubits));
        if let Some(candidate) = hit {
            return decision(Some(candidate.name.clone()), vec![ReasonCode::ExplicitOverride]);
        }
        reasons.push(ReasonCode::ExplicitRequestUnqualified);
    }

    let best = candidates
        .iter()
        .filter(|c| c.qualifies(min_qubits))
        .min_by(|a, b| {
            a.pending_jobs
                .cmp(&b.pending_jobs)
                .then_with(|| a.name.cmp(&b.name))
        });

    match best {
        Some(candidate) => {
            reasons.push(ReasonCode::LeastLoaded);
            decision(Some(candidate.name.clone()), reasons)
        }
        None => {
            reasons.push(ReasonCode::NoQualifyingBackend);
            decision(None, reasons)
        }
    }
}

fn decision(selected: Option<String>, reasons: Vec<ReasonCode>) -> PolicyDecision {
    PolicyDecision {
        selected,
        reasons,
        policy_version: POLICY_VERSION.to_string(),
    }
}
