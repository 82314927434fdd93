//! Property tests for the backend selection policy

use proptest::prelude::*;
use qproof_backend::{select, BackendCandidate, ReasonCode, POLICY_VERSION};

fn candidate() -> impl Strategy<Value = BackendCandidate> {
    ("[a-e]{1,3}", 0usize..12, 0u64..50, any::<bool>())
        .prop_map(|(name, qubits, pending, operational)| {
            BackendCandidate::new(name, qubits, pending, operational)
        })
}

proptest! {
    #[test]
    fn test_never_selects_unqualified(
        candidates in prop::collection::vec(candidate(), 0..8),
        min_qubits in 0usize..12,
        explicit in prop::option::of("[a-e]{1,3}"),
    ) {
        let decision = select(&candidates, min_qubits, explicit.as_deref());
        prop_assert_eq!(decision.policy_version.as_str(), POLICY_VERSION);
        if let Some(name) = &decision.selected {
            prop_assert!(candidates
                .iter()
                .any(|c| &c.name == name && c.operational && c.qubits >= min_qubits));
        } else {
            prop_assert!(candidates.iter().all(|c| !c.qualifies(min_qubits)));
            prop_assert_eq!(decision.reasons.last(), Some(&ReasonCode::NoQualifyingBackend));
        }
    }

    #[test]
    fn test_selection_is_deterministic(
        candidates in prop::collection::vec(candidate(), 0..8),
        min_qubits in 0usize..12,
    ) {
        prop_assert_eq!(select(&candidates, min_qubits, None), select(&candidates, min_qubits, None));
    }

    #[test]
    fn test_least_loaded_is_minimal(
        candidates in prop::collection::vec(candidate(), 1..8),
        min_qubits in 0usize..12,
    ) {
        let decision = select(&candidates, min_qubits, None);
        if let Some(name) = decision.selected {
            let chosen = candidates
                .iter()
                .filter(|c| c.name == name && c.qualifies(min_qubits))
                .map(|c| c.pending_jobs)
                .min()
                .unwrap();
            prop_assert!(candidates
                .iter()
                .filter(|c| c.qualifies(min_qubits))
                .all(|c| c.pending_jobs >= chosen));
            prop_assert_eq!(decision.reasons, vec![ReasonCode::LeastLoaded]);
        }
    }
}

#[test]
fn test_documented_example_selects_b() {
    let candidates = [
        BackendCandidate::new("A", 5, 10, true),
        BackendCandidate::new("B", 5, 2, true),
    ];
    let decision = select(&candidates, 5, None);
    assert_eq!(decision.selected.as_deref(), Some("B"));
    assert_eq!(decision.reason_strings(), vec!["LEAST_LOADED".to_string()]);
}
