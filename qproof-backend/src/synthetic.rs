//! Synthetic sampler for DEV mode
//!
//! Produces plausible-looking counts without any hardware so the DEV path can
//! be exercised end to end. Output is always tagged `synthetic: true` and the
//! ledger records it as `CLASS_C`.
//!
//! This is deliberately not a [`QuantumProvider`](crate::QuantumProvider):
//! it cannot be wrapped in a [`ProviderAdapter`](crate::ProviderAdapter), so
//! its counts have no route into a hardware job.

use crate::{BackendCandidate, BackendError, Counts, Result};
use qproof_core::Circuit;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for the synthetic sampler
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Fixed seed for reproducible runs; random per run if unset
    pub seed: Option<u64>,

    /// Probability mass on the all-zeros/all-ones outcomes
    pub fidelity: f64,

    /// Name reported as the selected backend
    pub name: String,

    /// Capacity advertised to the selection policy
    pub max_qubits: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: None,
            fidelity: 0.95,
            name: "synthetic".to_string(),
            max_qubits: 32,
        }
    }
}

/// Output of one synthetic run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticRun {
    pub backend: String,
    pub counts: Counts,
    pub shots: u64,
    pub seed: u64,
    /// Always `true`
    pub synthetic: bool,
}

/// Seeded sampler producing synthetic counts
#[derive(Debug, Clone, Default)]
pub struct SyntheticSampler {
    config: SyntheticConfig,
}

impl SyntheticSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SyntheticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Selection-policy view of the sampler: always operational, never queued
    pub fn candidate(&self) -> BackendCandidate {
        BackendCandidate::new(self.config.name.clone(), self.config.max_qubits, 0, true)
    }

    /// Sample `shots` outcomes for `circuit`
    ///
    /// Each shot lands on all-zeros or all-ones with total probability
    /// `fidelity`, otherwise on a uniformly random bitstring of the circuit's
    /// classical width.
    ///
    /// # Errors
    /// `InvalidShots` for zero shots, `CircuitIncompatible` if the circuit has
    /// no classical bits or is wider than the sampler, `InvalidConfiguration`
    /// for a fidelity outside `[0, 1]`.
    pub fn run(&self, circuit: &Circuit, shots: u64) -> Result<SyntheticRun> {
        if shots == 0 {
            return Err(BackendError::InvalidShots(shots));
        }
        if !(0.0..=1.0).contains(&self.config.fidelity) {
            return Err(BackendError::InvalidConfiguration(format!(
                "synthetic fidelity {} outside [0, 1]",
                self.config.fidelity
            )));
        }
        circuit.validate()?;
        let width = circuit.num_clbits();
        if width == 0 {
            return Err(BackendError::CircuitIncompatible(
                "circuit has no classical bits to sample".to_string(),
            ));
        }
        if circuit.num_qubits() > self.config.max_qubits || width > 64 {
            return Err(BackendError::CircuitIncompatible(format!(
                "circuit needs {} qubits, synthetic sampler offers {}",
                circuit.num_qubits(),
                self.config.max_qubits
            )));
        }

        let seed = self.config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let zeros = "0".repeat(width);
        let ones = "1".repeat(width);

        let mut counts = Counts::new();
        for _ in 0..shots {
            let outcome = if rng.gen::<f64>() < self.config.fidelity {
                if rng.gen::<bool>() {
                    ones.clone()
                } else {
                    zeros.clone()
                }
            } else {
                (0..width)
                    .map(|_| if rng.gen::<bool>() { '1' } else { '0' })
                    .collect()
            };
            *counts.entry(outcome).or_insert(0) += 1;
        }

        Ok(SyntheticRun {
            backend: self.config.name.clone(),
            counts,
            shots,
            seed,
            synthetic: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qproof_core::ExperimentFamily;

    fn seeded(seed: u64) -> SyntheticSampler {
        SyntheticSampler::with_config(SyntheticConfig {
            seed: Some(seed),
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let circuit = ExperimentFamily::Bell.build_circuit(None).unwrap();
        let a = seeded(7).run(&circuit, 2000).unwrap();
        let b = seeded(7).run(&circuit, 2000).unwrap();
        assert_eq!(a, b);
        assert!(a.synthetic);
        assert_eq!(a.seed, 7);
        assert_eq!(a.counts.values().sum::<u64>(), 2000);
    }

    #[test]
    fn test_fidelity_shapes_distribution() {
        let circuit = ExperimentFamily::Bell.build_circuit(None).unwrap();
        let run = seeded(11).run(&circuit, 4000).unwrap();
        let (fidelity, _) = qproof_core::bell_fidelity(&run.counts);
        assert!(fidelity > 0.9, "fidelity {}", fidelity);
        assert!(run.counts.keys().all(|k| k.len() == 2));
    }

    #[test]
    fn test_rejections() {
        let circuit = ExperimentFamily::Bell.build_circuit(None).unwrap();
        assert!(matches!(seeded(1).run(&circuit, 0), Err(BackendError::InvalidShots(0))));

        let mut builder = Circuit::builder("bare", 1, 0);
        builder.h(0);
        let bare = builder.build().unwrap();
        assert!(matches!(seeded(1).run(&bare, 10), Err(BackendError::CircuitIncompatible(_))));

        let bad = SyntheticSampler::with_config(SyntheticConfig {
            fidelity: 1.5,
            ..SyntheticConfig::default()
        });
        assert!(matches!(bad.run(&circuit, 10), Err(BackendError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_candidate() {
        let candidate = SyntheticSampler::new().candidate();
        assert_eq!(candidate.name, "synthetic");
        assert!(candidate.qualifies(5));
    }
}
