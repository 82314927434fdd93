//! Experiment families and their reference circuits

use crate::{Circuit, QuantumError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Measurement basis for two-qubit Bell tomography
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TomographyBasis {
    ZZ,
    XX,
    YY,
}

impl TomographyBasis {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ZZ => "ZZ",
            Self::XX => "XX",
            Self::YY => "YY",
        }
    }
}

impl FromStr for TomographyBasis {
    type Err = QuantumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ZZ" => Ok(Self::ZZ),
            "XX" => Ok(Self::XX),
            "YY" => Ok(Self::YY),
            _ => Err(QuantumError::UnknownBasis(s.to_string())),
        }
    }
}

/// Kind of experiment a request asks for
///
/// Each family knows how many qubits it needs and how to build its circuit.
///
/// # Example
/// ```
/// use qproof_core::ExperimentFamily;
///
/// let family = ExperimentFamily::Ghz { qubits: 4 };
/// assert_eq!(family.min_qubits(), 4);
///
/// let circuit = family.build_circuit(Some("req-7")).unwrap();
/// assert_eq!(circuit.num_qubits(), 4);
/// assert_eq!(circuit.metadata().family.as_deref(), Some("ghz"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ExperimentFamily {
    /// |Φ⁺⟩ preparation and measurement
    Bell,
    /// n-qubit GHZ state
    Ghz { qubits: usize },
    /// Bell state idled for `delay_us` before measurement
    BellDelay { delay_us: f64 },
    /// Bell state idled, rotated into `basis`, then measured
    Tomography { basis: TomographyBasis, delay_us: f64 },
}

impl ExperimentFamily {
    /// Stable tag recorded in circuit metadata
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Bell => "bell",
            Self::Ghz { .. } => "ghz",
            Self::BellDelay { .. } => "bell_delay",
            Self::Tomography { .. } => "tomography",
        }
    }

    /// Minimum backend capacity required to run this family
    pub const fn min_qubits(&self) -> usize {
        match self {
            Self::Ghz { qubits } => *qubits,
            Self::Bell | Self::BellDelay { .. } | Self::Tomography { .. } => 2,
        }
    }

    /// Same family with the idle period replaced, for delay sweeps
    ///
    /// `Bell` becomes `BellDelay`. Returns `None` for families without an
    /// idle period (GHZ).
    pub fn with_delay(&self, delay_us: f64) -> Option<Self> {
        match self {
            Self::Bell | Self::BellDelay { .. } => Some(Self::BellDelay { delay_us }),
            Self::Tomography { basis, .. } => Some(Self::Tomography {
                basis: *basis,
                delay_us,
            }),
            Self::Ghz { .. } => None,
        }
    }

    /// Build and validate this family's circuit
    ///
    /// # Errors
    /// Returns `QuantumError::MalformedCircuit` for degenerate parameters
    /// (zero-qubit GHZ, negative or non-finite delay).
    pub fn build_circuit(&self, request_id: Option<&str>) -> Result<Circuit> {
        let mut builder = match self {
            Self::Bell => {
                let mut b = Circuit::builder("bell", 2, 2);
                b.h(0).cx(0, 1);
                b
            }
            Self::Ghz { qubits } => {
                let n = *qubits;
                let mut b = Circuit::builder(format!("ghz_{}", n), n, n);
                if n > 0 {
                    b.h(0);
                }
                for i in 1..n {
                    b.cx(i - 1, i);
                }
                b
            }
            Self::BellDelay { delay_us } => {
                let mut b = Circuit::builder(format!("bell_delay_{}us", delay_us), 2, 2);
                b.h(0).cx(0, 1).delay(0, *delay_us).delay(1, *delay_us);
                b
            }
            Self::Tomography { basis, delay_us } => {
                let mut b = Circuit::builder(
                    format!("tomography_{}_{}us", basis.as_str(), delay_us),
                    2,
                    2,
                );
                b.h(0).cx(0, 1).delay(0, *delay_us).delay(1, *delay_us);
                match basis {
                    TomographyBasis::ZZ => {}
                    TomographyBasis::XX => {
                        b.h(0).h(1);
                    }
                    TomographyBasis::YY => {
                        b.sdg(0).h(0).sdg(1).h(1);
                    }
                }
                b
            }
        };
        builder.measure_all().family(self.tag());
        if let Some(id) = request_id {
            builder.request_id(id);
        }
        builder.build()
    }
}

impl fmt::Display for ExperimentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bell => write!(f, "bell"),
            Self::Ghz { qubits } => write!(f, "ghz({})", qubits),
            Self::BellDelay { delay_us } => write!(f, "bell_delay({}us)", delay_us),
            Self::Tomography { basis, delay_us } => {
                write!(f, "tomography({}, {}us)", basis.as_str(), delay_us)
            }
        }
    }
}

/// Bell-state fidelity estimate `P(00) + P(11)` with its binomial standard error
///
/// Only the two lowest-order bits of each key (qubits 0 and 1, rightmost
/// characters) are considered. Empty counts give `(0.0, 1.0)`.
pub fn bell_fidelity(counts: &BTreeMap<String, u64>) -> (f64, f64) {
    let total = count_total(counts.values());
    if total == 0 {
        return (0.0, 1.0);
    }
    let correlated = count_total(
        counts
            .iter()
            .filter(|(key, _)| matches!(low_pair(key), Some("00") | Some("11")))
            .map(|(_, n)| n),
    );
    let total = total as f64;
    let fidelity = correlated as f64 / total;
    let std_err = (fidelity * (1.0 - fidelity) / total).sqrt();
    (fidelity, std_err)
}

/// Parity expectation `<P> = P(even) - P(odd)` over the two lowest-order bits
pub fn parity_expectation(counts: &BTreeMap<String, u64>) -> f64 {
    let total = count_total(counts.values());
    if total == 0 {
        return 0.0;
    }
    let mut even = 0u128;
    let mut odd = 0u128;
    for (key, n) in counts {
        match low_pair(key) {
            Some("00") | Some("11") => even += u128::from(*n),
            Some("01") | Some("10") => odd += u128::from(*n),
            _ => {}
        }
    }
    (even as f64 - odd as f64) / total as f64
}

/// Full Bell fidelity from ZZ, XX and YY tomography counts:
/// `F = (<ZZ> + <XX> - <YY> + 1) / 4`
pub fn tomography_fidelity(
    zz: &BTreeMap<String, u64>,
    xx: &BTreeMap<String, u64>,
    yy: &BTreeMap<String, u64>,
) -> f64 {
    (parity_expectation(zz) + parity_expectation(xx) - parity_expectation(yy) + 1.0) / 4.0
}

/// Fidelity measured at one delay of a sweep
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub delay_us: f64,
    pub fidelity: f64,
    pub std_err: f64,
}

impl SweepPoint {
    /// Point from raw counts via [`bell_fidelity`]
    pub fn from_counts(delay_us: f64, counts: &BTreeMap<String, u64>) -> Self {
        let (fidelity, std_err) = bell_fidelity(counts);
        Self {
            delay_us,
            fidelity,
            std_err,
        }
    }
}

/// Pre-registered parameters for [`detect_revival`]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevivalCriteria {
    /// Inclusive analysis window in microseconds
    pub window_us: (f64, f64),
    /// Delay at which the revival peak is predicted
    pub predicted_peak_us: f64,
    pub tolerance_us: f64,
    /// Minimum z-score for a detection
    pub sigma_threshold: f64,
}

impl Default for RevivalCriteria {
    /// 20-80 us window, peak at phi^8 us within 5 us, 5 sigma
    fn default() -> Self {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        Self {
            window_us: (20.0, 80.0),
            predicted_peak_us: phi.powi(8),
            tolerance_us: 5.0,
            sigma_threshold: 5.0,
        }
    }
}

/// Outcome of [`detect_revival`]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevivalAnalysis {
    pub dip_us: f64,
    pub peak_us: f64,
    pub dip_fidelity: f64,
    pub peak_fidelity: f64,
    pub delta: f64,
    pub sigma: f64,
    pub z_score: f64,
    pub detected: bool,
    pub within_tolerance: bool,
}

impl RevivalAnalysis {
    fn none(dip: Option<&SweepPoint>) -> Self {
        let (delay, fidelity) = dip.map_or((0.0, 0.0), |p| (p.delay_us, p.fidelity));
        Self {
            dip_us: delay,
            peak_us: delay,
            dip_fidelity: fidelity,
            peak_fidelity: fidelity,
            delta: 0.0,
            sigma: 1.0,
            z_score: 0.0,
            detected: false,
            within_tolerance: false,
        }
    }
}

/// Look for a fidelity revival: a dip followed by a significantly higher peak
///
/// Points outside the window are ignored. Fewer than three windowed points,
/// or a dip at the last windowed delay, yields no detection. The dip is the
/// lowest fidelity; the peak is the highest fidelity strictly after it. Ties
/// keep the earliest delay.
pub fn detect_revival(points: &[SweepPoint], criteria: &RevivalCriteria) -> RevivalAnalysis {
    let (lo, hi) = criteria.window_us;
    let mut windowed: Vec<&SweepPoint> = points
        .iter()
        .filter(|p| p.delay_us >= lo && p.delay_us <= hi)
        .collect();
    if windowed.len() < 3 {
        return RevivalAnalysis::none(None);
    }
    windowed.sort_by(|a, b| a.delay_us.total_cmp(&b.delay_us));

    let mut dip = windowed[0];
    for &point in &windowed[1..] {
        if point.fidelity < dip.fidelity {
            dip = point;
        }
    }

    let mut after = windowed.iter().copied().filter(|p| p.delay_us > dip.delay_us);
    let Some(mut peak) = after.next() else {
        return RevivalAnalysis::none(Some(dip));
    };
    for point in after {
        if point.fidelity > peak.fidelity {
            peak = point;
        }
    }

    let delta = peak.fidelity - dip.fidelity;
    let sigma = (peak.std_err.powi(2) + dip.std_err.powi(2)).sqrt();
    let z_score = if sigma > 0.0 { delta / sigma } else { 0.0 };
    RevivalAnalysis {
        dip_us: dip.delay_us,
        peak_us: peak.delay_us,
        dip_fidelity: dip.fidelity,
        peak_fidelity: peak.fidelity,
        delta,
        sigma,
        z_score,
        detected: delta > 0.0 && z_score >= criteria.sigma_threshold,
        within_tolerance: (peak.delay_us - criteria.predicted_peak_us).abs()
            < criteria.tolerance_us,
    }
}

fn count_total<'a>(counts: impl Iterator<Item = &'a u64>) -> u128 {
    counts.map(|n| u128::from(*n)).sum()
}

fn low_pair(key: &str) -> Option<&str> {
    key.len().checked_sub(2).and_then(|start| key.get(start..))
}
