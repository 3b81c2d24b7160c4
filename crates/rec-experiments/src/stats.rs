//! Two-proportion z-test (spec §4.6). The Abramowitz-Stegun erf
//! approximation is a reproducibility contract — do not swap in a
//! different approximation or a library implementation.

const ERF_A1: f64 = 0.254829592;
const ERF_A2: f64 = -0.284496736;
const ERF_A3: f64 = 1.421413741;
const ERF_A4: f64 = -1.453152027;
const ERF_A5: f64 = 1.061405429;
const ERF_P: f64 = 0.3275911;

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + ERF_P * x);
    let poly = ((((ERF_A5 * t + ERF_A4) * t + ERF_A3) * t + ERF_A2) * t + ERF_A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    InsufficientData,
    Ship,
    Rollback,
    KeepRunning,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ZTestResult {
    pub n1: u64,
    pub n2: u64,
    pub p1: f64,
    pub p2: f64,
    pub z: f64,
    pub p_value: f64,
    pub delta: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub decision: Decision,
}

/// `(n1, s1)` is control (exposures, successes); `(n2, s2)` is treatment.
/// Default significance level alpha = 0.05.
pub fn two_proportion_z_test(n1: u64, s1: u64, n2: u64, s2: u64, alpha: f64) -> ZTestResult {
    if n1 == 0 || n2 == 0 {
        return insufficient(n1, s1, n2, s2);
    }
    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let p1 = s1 as f64 / n1f;
    let p2 = s2 as f64 / n2f;
    let pooled = (s1 + s2) as f64 / (n1f + n2f);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1f + 1.0 / n2f)).sqrt();
    if se == 0.0 {
        return insufficient(n1, s1, n2, s2);
    }
    let z = (p2 - p1) / se;
    let p_value = 2.0 * (1.0 - standard_normal_cdf(z.abs()));
    let delta = p2 - p1;
    let ci_half = 1.96 * (p1 * (1.0 - p1) / n1f + p2 * (1.0 - p2) / n2f).sqrt();

    let decision = if p_value < alpha && delta > 0.0 {
        Decision::Ship
    } else if p_value < alpha && delta < 0.0 {
        Decision::Rollback
    } else {
        Decision::KeepRunning
    };

    ZTestResult {
        n1,
        n2,
        p1,
        p2,
        z,
        p_value,
        delta,
        ci_low: delta - ci_half,
        ci_high: delta + ci_half,
        decision,
    }
}

fn insufficient(n1: u64, s1: u64, n2: u64, s2: u64) -> ZTestResult {
    ZTestResult {
        n1,
        n2,
        p1: if n1 > 0 { s1 as f64 / n1 as f64 } else { 0.0 },
        p2: if n2 > 0 { s2 as f64 / n2 as f64 } else { 0.0 },
        z: 0.0,
        p_value: 1.0,
        delta: 0.0,
        ci_low: 0.0,
        ci_high: 0.0,
        decision: Decision::InsufficientData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exposures_is_insufficient_data() {
        let result = two_proportion_z_test(0, 0, 100, 20, 0.05);
        assert_eq!(result.decision, Decision::InsufficientData);
    }

    #[test]
    fn identical_rates_keep_running() {
        let result = two_proportion_z_test(1000, 100, 1000, 100, 0.05);
        assert_eq!(result.decision, Decision::KeepRunning);
    }

    #[test]
    fn large_positive_lift_ships() {
        let result = two_proportion_z_test(1000, 100, 1000, 300, 0.05);
        assert_eq!(result.decision, Decision::Ship);
        assert!(result.delta > 0.0);
    }

    #[test]
    fn large_negative_lift_rolls_back() {
        let result = two_proportion_z_test(1000, 300, 1000, 100, 0.05);
        assert_eq!(result.decision, Decision::Rollback);
    }

    #[test]
    fn erf_matches_known_values() {
        assert!((erf(0.0) - 0.0).abs() < 1e-9);
        assert!((erf(1.0) - 0.8427).abs() < 1e-3);
    }
}
