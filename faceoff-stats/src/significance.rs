//! Significance Testing
//!
//! Welch's unequal-variances t-test on two raw sample arrays. The two-sided
//! p-value comes from the Student t distribution via the regularized
//! incomplete beta function.

use crate::summary::compute_summary;

/// Outcome of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    /// Welch t statistic (positive when the first sample's mean is larger)
    pub t: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

impl TTestResult {
    /// Whether the difference in means is significant at level `alpha`
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Errors from significance testing
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignificanceError {
    #[error("Sample needs at least 2 values, got {0}")]
    InsufficientSamples(usize),
    #[error("Sample contains a non-finite value")]
    NonFinite,
}

/// Welch's two-sample t-test.
///
/// When both samples have zero variance the test degenerates: equal means
/// give `p = 1`, different means give `p = 0`.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult, SignificanceError> {
    for sample in [a, b] {
        if sample.len() < 2 {
            return Err(SignificanceError::InsufficientSamples(sample.len()));
        }
        if sample.iter().any(|x| !x.is_finite()) {
            return Err(SignificanceError::NonFinite);
        }
    }

    let sa = compute_summary(a);
    let sb = compute_summary(b);
    let (na, nb) = (a.len() as f64, b.len() as f64);

    let va = sa.std_dev.powi(2) / na;
    let vb = sb.std_dev.powi(2) / nb;
    let se2 = va + vb;
    let diff = sa.mean - sb.mean;

    if se2 == 0.0 {
        let (t, p_value) = if diff == 0.0 {
            (0.0, 1.0)
        } else {
            (diff.signum() * f64::INFINITY, 0.0)
        };
        return Ok(TTestResult {
            t,
            df: na + nb - 2.0,
            p_value,
        });
    }

    let t = diff / se2.sqrt();
    let df = se2.powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));

    Ok(TTestResult {
        t,
        df,
        p_value: student_t_two_sided(t, df),
    })
}

/// Two-sided tail probability `P(|T| >= |t|)` for Student's t with `df` degrees of freedom
fn student_t_two_sided(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    regularized_incomplete_beta(x, df / 2.0, 0.5).clamp(0.0, 1.0)
}

fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges quickly only on this side of the mode
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

/// Lentz evaluation of the incomplete beta continued fraction
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 3e-16;
    const TINY: f64 = 1e-300;

    let nudge = |v: f64| if v.abs() < TINY { TINY } else { v };

    let (qab, qap, qam) = (a + b, a + 1.0, a - 1.0);
    let mut c = 1.0;
    let mut d = 1.0 / nudge(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / nudge(1.0 + aa * d);
        c = nudge(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / nudge(1.0 + aa * d);
        c = nudge(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    h
}

/// Lanczos approximation (g = 7, n = 9)
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + G + 0.5;
    let series = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ln_gamma_factorials() {
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(1.0)).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn test_student_t_reference_values() {
        // Two-sided critical values from standard tables
        assert!((student_t_two_sided(2.0, 10.0) - 0.0734).abs() < 1e-3);
        assert!((student_t_two_sided(2.228, 10.0) - 0.05).abs() < 1e-3);
        assert!((student_t_two_sided(0.0, 10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identical_samples_not_significant() {
        let samples: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let result = welch_t_test(&samples, &samples).unwrap();

        assert_eq!(result.t, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-9);
        assert!(!result.is_significant(0.05));
    }

    #[test]
    fn test_separated_samples_significant() {
        let baseline: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let candidate: Vec<f64> = (0..40).map(|i| 200.0 + (i % 7) as f64).collect();
        let result = welch_t_test(&baseline, &candidate).unwrap();

        assert!(result.t < 0.0);
        assert!(result.p_value < 1e-6);
        assert!(result.is_significant(0.05));
    }

    #[test]
    fn test_constant_samples() {
        let same = welch_t_test(&[3.0; 30], &[3.0; 30]).unwrap();
        assert_eq!(same.p_value, 1.0);

        let different = welch_t_test(&[3.0; 30], &[4.0; 30]).unwrap();
        assert_eq!(different.p_value, 0.0);
        assert!(different.t.is_infinite());
    }

    #[test]
    fn test_insufficient_samples() {
        assert!(matches!(
            welch_t_test(&[1.0], &[1.0, 2.0]),
            Err(SignificanceError::InsufficientSamples(1))
        ));
        assert!(matches!(
            welch_t_test(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(SignificanceError::NonFinite)
        ));
    }
}
