//! Two-sample test statistics used by drift detection.

use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test with the asymptotic p-value.
#[must_use]
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> TestResult {
    if a.is_empty() || b.is_empty() {
        return TestResult { statistic: 0.0, p_value: 1.0 };
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let v = a[i].min(b[j]);
        while i < a.len() && a[i] <= v {
            i += 1;
        }
        while j < b.len() && b[j] <= v {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    TestResult { statistic: d, p_value: kolmogorov_q(lambda) }
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_q(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    let mut prev_term = 0.0;
    for k in 1..=100_i32 {
        let kf = f64::from(k);
        let term = sign * 2.0 * (-2.0 * kf * kf * lambda * lambda).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev_term || term.abs() <= 1e-8 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        prev_term = term.abs();
    }
    // series did not converge; happens only for tiny lambda
    1.0
}

/// Pearson chi-squared goodness of fit of `current` category counts against
/// the proportions observed in `reference`.
#[must_use]
pub fn chi_square(reference: &[String], current: &[String]) -> TestResult {
    if reference.is_empty() || current.is_empty() {
        return TestResult { statistic: 0.0, p_value: 1.0 };
    }
    let mut counts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for key in reference {
        counts.entry(key).or_default().0 += 1.0;
    }
    for key in current {
        counts.entry(key).or_default().1 += 1.0;
    }
    let n_ref = reference.len() as f64;
    let n_cur = current.len() as f64;

    let mut statistic = 0.0;
    for (ref_count, cur_count) in counts.values() {
        let expected = ref_count / n_ref * n_cur;
        if expected == 0.0 {
            return TestResult { statistic: f64::INFINITY, p_value: 0.0 };
        }
        statistic += (cur_count - expected).powi(2) / expected;
    }
    let dof = counts.len().saturating_sub(1);
    if dof == 0 {
        return TestResult { statistic, p_value: 1.0 };
    }
    TestResult { statistic, p_value: chi_square_sf(statistic, dof as f64) }
}

/// Chi-squared survival function with `dof` degrees of freedom.
#[must_use]
pub fn chi_square_sf(x: f64, dof: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    ChiSquared::new(dof).map_or(1.0, |dist| dist.sf(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ks_identical_samples() {
        let a: Vec<f64> = (0..50_i32).map(f64::from).collect();
        let r = ks_two_sample(&a, &a);
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples_drift() {
        let a: Vec<f64> = (0..50_i32).map(f64::from).collect();
        let b: Vec<f64> = (100..150_i32).map(f64::from).collect();
        let r = ks_two_sample(&a, &b);
        assert_eq!(r.statistic, 1.0);
        assert!(r.p_value < 1e-6);
    }

    #[test]
    fn test_chi_square_sf_known_values() {
        // chi2.sf(3.841458820694124, 1) == 0.05
        assert!(close(chi_square_sf(3.841_458_820_694_124, 1.0), 0.05, 1e-6));
        // chi2.sf(5.991464547107979, 2) == 0.05
        assert!(close(chi_square_sf(5.991_464_547_107_979, 2.0), 0.05, 1e-6));
    }

    #[test]
    fn test_chi_square_sf_degenerate_inputs() {
        assert_eq!(chi_square_sf(0.0, 3.0), 1.0);
        assert_eq!(chi_square_sf(2.0, 0.0), 1.0);
    }

    #[test]
    fn test_chi_square_same_proportions() {
        let reference: Vec<String> = ["a", "a", "b", "b"].iter().map(ToString::to_string).collect();
        let current: Vec<String> = ["a", "b"].iter().map(ToString::to_string).collect();
        let r = chi_square(&reference, &current);
        assert_eq!(r.statistic, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_chi_square_unseen_category_drifts() {
        let reference: Vec<String> = vec!["a".into(), "b".into()];
        let current: Vec<String> = vec!["c".into()];
        assert_eq!(chi_square(&reference, &current).p_value, 0.0);
    }
}
