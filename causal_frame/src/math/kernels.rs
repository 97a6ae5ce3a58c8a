//! Univariate kernels for mixed continuous / discrete data.

use std::f64::consts::PI;

/// Gaussian kernel function.
pub fn gaussian(u: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * u * u).exp()
}

/// Aitchison-Aitken kernel for an unordered variable with `levels` categories.
///
/// `1 - h` on a match, `h / (levels - 1)` otherwise.
pub fn aitchison_aitken(h: f64, xi: f64, x0: f64, levels: usize) -> f64 {
    if xi == x0 {
        1.0 - h
    } else if levels > 1 {
        h / (levels - 1) as f64
    } else {
        0.0
    }
}

/// Wang-van Ryzin kernel for an ordered variable.
///
/// `1 - h` on a match, `(1 - h) / 2 * h^|xi - x0|` otherwise.
pub fn wang_ryzin(h: f64, xi: f64, x0: f64) -> f64 {
    if xi == x0 {
        1.0 - h
    } else {
        0.5 * (1.0 - h) * h.powf((xi - x0).abs())
    }
}

/// Normal-reference bandwidth `1.06 * sd * n^(-1 / (4 + k))` for one of `k`
/// columns.
pub fn normal_reference_bandwidth(data: &[f64], n_columns: usize) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    1.06 * variance.sqrt() * n.powf(-1.0 / (4.0 + n_columns as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_peak() {
        assert!((gaussian(0.0) - 0.398_942_280_401_432_7).abs() < 1e-12);
        assert!((gaussian(1.0) - gaussian(-1.0)).abs() < 1e-15);
    }

    #[test]
    fn test_aitchison_aitken_sums_to_one_over_levels() {
        let h = 0.3;
        let levels = 4;
        let total: f64 = (0..levels)
            .map(|l| aitchison_aitken(h, l as f64, 0.0, levels))
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wang_ryzin_decays_with_distance() {
        let h = 0.4;
        assert!(wang_ryzin(h, 1.0, 1.0) > wang_ryzin(h, 2.0, 1.0));
        assert!(wang_ryzin(h, 2.0, 1.0) > wang_ryzin(h, 3.0, 1.0));
    }

    #[test]
    fn test_bandwidth_of_constant_column_is_zero() {
        assert_eq!(normal_reference_bandwidth(&[2.0, 2.0, 2.0], 1), 0.0);
        assert!(normal_reference_bandwidth(&[1.0, 2.0, 3.0], 1) > 0.0);
    }
}
