//! Percentile intervals from bootstrap draws.

const LOWER_QUANTILE: f64 = 0.025;
const UPPER_QUANTILE: f64 = 0.975;

/// Percentile with linear interpolation between order statistics.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

/// Mean of the draws and the distances from it to the 2.5th and 97.5th
/// percentiles, as `(mean, (lower_delta, upper_delta))`.
///
/// Deltas are clamped at zero. Empty draws give `NaN` everywhere.
pub fn bootstrap_interval(draws: &[f64]) -> (f64, (f64, f64)) {
    if draws.is_empty() {
        return (f64::NAN, (f64::NAN, f64::NAN));
    }
    let center = draws.iter().sum::<f64>() / draws.len() as f64;

    let mut sorted = draws.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let lower = percentile(&sorted, LOWER_QUANTILE);
    let upper = percentile(&sorted, UPPER_QUANTILE);
    (center, ((center - lower).max(0.0), (upper - center).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_draws_have_zero_width() {
        let (center, (lo, hi)) = bootstrap_interval(&[2.5; 40]);
        assert_eq!(center, 2.5);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 0.0);
    }

    #[test]
    fn test_interval_brackets_the_mean() {
        let draws: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let (center, (lo, hi)) = bootstrap_interval(&draws);
        assert!((center - 50.0).abs() < 1e-12);
        assert!((lo - 47.5).abs() < 1e-9);
        assert!((hi - 47.5).abs() < 1e-9);
    }

    #[test]
    fn test_skewed_draws_give_asymmetric_deltas() {
        let mut draws = vec![0.0; 90];
        draws.extend(vec![10.0; 10]);
        let (center, (lo, hi)) = bootstrap_interval(&draws);
        assert!((center - 1.0).abs() < 1e-12);
        assert!(lo >= 0.0 && hi >= 0.0);
        assert!(hi > lo);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 1.0), 4.0);
        assert!((percentile(&sorted, 0.25) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_empty_draws_are_nan() {
        let (center, (lo, hi)) = bootstrap_interval(&[]);
        assert!(center.is_nan() && lo.is_nan() && hi.is_nan());
    }
}
