//! Descriptive statistics shared by the scoring modules.
//!
//! Every helper returns 0.0 on insufficient input instead of dividing
//! by zero; scoring stays total for degenerate sessions.

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}

/// Population standard deviation (divisor `n`).
pub fn population_std_dev(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data
        .iter()
        .map(|value| {
            let diff = value - m;
            diff * diff
        })
        .sum::<f64>()
        / n as f64;
    variance.sqrt()
}

/// Coefficient of variation (`sd / mean`), 0.0 when the mean is zero.
pub fn coefficient_of_variation(data: &[f64]) -> f64 {
    let m = mean(data);
    if m == 0.0 {
        0.0
    } else {
        population_std_dev(data) / m
    }
}

/// Linear-interpolated percentile over an already sorted slice.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let clamped_pct = pct.clamp(0.0, 1.0);
    let rank = clamped_pct * (sorted.len() as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn population_std_dev_matches_hand_computation() {
        // Intervals from the canonical tapping fixture.
        let data = [200.0, 210.0, 190.0];
        let sd = population_std_dev(&data);
        let expected = (200.0f64 / 3.0).sqrt();
        assert!((sd - expected).abs() < 1e-9);
    }

    #[test]
    fn std_dev_of_singleton_is_zero() {
        assert_eq!(population_std_dev(&[42.0]), 0.0);
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn cv_guards_zero_mean() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
        let cv = coefficient_of_variation(&[200.0, 210.0, 190.0]);
        assert!((cv - (200.0f64 / 3.0).sqrt() / 200.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [100.0, 200.0, 300.0];
        assert_eq!(percentile(&sorted, 0.5), 200.0);
        assert_eq!(percentile(&sorted, 0.25), 150.0);
        assert_eq!(percentile(&sorted, 0.0), 100.0);
        assert_eq!(percentile(&sorted, 1.0), 300.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[7.0], 0.9), 7.0);
    }
}
