//! Aggregation Library
//!
//! Pure aggregation functions over a snapshot plus direct-count variants that
//! query the tracker live. Each function returns the JSON shape consumed
//! unchanged by the downstream renderer; top-level keys are a contract.

pub mod backlog;
pub mod bugs;
pub mod counts;
pub mod cycle;
pub mod progress;
pub mod release;
pub mod sprint;
pub mod throughput;
pub mod velocity;
pub mod workload;

/// Round to one decimal, the precision used across the analytic payloads.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ratios (bug-to-story) keep two decimals.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `part` in `whole`; zero when the base set is empty so an
/// empty sprint reports 0, never NaN.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 * 100.0 / whole as f64)
    }
}

/// Mean over an f64 sample; `None` for an empty sample so means degrade to
/// JSON null instead of an error.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round1(values.iter().sum::<f64>() / values.len() as f64))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_base() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(40, 40), 100.0);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }
}
