use serde::{Deserialize, Serialize};

/// Share of samples dropped as outliers by default.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.0005;

/// Descriptive statistics of one distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Median of the values below the median.
    pub q1: f64,
    /// Median of the values above the median.
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl Summary {
    /// Returns `None` for an empty slice. Non-finite values are ignored.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        let (median, lower_end, upper_start) = median_split(&sorted);
        let q1 = median_split(&sorted[..lower_end]).0;
        let q3 = median_split(&sorted[upper_start..]).0;

        Some(Self {
            count,
            mean,
            median,
            q1: if lower_end == 0 { sorted[0] } else { q1 },
            q3: if upper_start >= count { sorted[count - 1] } else { q3 },
            min: sorted[0],
            max: sorted[count - 1],
            std: variance.sqrt(),
        })
    }
}

/// Median of a sorted slice, plus the end of the lower half and the start of
/// the upper half (the median element(s) belong to neither).
fn median_split(sorted: &[f64]) -> (f64, usize, usize) {
    let n = sorted.len();
    if n == 0 {
        return (f64::NAN, 0, 0);
    }
    if n % 2 == 0 {
        let (a, b) = (n / 2 - 1, n / 2);
        ((sorted[a] + sorted[b]) / 2.0, a, b + 1)
    } else {
        let m = n / 2;
        (sorted[m], m, m + 1)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(median_split(&sorted).0)
}

/// Drops the `fraction` of values farthest from the median.
///
/// The number dropped is `floor(len * fraction)`, so short series are
/// returned whole.
pub fn trim_outliers(values: &[f64], fraction: f64) -> Vec<f64> {
    let drop = (values.len() as f64 * fraction).floor() as usize;
    if drop == 0 {
        return values.to_vec();
    }
    let Some(med) = median(values) else {
        return Vec::new();
    };
    let mut by_distance: Vec<f64> = values.to_vec();
    by_distance.sort_by(|a, b| (b - med).abs().total_cmp(&(a - med).abs()));
    by_distance.split_off(drop.min(by_distance.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_odd() {
        let s = Summary::from_values(&[7.0, 1.0, 3.0, 5.0, 9.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.median, 5.0);
        assert_eq!(s.q1, 2.0);
        assert_eq!(s.q3, 8.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.mean, 5.0);
        assert!((s.std - 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_summary_even() {
        let s = Summary::from_values(&[4.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q1, 1.0);
        assert_eq!(s.q3, 4.0);
    }

    #[test]
    fn test_summary_single_and_empty() {
        let s = Summary::from_values(&[2.0]).unwrap();
        assert_eq!((s.q1, s.median, s.q3), (2.0, 2.0, 2.0));
        assert!(Summary::from_values(&[]).is_none());
        assert!(Summary::from_values(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_trim_outliers() {
        let mut values: Vec<f64> = (0..4_000).map(|i| 1.0 + (i % 7) as f64 * 1e-3).collect();
        values.push(50.0);
        values.push(-40.0);
        // 4002 * 0.0005 = 2 values dropped: the two far ones
        let trimmed = trim_outliers(&values, DEFAULT_TRIM_FRACTION);
        assert_eq!(trimmed.len(), 4_000);
        assert!(trimmed.iter().all(|v| (1.0..1.01).contains(v)));
    }

    #[test]
    fn test_trim_keeps_short_series() {
        assert_eq!(trim_outliers(&[1.0, 100.0], DEFAULT_TRIM_FRACTION).len(), 2);
    }
}
