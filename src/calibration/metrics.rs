//! Forecast quality metrics over graded predictions.
//!
//! All functions take `(predicted_probability, hit)` pairs and use
//! equal-width probability buckets over [0, 1].

use serde::Serialize;

/// Equal-width bucket index for `p` (p = 1.0 lands in the last bucket).
#[inline]
pub fn bucket_index(p: f64, bucket_count: usize) -> usize {
    let n = bucket_count.max(1);
    let idx = (p.clamp(0.0, 1.0) * n as f64).floor() as usize;
    idx.min(n - 1)
}

/// Inclusive-exclusive bounds of a bucket.
pub fn bucket_bounds(bucket: usize, bucket_count: usize) -> (f64, f64) {
    let n = bucket_count.max(1) as f64;
    (bucket as f64 / n, (bucket as f64 + 1.0) / n)
}

/// Mean squared error of the forecasts. `None` for an empty sample.
pub fn brier_score(pairs: &[(f64, bool)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let sum: f64 = pairs
        .iter()
        .map(|&(p, hit)| {
            let y = if hit { 1.0 } else { 0.0 };
            (p - y).powi(2)
        })
        .sum();
    Some(sum / pairs.len() as f64)
}

/// One row of a reliability diagram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityBin {
    pub bucket: usize,
    pub lower: f64,
    pub upper: f64,
    pub n: u64,
    pub p_mean: f64,
    pub hit_rate: f64,
}

/// Non-empty reliability bins, ascending by bucket.
pub fn reliability_bins(pairs: &[(f64, bool)], bucket_count: usize) -> Vec<ReliabilityBin> {
    let n = bucket_count.max(1);
    let mut sums = vec![(0u64, 0.0f64, 0u64); n];

    for &(p, hit) in pairs {
        let slot = &mut sums[bucket_index(p, n)];
        slot.0 += 1;
        slot.1 += p;
        if hit {
            slot.2 += 1;
        }
    }

    sums.into_iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(bucket, (count, p_sum, hits))| {
            let (lower, upper) = bucket_bounds(bucket, n);
            ReliabilityBin {
                bucket,
                lower,
                upper,
                n: count,
                p_mean: p_sum / count as f64,
                hit_rate: hits as f64 / count as f64,
            }
        })
        .collect()
}

/// Expected calibration error: count-weighted |mean prediction - hit rate|.
pub fn expected_calibration_error(pairs: &[(f64, bool)], bucket_count: usize) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let total = pairs.len() as f64;
    let ece = reliability_bins(pairs, bucket_count)
        .iter()
        .map(|b| (b.n as f64 / total) * (b.p_mean - b.hit_rate).abs())
        .sum();
    Some(ece)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_edges() {
        assert_eq!(bucket_index(0.0, 10), 0);
        assert_eq!(bucket_index(0.099, 10), 0);
        assert_eq!(bucket_index(0.1, 10), 1);
        assert_eq!(bucket_index(0.55, 10), 5);
        assert_eq!(bucket_index(1.0, 10), 9);
        assert_eq!(bucket_index(0.7, 0), 0);
    }

    #[test]
    fn test_brier_score() {
        assert_eq!(brier_score(&[]), None);
        let pairs = [(1.0, true), (0.0, false)];
        assert_eq!(brier_score(&pairs), Some(0.0));
        let coin = [(0.5, true), (0.5, false)];
        assert!((brier_score(&coin).unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_reliability_bins_skip_empty() {
        let pairs = [(0.62, true), (0.68, false), (0.15, false)];
        let bins = reliability_bins(&pairs, 10);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].bucket, 1);
        assert_eq!(bins[1].bucket, 6);
        assert_eq!(bins[1].n, 2);
        assert!((bins[1].p_mean - 0.65).abs() < 1e-12);
        assert!((bins[1].hit_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ece_perfect_and_biased() {
        let perfect = [(0.5, true), (0.5, false)];
        assert!(expected_calibration_error(&perfect, 10).unwrap() < 1e-12);

        // Always says 0.9, hits half the time
        let overconfident = [(0.9, true), (0.9, false), (0.9, true), (0.9, false)];
        assert!((expected_calibration_error(&overconfident, 10).unwrap() - 0.4).abs() < 1e-12);
    }
}
