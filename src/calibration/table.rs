//! Calibration Table
//!
//! Read-mostly mapping (provider, market, probability bucket) ->
//! (historical hit rate, sample size, Brier score), built wholesale from
//! graded outcomes. A built table is never mutated; refreshes build a new one
//! and swap it in (see `store`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::metrics::{self, bucket_bounds, bucket_index};
use crate::valuation::model::{provider_key, Market};

/// A historical prediction with its graded result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedOutcome {
    pub provider: String,
    pub market: Market,
    pub p_hit: f64,
    pub hit: bool,
}

impl GradedOutcome {
    pub fn new(provider: &str, market: Market, p_hit: f64, hit: bool) -> Self {
        Self {
            provider: provider_key(provider),
            market,
            p_hit,
            hit,
        }
    }
}

/// Aggregates for one (provider, market, bucket).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub historical_hit_rate: f64,
    pub sample_size: u64,
    pub brier_score: f64,
    pub mean_predicted: f64,
}

/// Flattened bucket for API / CLI output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRow {
    pub provider: String,
    pub market: Market,
    pub bucket: usize,
    pub lower: f64,
    pub upper: f64,
    #[serde(flatten)]
    pub stats: BucketStats,
}

/// Whole-provider quality summary for one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub market: Market,
    pub n_predictions: u64,
    pub brier_score: f64,
    pub ece: f64,
}

type BucketVec = Vec<Option<BucketStats>>;

#[derive(Debug, Clone)]
pub struct CalibrationTable {
    version: u64,
    built_at: DateTime<Utc>,
    bucket_count: usize,
    outcome_count: usize,
    /// provider -> market -> buckets (index = bucket)
    buckets: HashMap<String, HashMap<Market, BucketVec>>,
    summaries: Vec<ProviderSummary>,
}

impl CalibrationTable {
    pub fn empty(bucket_count: usize) -> Self {
        Self {
            version: 0,
            built_at: Utc::now(),
            bucket_count: bucket_count.max(1),
            outcome_count: 0,
            buckets: HashMap::new(),
            summaries: Vec::new(),
        }
    }

    /// Aggregate graded outcomes into buckets. Outcomes with a non-finite or
    /// out-of-range probability are skipped.
    pub fn build(outcomes: &[GradedOutcome], bucket_count: usize) -> Self {
        let n = bucket_count.max(1);
        let mut grouped: BTreeMap<(String, Market), Vec<(f64, bool)>> = BTreeMap::new();
        let mut used = 0usize;

        for o in outcomes {
            if !o.p_hit.is_finite() || !(0.0..=1.0).contains(&o.p_hit) {
                continue;
            }
            grouped
                .entry((provider_key(&o.provider), o.market))
                .or_default()
                .push((o.p_hit, o.hit));
            used += 1;
        }

        let mut buckets: HashMap<String, HashMap<Market, BucketVec>> = HashMap::new();
        let mut summaries = Vec::with_capacity(grouped.len());

        for ((provider, market), pairs) in grouped {
            let mut per_bucket: Vec<Vec<(f64, bool)>> = vec![Vec::new(); n];
            for &(p, hit) in &pairs {
                per_bucket[bucket_index(p, n)].push((p, hit));
            }

            let stats: BucketVec = per_bucket
                .iter()
                .map(|sample| {
                    let brier_score = metrics::brier_score(sample)?;
                    let count = sample.len() as f64;
                    let hits = sample.iter().filter(|(_, hit)| *hit).count() as f64;
                    let p_sum: f64 = sample.iter().map(|(p, _)| p).sum();
                    Some(BucketStats {
                        historical_hit_rate: hits / count,
                        sample_size: sample.len() as u64,
                        brier_score,
                        mean_predicted: p_sum / count,
                    })
                })
                .collect();

            summaries.push(ProviderSummary {
                provider: provider.clone(),
                market,
                n_predictions: pairs.len() as u64,
                brier_score: metrics::brier_score(&pairs).unwrap_or(0.0),
                ece: metrics::expected_calibration_error(&pairs, n).unwrap_or(0.0),
            });

            buckets.entry(provider).or_default().insert(market, stats);
        }

        Self {
            version: 0,
            built_at: Utc::now(),
            bucket_count: n,
            outcome_count: used,
            buckets,
            summaries,
        }
    }

    pub(crate) fn stamped(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn outcome_count(&self) -> usize {
        self.outcome_count
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_for(&self, p: f64) -> usize {
        bucket_index(p, self.bucket_count)
    }

    /// Bucket containing `p` for (provider, market). `provider` must already
    /// be a normalised key.
    pub fn lookup(&self, provider: &str, market: Market, p: f64) -> Option<(usize, &BucketStats)> {
        let bucket = self.bucket_for(p);
        let stats = self
            .buckets
            .get(provider)?
            .get(&market)?
            .get(bucket)?
            .as_ref()?;
        Some((bucket, stats))
    }

    /// Populated buckets for a market, optionally one provider, sorted by
    /// provider then bucket.
    pub fn rows(&self, market: Market, provider: Option<&str>) -> Vec<BucketRow> {
        let wanted = provider.map(provider_key);
        let mut rows: Vec<BucketRow> = self
            .buckets
            .iter()
            .filter(|(p, _)| wanted.as_deref().map_or(true, |w| w == p.as_str()))
            .filter_map(|(p, markets)| markets.get(&market).map(|b| (p, b)))
            .flat_map(|(p, buckets)| {
                buckets.iter().enumerate().filter_map(move |(bucket, stats)| {
                    let stats = (*stats)?;
                    let (lower, upper) = bucket_bounds(bucket, self.bucket_count);
                    Some(BucketRow {
                        provider: p.clone(),
                        market,
                        bucket,
                        lower,
                        upper,
                        stats,
                    })
                })
            })
            .collect();
        rows.sort_by(|a, b| a.provider.cmp(&b.provider).then(a.bucket.cmp(&b.bucket)));
        rows
    }

    pub fn summaries(&self, market: Market, provider: Option<&str>) -> Vec<ProviderSummary> {
        let wanted = provider.map(provider_key);
        self.summaries
            .iter()
            .filter(|s| s.market == market)
            .filter(|s| wanted.as_deref().map_or(true, |w| w == s.provider))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcomes(provider: &str, p: f64, hits: usize, misses: usize) -> Vec<GradedOutcome> {
        let mut v = Vec::with_capacity(hits + misses);
        v.extend((0..hits).map(|_| GradedOutcome::new(provider, Market::PassingYards, p, true)));
        v.extend((0..misses).map(|_| GradedOutcome::new(provider, Market::PassingYards, p, false)));
        v
    }

    #[test]
    fn test_build_aggregates_bucket() {
        let table = CalibrationTable::build(&outcomes("DraftKings", 0.62, 30, 20), 10);

        let (bucket, stats) = table.lookup("draftkings", Market::PassingYards, 0.65).unwrap();
        assert_eq!(bucket, 6);
        assert_eq!(stats.sample_size, 50);
        assert!((stats.historical_hit_rate - 0.6).abs() < 1e-12);
        assert!((stats.mean_predicted - 0.62).abs() < 1e-12);
        // 30 * 0.38^2 + 20 * 0.62^2 over 50
        let expected_brier = (30.0 * 0.38_f64.powi(2) + 20.0 * 0.62_f64.powi(2)) / 50.0;
        assert!((stats.brier_score - expected_brier).abs() < 1e-12);
        assert_eq!(table.outcome_count(), 50);
    }

    #[test]
    fn test_lookup_misses() {
        let table = CalibrationTable::build(&outcomes("fanduel", 0.62, 5, 5), 10);
        assert!(table.lookup("fanduel", Market::PassingYards, 0.35).is_none());
        assert!(table.lookup("fanduel", Market::RushingYards, 0.62).is_none());
        assert!(table.lookup("betmgm", Market::PassingYards, 0.62).is_none());
    }

    #[test]
    fn test_build_skips_invalid_probabilities() {
        let mut v = outcomes("fanduel", 0.4, 2, 2);
        v.push(GradedOutcome::new("fanduel", Market::PassingYards, f64::NAN, true));
        v.push(GradedOutcome::new("fanduel", Market::PassingYards, 1.7, true));
        let table = CalibrationTable::build(&v, 10);
        assert_eq!(table.outcome_count(), 4);
    }

    #[test]
    fn test_rows_and_summaries_filter() {
        let mut v = outcomes("fanduel", 0.42, 3, 3);
        v.extend(outcomes("draftkings", 0.71, 4, 1));
        v.push(GradedOutcome::new("draftkings", Market::RushingYards, 0.5, true));
        let table = CalibrationTable::build(&v, 10);

        let rows = table.rows(Market::PassingYards, None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].provider, "draftkings");
        assert_eq!(rows[0].bucket, 7);
        assert_eq!(rows[1].provider, "fanduel");

        let only_fd = table.rows(Market::PassingYards, Some("FanDuel"));
        assert_eq!(only_fd.len(), 1);

        let summaries = table.summaries(Market::PassingYards, None);
        assert_eq!(summaries.len(), 2);
        assert!(table.rows(Market::PassingTouchdowns, None).is_empty());
    }

    #[test]
    fn test_empty_table() {
        let table = CalibrationTable::empty(10);
        assert!(table.is_empty());
        assert_eq!(table.version(), 0);
        assert!(table.lookup("draftkings", Market::PassingYards, 0.5).is_none());
    }
}
