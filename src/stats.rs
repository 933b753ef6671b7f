//! Exercise statistics aggregation
//!
//! Reduces collections of logged sets into summary statistics and per-day
//! chart series. All functions are pure over rows the repository has
//! already filtered (ownership, soft-delete, time window); ordering
//! expectations are documented per function.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::formulas::estimate_one_rm;
use crate::models::LoggedSet;

/// Summary statistics for one exercise over a query window
///
/// Note on zero vs. null: `max_weight` and `average_weight` default to `0`
/// when every input set has a null weight. A zero here means "no meaningful
/// weight data", not a recorded zero-kilogram lift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStatsSummary {
    /// Number of sets in the window
    pub total_sets: u32,

    /// Sum of per-set volume (null volumes contribute zero)
    pub total_volume: Decimal,

    /// Heaviest weight lifted (kg)
    pub max_weight: Decimal,

    /// Most reps completed in a single set
    pub max_reps: u32,

    /// Largest single-set volume
    pub max_volume: Decimal,

    /// Mean weight across all sets, null weights counted as zero
    pub average_weight: Decimal,

    /// Mean reps across all sets, null reps counted as zero
    pub average_reps: Decimal,

    /// Session start of the most recent set
    pub last_session_date: DateTime<Utc>,
}

/// One calendar day of chart data
///
/// Each field is averaged independently over the sets that recorded a value
/// for it, so a day of bodyweight work yields null weight but non-null reps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// UTC calendar date of the bucket
    pub date: NaiveDate,

    /// Mean weight over sets with a recorded weight
    pub average_weight: Option<Decimal>,

    /// Mean reps over sets with recorded reps
    pub average_reps: Option<Decimal>,

    /// Mean volume over sets with a derived volume
    pub average_volume: Option<Decimal>,

    /// Mean RPE over sets with a recorded RPE
    pub average_rpe: Option<Decimal>,

    /// Epley estimate from the day's average weight and reps; null unless
    /// both averages are present
    pub estimated_one_rm: Option<Decimal>,
}

/// Per-day accumulator for chart bucketing
#[derive(Default)]
struct DayBucket {
    weights: Vec<Decimal>,
    reps: Vec<Decimal>,
    volumes: Vec<Decimal>,
    rpes: Vec<Decimal>,
}

/// Mean of a slice, None when there are no contributors
fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Decimal>() / Decimal::from(values.len()))
}

/// Core statistics aggregation engine
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute summary statistics over a window of sets
    ///
    /// Expects rows ordered descending by session start so the first element
    /// is the most recent; ordering does not affect the other statistics.
    /// Returns `None` for empty input: no sets in range is not an error.
    pub fn compute_stats(sets: &[LoggedSet]) -> Option<ExerciseStatsSummary> {
        if sets.is_empty() {
            return None;
        }

        let count = Decimal::from(sets.len());

        let total_volume: Decimal = sets
            .iter()
            .map(|s| s.volume.unwrap_or(Decimal::ZERO))
            .sum();

        let max_weight = sets
            .iter()
            .map(|s| s.weight.unwrap_or(Decimal::ZERO))
            .max()
            .unwrap_or(Decimal::ZERO);

        let max_reps = sets.iter().map(|s| s.reps.unwrap_or(0)).max().unwrap_or(0);

        let max_volume = sets
            .iter()
            .map(|s| s.volume.unwrap_or(Decimal::ZERO))
            .max()
            .unwrap_or(Decimal::ZERO);

        let average_weight = sets
            .iter()
            .map(|s| s.weight.unwrap_or(Decimal::ZERO))
            .sum::<Decimal>()
            / count;

        let average_reps = sets
            .iter()
            .map(|s| Decimal::from(s.reps.unwrap_or(0)))
            .sum::<Decimal>()
            / count;

        Some(ExerciseStatsSummary {
            total_sets: sets.len() as u32,
            total_volume,
            max_weight,
            max_reps,
            max_volume,
            average_weight,
            average_reps,
            last_session_date: sets[0].session_started_at,
        })
    }

    /// Build a sparse per-day chart series from chronologically ordered sets
    ///
    /// Buckets by the UTC date component of the session start timestamp.
    /// No timezone localization is applied; a caller wanting local-day
    /// buckets must shift timestamps before querying.
    pub fn build_chart_series(sets: &[LoggedSet]) -> Vec<ChartPoint> {
        let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

        for set in sets {
            let day = set.session_started_at.date_naive();
            let bucket = buckets.entry(day).or_default();

            if let Some(weight) = set.weight {
                bucket.weights.push(weight);
            }
            if let Some(reps) = set.reps {
                bucket.reps.push(Decimal::from(reps));
            }
            if let Some(volume) = set.volume {
                bucket.volumes.push(volume);
            }
            if let Some(rpe) = set.rpe {
                bucket.rpes.push(rpe);
            }
        }

        buckets
            .into_iter()
            .map(|(date, bucket)| {
                let average_weight = mean(&bucket.weights);
                let average_reps = mean(&bucket.reps);

                // 1RM projection needs both averages; zero averages flow
                // through the Epley helper and come back as zero
                let estimated_one_rm = match (average_weight, average_reps) {
                    (Some(weight), Some(reps)) => Some(estimate_one_rm(weight, reps)),
                    _ => None,
                };

                ChartPoint {
                    date,
                    average_weight,
                    average_reps,
                    average_volume: mean(&bucket.volumes),
                    average_rpe: mean(&bucket.rpes),
                    estimated_one_rm,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn set_on(day: u32, weight: Option<Decimal>, reps: Option<u32>) -> LoggedSet {
        let started = Utc.with_ymd_and_hms(2024, 9, day, 10, 0, 0).unwrap();
        let volume = match (weight, reps) {
            (Some(w), Some(r)) => Some(w * Decimal::from(r)),
            _ => None,
        };
        LoggedSet {
            id: format!("set_{}_{:?}", day, reps),
            exercise_id: "exercise_bench".to_string(),
            session_id: format!("session_{}", day),
            weight,
            reps,
            rpe: None,
            volume,
            logged_at: started,
            session_started_at: started,
        }
    }

    #[test]
    fn test_compute_stats_empty_input() {
        assert_eq!(StatsCalculator::compute_stats(&[]), None);
    }

    #[test]
    fn test_compute_stats_aggregation() {
        let sets = vec![
            set_on(23, Some(dec!(100)), Some(5)),
            set_on(22, Some(dec!(110)), Some(3)),
        ];

        let stats = StatsCalculator::compute_stats(&sets).unwrap();
        assert_eq!(stats.total_sets, 2);
        assert_eq!(stats.total_volume, dec!(830));
        assert_eq!(stats.max_weight, dec!(110));
        assert_eq!(stats.max_reps, 5);
        assert_eq!(stats.max_volume, dec!(500));
        assert_eq!(stats.average_weight, dec!(105));
        assert_eq!(stats.average_reps, dec!(4));
    }

    #[test]
    fn test_compute_stats_last_session_is_first_element() {
        let sets = vec![
            set_on(23, Some(dec!(100)), Some(5)),
            set_on(20, Some(dec!(90)), Some(5)),
        ];

        let stats = StatsCalculator::compute_stats(&sets).unwrap();
        assert_eq!(
            stats.last_session_date,
            Utc.with_ymd_and_hms(2024, 9, 23, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_compute_stats_all_null_weights_yield_zero() {
        let sets = vec![set_on(23, None, Some(10)), set_on(23, None, Some(8))];

        let stats = StatsCalculator::compute_stats(&sets).unwrap();
        // Zero here means "no weight data", not a zero-kg lift
        assert_eq!(stats.max_weight, Decimal::ZERO);
        assert_eq!(stats.average_weight, Decimal::ZERO);
        assert_eq!(stats.total_volume, Decimal::ZERO);
        assert_eq!(stats.max_reps, 10);
    }

    #[test]
    fn test_chart_series_empty_input() {
        assert!(StatsCalculator::build_chart_series(&[]).is_empty());
    }

    #[test]
    fn test_chart_series_same_day_buckets_together() {
        let sets = vec![
            set_on(23, Some(dec!(100)), Some(5)),
            set_on(23, Some(dec!(120)), Some(5)),
        ];

        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].average_weight, Some(dec!(110)));
    }

    #[test]
    fn test_chart_series_separate_days_sparse_and_ordered() {
        let sets = vec![
            set_on(20, Some(dec!(100)), Some(5)),
            set_on(23, Some(dec!(105)), Some(5)),
        ];

        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 9, 20).unwrap());
        assert_eq!(series[1].date, NaiveDate::from_ymd_opt(2024, 9, 23).unwrap());
    }

    #[test]
    fn test_chart_series_fields_averaged_independently() {
        // One set with weight only, one with reps only: the day keeps both
        // averages, each over its own contributors
        let sets = vec![set_on(23, Some(dec!(60)), None), set_on(23, None, Some(12))];

        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].average_weight, Some(dec!(60)));
        assert_eq!(series[0].average_reps, Some(dec!(12)));
        assert_eq!(series[0].average_volume, None);
        assert_eq!(series[0].average_rpe, None);
    }

    #[test]
    fn test_chart_series_one_rm_requires_both_averages() {
        let sets = vec![set_on(23, Some(dec!(100)), None)];
        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(series[0].estimated_one_rm, None);

        let sets = vec![set_on(23, Some(dec!(100)), Some(10))];
        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(
            series[0].estimated_one_rm.unwrap().round_dp(2),
            dec!(133.33)
        );
    }

    #[test]
    fn test_chart_series_zero_weight_yields_zero_one_rm() {
        let sets = vec![set_on(23, Some(dec!(0)), Some(10))];
        let series = StatsCalculator::build_chart_series(&sets);
        assert_eq!(series[0].estimated_one_rm, Some(Decimal::ZERO));
    }

    #[test]
    fn test_chart_series_rpe_averaging() {
        let mut first = set_on(23, Some(dec!(80)), Some(5));
        first.rpe = Some(dec!(7));
        let mut second = set_on(23, Some(dec!(80)), Some(5));
        second.rpe = Some(dec!(9));

        let series = StatsCalculator::build_chart_series(&[first, second]);
        assert_eq!(series[0].average_rpe, Some(dec!(8)));
    }
}
