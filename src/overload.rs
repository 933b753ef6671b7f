//! Progressive overload comparison
//!
//! Classifies a newly logged (or proposed) set against the previous
//! session, the trailing seven days, and the all-time best. Pure and
//! stateless: all rows are pre-fetched by the repository and the same
//! inputs always produce the same classification.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::LoggedSet;

/// Performance classification relative to the previous session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverloadStatus {
    Improved,
    Maintained,
    Regressed,
    /// No prior data, or prior data exists but the current attempt has no
    /// comparable volume. Both conditions map here, matching historical
    /// behavior of the comparison.
    New,
}

/// The set being evaluated, which may not be persisted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentAttempt {
    /// Weight in kilograms
    pub weight: Option<Decimal>,

    /// Repetitions
    pub reps: Option<u32>,

    /// Derived volume, supplied by the caller
    pub volume: Option<Decimal>,
}

impl CurrentAttempt {
    /// Build an attempt from its load, deriving volume when both parts
    /// are present
    pub fn from_load(weight: Option<Decimal>, reps: Option<u32>) -> Self {
        let volume = match (weight, reps) {
            (Some(w), Some(r)) => Some(w * Decimal::from(r)),
            _ => None,
        };
        CurrentAttempt {
            weight,
            reps,
            volume,
        }
    }
}

/// Point-in-time copy of a stored set's load, carried verbatim into the
/// comparison output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSnapshot {
    /// Weight in kilograms
    pub weight: Option<Decimal>,

    /// Repetitions
    pub reps: Option<u32>,

    /// Stored volume
    pub volume: Option<Decimal>,

    /// Session start of the snapshotted set
    pub session_started_at: DateTime<Utc>,
}

impl From<&LoggedSet> for SetSnapshot {
    fn from(set: &LoggedSet) -> Self {
        SetSnapshot {
            weight: set.weight,
            reps: set.reps,
            volume: set.volume,
            session_started_at: set.session_started_at,
        }
    }
}

/// Per-field means over the trailing seven days
///
/// All fields are null when no sets fell inside the window; within a
/// non-empty window, null fields contribute zero to their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAverage {
    pub weight: Option<Decimal>,
    pub reps: Option<Decimal>,
    pub volume: Option<Decimal>,
}

/// Full comparison output for one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadComparison {
    /// Exercise the comparison is scoped to
    pub exercise_id: String,

    /// Classification against the last session
    pub status: OverloadStatus,

    /// The attempt under evaluation
    pub current: CurrentAttempt,

    /// Most recent prior set, if any
    pub last_session: Option<SetSnapshot>,

    /// Trailing-7-day per-field means
    pub weekly_average: WeeklyAverage,

    /// Highest-volume set on record, ties broken by earliest session start
    pub all_time_best: Option<SetSnapshot>,
}

/// Core overload classification engine
pub struct OverloadComparator;

impl OverloadComparator {
    /// Classify an attempt against its history
    ///
    /// Repository contract for the inputs: `last_session_set` is the most
    /// recent set by session start; `trailing_7_day_sets` covers
    /// `now - 7 days <= session_started_at` inclusive; `all_time_best_set`
    /// is the maximum-volume set with earliest-session tie-break.
    pub fn compare_overload(
        exercise_id: &str,
        current: CurrentAttempt,
        last_session_set: Option<&LoggedSet>,
        trailing_7_day_sets: &[LoggedSet],
        all_time_best_set: Option<&LoggedSet>,
    ) -> OverloadComparison {
        let status = Self::classify(
            last_session_set.and_then(|s| s.volume),
            current.volume,
        );

        OverloadComparison {
            exercise_id: exercise_id.to_string(),
            status,
            current,
            last_session: last_session_set.map(SetSnapshot::from),
            weekly_average: Self::weekly_average(trailing_7_day_sets),
            all_time_best: all_time_best_set.map(SetSnapshot::from),
        }
    }

    /// Three-way volume comparison, with `New` for both "no history" and
    /// "history but no comparable current volume"
    fn classify(last_volume: Option<Decimal>, current_volume: Option<Decimal>) -> OverloadStatus {
        match (last_volume, current_volume) {
            (Some(last), Some(current)) => {
                if current > last {
                    OverloadStatus::Improved
                } else if current < last {
                    OverloadStatus::Regressed
                } else {
                    OverloadStatus::Maintained
                }
            }
            (Some(_), None) => OverloadStatus::New,
            (None, _) => OverloadStatus::New,
        }
    }

    /// Per-field means over the trailing window; empty window short-circuits
    /// to all-null rather than dividing by zero
    fn weekly_average(sets: &[LoggedSet]) -> WeeklyAverage {
        if sets.is_empty() {
            return WeeklyAverage {
                weight: None,
                reps: None,
                volume: None,
            };
        }

        let count = Decimal::from(sets.len());

        let weight = sets
            .iter()
            .map(|s| s.weight.unwrap_or(Decimal::ZERO))
            .sum::<Decimal>()
            / count;
        let reps = sets
            .iter()
            .map(|s| Decimal::from(s.reps.unwrap_or(0)))
            .sum::<Decimal>()
            / count;
        let volume = sets
            .iter()
            .map(|s| s.volume.unwrap_or(Decimal::ZERO))
            .sum::<Decimal>()
            / count;

        WeeklyAverage {
            weight: Some(weight),
            reps: Some(reps),
            volume: Some(volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn stored_set(day: u32, weight: Decimal, reps: u32) -> LoggedSet {
        let started = Utc.with_ymd_and_hms(2024, 9, day, 18, 30, 0).unwrap();
        LoggedSet {
            id: format!("set_{}", day),
            exercise_id: "exercise_deadlift".to_string(),
            session_id: format!("session_{}", day),
            weight: Some(weight),
            reps: Some(reps),
            rpe: None,
            volume: Some(weight * Decimal::from(reps)),
            logged_at: started,
            session_started_at: started,
        }
    }

    #[test]
    fn test_improved_when_volume_increases() {
        let last = stored_set(20, dec!(100), 5); // volume 500
        let current = CurrentAttempt::from_load(Some(dec!(120)), Some(5)); // 600

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            Some(&last),
            &[],
            None,
        );
        assert_eq!(comparison.status, OverloadStatus::Improved);
    }

    #[test]
    fn test_regressed_when_volume_decreases() {
        let last = stored_set(20, dec!(100), 5); // 500
        let current = CurrentAttempt::from_load(Some(dec!(100)), Some(4)); // 400

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            Some(&last),
            &[],
            None,
        );
        assert_eq!(comparison.status, OverloadStatus::Regressed);
    }

    #[test]
    fn test_maintained_when_volume_equal() {
        let last = stored_set(20, dec!(100), 5);
        let current = CurrentAttempt::from_load(Some(dec!(100)), Some(5));

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            Some(&last),
            &[],
            None,
        );
        assert_eq!(comparison.status, OverloadStatus::Maintained);
    }

    #[test]
    fn test_new_when_no_prior_set() {
        let current = CurrentAttempt::from_load(Some(dec!(60)), Some(8));

        let comparison =
            OverloadComparator::compare_overload("exercise_deadlift", current, None, &[], None);
        assert_eq!(comparison.status, OverloadStatus::New);
        assert!(comparison.last_session.is_none());
        assert!(comparison.all_time_best.is_none());
    }

    #[test]
    fn test_new_when_current_volume_absent() {
        // History exists but the attempt has no comparable volume
        let last = stored_set(20, dec!(100), 5);
        let current = CurrentAttempt::from_load(None, Some(5));

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            Some(&last),
            &[],
            None,
        );
        assert_eq!(comparison.status, OverloadStatus::New);
        assert!(comparison.last_session.is_some());
    }

    #[test]
    fn test_weekly_average_empty_window_is_null() {
        let current = CurrentAttempt::from_load(Some(dec!(100)), Some(5));
        let comparison =
            OverloadComparator::compare_overload("exercise_deadlift", current, None, &[], None);

        assert_eq!(comparison.weekly_average.weight, None);
        assert_eq!(comparison.weekly_average.reps, None);
        assert_eq!(comparison.weekly_average.volume, None);
    }

    #[test]
    fn test_weekly_average_means() {
        let sets = vec![stored_set(20, dec!(100), 5), stored_set(21, dec!(110), 3)];
        let current = CurrentAttempt::from_load(Some(dec!(100)), Some(5));

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            None,
            &sets,
            None,
        );
        assert_eq!(comparison.weekly_average.weight, Some(dec!(105)));
        assert_eq!(comparison.weekly_average.reps, Some(dec!(4)));
        assert_eq!(comparison.weekly_average.volume, Some(dec!(415)));
    }

    #[test]
    fn test_weekly_average_null_fields_count_as_zero() {
        let mut set = stored_set(20, dec!(100), 5);
        set.weight = None;
        set.volume = None;
        let sets = vec![set, stored_set(21, dec!(100), 5)];
        let current = CurrentAttempt::from_load(Some(dec!(100)), Some(5));

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            None,
            &sets,
            None,
        );
        assert_eq!(comparison.weekly_average.weight, Some(dec!(50)));
        assert_eq!(comparison.weekly_average.volume, Some(dec!(250)));
    }

    #[test]
    fn test_snapshots_carried_verbatim() {
        let last = stored_set(20, dec!(100), 5);
        let best = stored_set(10, dec!(140), 4);
        let current = CurrentAttempt::from_load(Some(dec!(120)), Some(5));

        let comparison = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current.clone(),
            Some(&last),
            &[],
            Some(&best),
        );

        let last_snapshot = comparison.last_session.unwrap();
        assert_eq!(last_snapshot.weight, Some(dec!(100)));
        assert_eq!(last_snapshot.volume, Some(dec!(500)));

        let best_snapshot = comparison.all_time_best.unwrap();
        assert_eq!(best_snapshot.volume, Some(dec!(560)));

        assert_eq!(comparison.current, current);
        assert_eq!(comparison.exercise_id, "exercise_deadlift");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&OverloadStatus::Improved).unwrap();
        assert_eq!(json, "\"improved\"");
        let json = serde_json::to_string(&OverloadStatus::New).unwrap();
        assert_eq!(json, "\"new\"");
    }

    #[test]
    fn test_comparison_is_deterministic() {
        let last = stored_set(20, dec!(100), 5);
        let sets = vec![stored_set(19, dec!(95), 5)];
        let current = CurrentAttempt::from_load(Some(dec!(105)), Some(5));

        let first = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current.clone(),
            Some(&last),
            &sets,
            Some(&last),
        );
        let second = OverloadComparator::compare_overload(
            "exercise_deadlift",
            current,
            Some(&last),
            &sets,
            Some(&last),
        );
        assert_eq!(first, second);
    }
}
