use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit preferences for weight display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    Metric,
    Imperial,
}

impl Default for Units {
    fn default() -> Self {
        Units::Metric
    }
}

/// An exercise definition owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique exercise identifier
    pub id: String,

    /// Owning user identifier
    pub user_id: String,

    /// Display name (e.g. "Back Squat")
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One recorded performance of an exercise within a workout session
///
/// All load fields are optional: a bodyweight set may carry reps but no
/// weight, a timed hold may carry neither. `volume` is derived as
/// `weight * reps` when both are present and is computed once at insert
/// time by the repository; analytics code treats it as given and never
/// re-derives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    /// Unique set identifier
    pub id: String,

    /// Exercise this set was performed for
    pub exercise_id: String,

    /// Workout session this set belongs to
    pub session_id: String,

    /// Weight lifted in kilograms
    pub weight: Option<Decimal>,

    /// Repetitions completed
    pub reps: Option<u32>,

    /// Rate of perceived exertion (1-10 scale)
    pub rpe: Option<Decimal>,

    /// Work performed: weight * reps, stored at insert time
    pub volume: Option<Decimal>,

    /// When the set was recorded
    pub logged_at: DateTime<Utc>,

    /// When the containing session started; used for day bucketing
    /// and "most recent" ordering
    pub session_started_at: DateTime<Utc>,
}

impl LoggedSet {
    /// Validate numeric ranges before persistence
    pub fn validate(&self) -> Result<(), String> {
        if let Some(weight) = self.weight {
            if weight < Decimal::ZERO {
                return Err(format!("weight must be non-negative, got {}", weight));
            }
        }
        if let Some(rpe) = self.rpe {
            if rpe < Decimal::ONE || rpe > Decimal::from(10) {
                return Err(format!("rpe must be within [1,10], got {}", rpe));
            }
        }
        Ok(())
    }
}
