//! SQLite repository for users, exercises, sessions, and logged sets
//!
//! Implements the query contract the analytics engine depends on: every
//! fetch filters by ownership and excludes soft-deleted rows, so deleted
//! sets never reach the aggregation or comparison code. Decimal fields are
//! stored as text to avoid floating-point drift; timestamps are stored as
//! RFC 3339 UTC strings, which order correctly under SQLite text
//! comparison.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{Exercise, LoggedSet};

/// Database error types
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Data not found: {0}")]
    NotFound(String),
}

/// Fetch ordering for set queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOrder {
    /// Oldest session first (chart series input)
    Ascending,
    /// Most recent session first (stats input)
    Descending,
}

/// A set about to be persisted; the repository assigns the id and derives
/// the stored volume
#[derive(Debug, Clone)]
pub struct NewSet {
    pub exercise_id: String,
    pub session_id: String,
    pub weight: Option<Decimal>,
    pub reps: Option<u32>,
    pub rpe: Option<Decimal>,
    pub logged_at: DateTime<Utc>,
    pub session_started_at: DateTime<Utc>,
}

/// Database connection and management
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an ephemeral in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), DatabaseError> {
        // journal_mode returns the resulting mode as a row, so it needs the
        // checked variant
        self.conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                api_token TEXT UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,

                FOREIGN KEY (user_id) REFERENCES users (id),
                UNIQUE (user_id, name)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                started_at TEXT NOT NULL,

                FOREIGN KEY (user_id) REFERENCES users (id)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS logged_sets (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                session_id TEXT NOT NULL,

                -- Load fields; decimals stored as text
                weight TEXT,
                reps INTEGER,
                rpe TEXT,
                volume TEXT,

                logged_at TEXT NOT NULL,
                session_started_at TEXT NOT NULL,

                -- Soft delete marker; deleted rows are invisible to every query
                deleted_at TEXT,

                FOREIGN KEY (user_id) REFERENCES users (id),
                FOREIGN KEY (exercise_id) REFERENCES exercises (id),
                FOREIGN KEY (session_id) REFERENCES sessions (id)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sets_user_exercise_started
             ON logged_sets (user_id, exercise_id, session_started_at)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sets_volume
             ON logged_sets (user_id, exercise_id, volume) WHERE volume IS NOT NULL",
            [],
        )?;

        Ok(())
    }

    /// Create a user if it does not exist yet
    pub fn ensure_user(
        &self,
        user_id: &str,
        name: &str,
        api_token: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (id, name, api_token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, name, api_token, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Resolve a bearer token to a user id
    pub fn user_id_for_token(&self, token: &str) -> Result<Option<String>, DatabaseError> {
        let user_id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE api_token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }

    /// Find an exercise by name for a user, creating it when missing
    pub fn ensure_exercise(&self, user_id: &str, name: &str) -> Result<Exercise, DatabaseError> {
        if let Some(exercise) = self
            .conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM exercises
                 WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
                Self::exercise_from_row,
            )
            .optional()?
        {
            return Ok(exercise);
        }

        let exercise = Exercise {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO exercises (id, user_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                exercise.id,
                exercise.user_id,
                exercise.name,
                exercise.created_at.to_rfc3339()
            ],
        )?;
        Ok(exercise)
    }

    /// Load an exercise owned by the user, None when absent or not owned
    pub fn find_exercise(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Option<Exercise>, DatabaseError> {
        let exercise = self
            .conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM exercises
                 WHERE id = ?1 AND user_id = ?2",
                params![exercise_id, user_id],
                Self::exercise_from_row,
            )
            .optional()?;
        Ok(exercise)
    }

    /// Get the user's session for the UTC day of `started_at`, creating one
    /// when none exists yet
    pub fn session_for(
        &self,
        user_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<String, DatabaseError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM sessions WHERE user_id = ?1 AND date(started_at) = date(?2)",
                params![user_id, started_at.to_rfc3339()],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, started_at) VALUES (?1, ?2, ?3)",
            params![id, user_id, started_at.to_rfc3339()],
        )?;
        Ok(id)
    }

    /// Persist a set, deriving volume from weight and reps when both are
    /// present
    pub fn insert_set(&self, user_id: &str, new_set: &NewSet) -> Result<LoggedSet, DatabaseError> {
        let volume = match (new_set.weight, new_set.reps) {
            (Some(weight), Some(reps)) => Some(weight * Decimal::from(reps)),
            _ => None,
        };

        let set = LoggedSet {
            id: Uuid::new_v4().to_string(),
            exercise_id: new_set.exercise_id.clone(),
            session_id: new_set.session_id.clone(),
            weight: new_set.weight,
            reps: new_set.reps,
            rpe: new_set.rpe,
            volume,
            logged_at: new_set.logged_at,
            session_started_at: new_set.session_started_at,
        };
        set.validate().map_err(DatabaseError::InvalidData)?;

        self.conn.execute(
            r#"
            INSERT INTO logged_sets (
                id, user_id, exercise_id, session_id,
                weight, reps, rpe, volume,
                logged_at, session_started_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                set.id,
                user_id,
                set.exercise_id,
                set.session_id,
                set.weight.map(|w| w.to_string()),
                set.reps,
                set.rpe.map(|r| r.to_string()),
                set.volume.map(|v| v.to_string()),
                set.logged_at.to_rfc3339(),
                set.session_started_at.to_rfc3339(),
            ],
        )?;

        Ok(set)
    }

    /// Mark a set deleted without removing the row
    pub fn soft_delete_set(&self, user_id: &str, set_id: &str) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE logged_sets SET deleted_at = ?1
             WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
            params![Utc::now().to_rfc3339(), set_id, user_id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(format!("set {}", set_id)));
        }
        Ok(())
    }

    /// Fetch all live sets for one exercise, optionally restricted to
    /// sessions at or after `since`
    pub fn fetch_sets_for_exercise(
        &self,
        user_id: &str,
        exercise_id: &str,
        since: Option<DateTime<Utc>>,
        order: SetOrder,
    ) -> Result<Vec<LoggedSet>, DatabaseError> {
        let direction = match order {
            SetOrder::Ascending => "ASC",
            SetOrder::Descending => "DESC",
        };

        let mut sets = Vec::new();
        match since {
            Some(since) => {
                let query = format!(
                    "{} AND session_started_at >= ?3 ORDER BY session_started_at {}, logged_at {}",
                    SELECT_SETS, direction, direction
                );
                let mut stmt = self.conn.prepare(&query)?;
                let rows = stmt.query_map(
                    params![user_id, exercise_id, since.to_rfc3339()],
                    Self::set_from_row,
                )?;
                for row in rows {
                    sets.push(row?);
                }
            }
            None => {
                let query = format!(
                    "{} ORDER BY session_started_at {}, logged_at {}",
                    SELECT_SETS, direction, direction
                );
                let mut stmt = self.conn.prepare(&query)?;
                let rows = stmt.query_map(params![user_id, exercise_id], Self::set_from_row)?;
                for row in rows {
                    sets.push(row?);
                }
            }
        }

        Ok(sets)
    }

    /// Most recent live set for the exercise, by session start then log time
    pub fn fetch_last_set(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Option<LoggedSet>, DatabaseError> {
        let query = format!(
            "{} ORDER BY session_started_at DESC, logged_at DESC LIMIT 1",
            SELECT_SETS
        );
        let set = self
            .conn
            .query_row(&query, params![user_id, exercise_id], Self::set_from_row)
            .optional()?;
        Ok(set)
    }

    /// All live sets with session start at or after `week_start` (inclusive)
    pub fn fetch_weekly_sets(
        &self,
        user_id: &str,
        exercise_id: &str,
        week_start: DateTime<Utc>,
    ) -> Result<Vec<LoggedSet>, DatabaseError> {
        self.fetch_sets_for_exercise(user_id, exercise_id, Some(week_start), SetOrder::Descending)
    }

    /// The maximum-volume live set across all time
    ///
    /// Ties on volume are broken by the earliest session start, so the
    /// result is deterministic regardless of insert order.
    pub fn fetch_all_time_best_set(
        &self,
        user_id: &str,
        exercise_id: &str,
    ) -> Result<Option<LoggedSet>, DatabaseError> {
        let query = format!(
            "{} AND volume IS NOT NULL
             ORDER BY CAST(volume AS REAL) DESC, session_started_at ASC LIMIT 1",
            SELECT_SETS
        );
        let set = self
            .conn
            .query_row(&query, params![user_id, exercise_id], Self::set_from_row)
            .optional()?;
        Ok(set)
    }

    /// Helper to convert a database row to a LoggedSet
    fn set_from_row(row: &Row) -> rusqlite::Result<LoggedSet> {
        Ok(LoggedSet {
            id: row.get("id")?,
            exercise_id: row.get("exercise_id")?,
            session_id: row.get("session_id")?,
            weight: parse_decimal(row.get("weight")?)?,
            reps: row.get::<_, Option<i64>>("reps")?.map(|r| r as u32),
            rpe: parse_decimal(row.get("rpe")?)?,
            volume: parse_decimal(row.get("volume")?)?,
            logged_at: parse_datetime(row.get("logged_at")?)?,
            session_started_at: parse_datetime(row.get("session_started_at")?)?,
        })
    }

    /// Helper to convert a database row to an Exercise
    fn exercise_from_row(row: &Row) -> rusqlite::Result<Exercise> {
        Ok(Exercise {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            created_at: parse_datetime(row.get("created_at")?)?,
        })
    }
}

/// Shared SELECT prefix for set queries; every caller appends its own
/// ordering and extra predicates
const SELECT_SETS: &str = r#"
    SELECT id, exercise_id, session_id, weight, reps, rpe, volume,
           logged_at, session_started_at
    FROM logged_sets
    WHERE user_id = ?1 AND exercise_id = ?2 AND deleted_at IS NULL
"#;

fn parse_decimal(value: Option<String>) -> rusqlite::Result<Option<Decimal>> {
    value
        .map(|s| {
            Decimal::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}

fn parse_datetime(value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
