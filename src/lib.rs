// Library interface for LiftRS modules
// This allows the CLI, the HTTP server, and integration tests to share
// the core analytics functionality

pub mod config;
pub mod database;
pub mod error;
pub mod formulas;
pub mod logging;
pub mod models;
pub mod overload;
pub mod server;
pub mod stats;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{LiftRsError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{Exercise, LoggedSet, Units};
pub use overload::{
    CurrentAttempt, OverloadComparator, OverloadComparison, OverloadStatus, SetSnapshot,
    WeeklyAverage,
};
pub use stats::{ChartPoint, ExerciseStatsSummary, StatsCalculator};
