use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::path::PathBuf;

use liftrs::config::{default_config_path, AppConfig};
use liftrs::database::{Database, NewSet, SetOrder};
use liftrs::formulas::kg_to_lbs;
use liftrs::logging::{init_logging, LogLevel};
use liftrs::models::Units;
use liftrs::overload::{CurrentAttempt, OverloadComparator, OverloadComparison, OverloadStatus};
use liftrs::stats::StatsCalculator;

/// LiftRS - Progressive Overload Analytics CLI
///
/// A Rust-based tool for logging strength-training sets and analyzing
/// progressive overload, volume trends, and estimated one-rep maxes.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(version = "0.1.0")]
#[command(about = "Progressive Overload Analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a set and see how it compares to your history
    Log {
        /// Exercise name (created on first use)
        #[arg(short, long)]
        exercise: String,

        /// Weight in kilograms
        #[arg(short, long)]
        weight: Option<Decimal>,

        /// Repetitions completed
        #[arg(short, long)]
        reps: Option<u32>,

        /// Rate of perceived exertion (1-10)
        #[arg(long)]
        rpe: Option<Decimal>,
    },

    /// Show summary statistics for an exercise
    Stats {
        /// Exercise name
        #[arg(short, long)]
        exercise: String,

        /// Window in days
        #[arg(short, long, default_value = "90")]
        days: u32,
    },

    /// Show the per-day chart series for an exercise
    Chart {
        /// Exercise name
        #[arg(short, long)]
        exercise: String,

        /// Window in days
        #[arg(short, long, default_value = "90")]
        days: u32,
    },

    /// Compare a proposed set against your history without logging it
    Compare {
        /// Exercise name
        #[arg(short, long)]
        exercise: String,

        /// Weight in kilograms
        #[arg(short, long)]
        weight: Option<Decimal>,

        /// Repetitions
        #[arg(short, long)]
        reps: Option<u32>,
    },

    /// Run the HTTP analytics server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = AppConfig::load(&config_path)?;

    match cli.verbose {
        0 => {}
        1 => config.log.level = LogLevel::Debug,
        _ => config.log.level = LogLevel::Trace,
    }
    init_logging(&config.log)?;

    match cli.command {
        Commands::Log {
            exercise,
            weight,
            reps,
            rpe,
        } => run_log(&config, &exercise, weight, reps, rpe),

        Commands::Stats { exercise, days } => run_stats(&config, &exercise, days),

        Commands::Chart { exercise, days } => run_chart(&config, &exercise, days),

        Commands::Compare {
            exercise,
            weight,
            reps,
        } => run_compare(&config, &exercise, weight, reps),

        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let db = open_database(&config)?;
            liftrs::server::run_server(&config, db).await
        }
    }
}

/// Open the configured database and make sure the default user exists
fn open_database(config: &AppConfig) -> Result<Database> {
    std::fs::create_dir_all(&config.settings.data_dir)?;
    let db = Database::new(config.database_path())?;
    let user = &config.settings.default_user_id;
    db.ensure_user(user, user, None)?;
    Ok(db)
}

fn run_log(
    config: &AppConfig,
    exercise_name: &str,
    weight: Option<Decimal>,
    reps: Option<u32>,
    rpe: Option<Decimal>,
) -> Result<()> {
    let db = open_database(config)?;
    let user = &config.settings.default_user_id;
    let exercise = db.ensure_exercise(user, exercise_name)?;

    let now = Utc::now();
    let week_start = now - Duration::days(7);

    // Snapshot history before the insert so the new set compares against
    // its predecessors, not itself
    let last_set = db.fetch_last_set(user, &exercise.id)?;
    let weekly_sets = db.fetch_weekly_sets(user, &exercise.id, week_start)?;
    let best_set = db.fetch_all_time_best_set(user, &exercise.id)?;

    let session_id = db.session_for(user, now)?;
    let set = db.insert_set(
        user,
        &NewSet {
            exercise_id: exercise.id.clone(),
            session_id,
            weight,
            reps,
            rpe,
            logged_at: now,
            session_started_at: now,
        },
    )?;

    println!(
        "{}",
        format!("Logged {} for {}", format_load(&set.weight, &set.reps, config), exercise.name)
            .green()
            .bold()
    );

    let current = CurrentAttempt::from_load(set.weight, set.reps);
    let comparison = OverloadComparator::compare_overload(
        &exercise.id,
        current,
        last_set.as_ref(),
        &weekly_sets,
        best_set.as_ref(),
    );
    print_comparison(&comparison, config);
    Ok(())
}

fn run_stats(config: &AppConfig, exercise_name: &str, days: u32) -> Result<()> {
    let db = open_database(config)?;
    let user = &config.settings.default_user_id;
    let exercise = db.ensure_exercise(user, exercise_name)?;

    let since = Utc::now() - Duration::days(i64::from(days));
    let sets = db.fetch_sets_for_exercise(user, &exercise.id, Some(since), SetOrder::Descending)?;

    println!(
        "{}",
        format!("{} — last {} days", exercise.name, days).blue().bold()
    );
    match StatsCalculator::compute_stats(&sets) {
        None => println!("  No sets logged in this window."),
        Some(stats) => {
            println!("  Total sets:     {}", stats.total_sets);
            println!("  Total volume:   {}", stats.total_volume.round_dp(1));
            println!("  Max weight:     {}", format_weight(stats.max_weight, config));
            println!("  Max reps:       {}", stats.max_reps);
            println!("  Max volume:     {}", stats.max_volume.round_dp(1));
            println!("  Avg weight:     {}", format_weight(stats.average_weight.round_dp(1), config));
            println!("  Avg reps:       {}", stats.average_reps.round_dp(1));
            println!("  Last session:   {}", stats.last_session_date.format("%Y-%m-%d"));
        }
    }
    Ok(())
}

fn run_chart(config: &AppConfig, exercise_name: &str, days: u32) -> Result<()> {
    let db = open_database(config)?;
    let user = &config.settings.default_user_id;
    let exercise = db.ensure_exercise(user, exercise_name)?;

    let since = Utc::now() - Duration::days(i64::from(days));
    let sets = db.fetch_sets_for_exercise(user, &exercise.id, Some(since), SetOrder::Ascending)?;
    let series = StatsCalculator::build_chart_series(&sets);

    println!(
        "{}",
        format!("{} — daily averages, last {} days", exercise.name, days)
            .cyan()
            .bold()
    );
    if series.is_empty() {
        println!("  No sets logged in this window.");
        return Ok(());
    }

    println!("  {:<12} {:>10} {:>8} {:>10} {:>6} {:>10}", "date", "weight", "reps", "volume", "rpe", "est 1RM");
    for point in series {
        println!(
            "  {:<12} {:>10} {:>8} {:>10} {:>6} {:>10}",
            point.date.format("%Y-%m-%d"),
            format_optional(point.average_weight.map(|w| w.round_dp(1))),
            format_optional(point.average_reps.map(|r| r.round_dp(1))),
            format_optional(point.average_volume.map(|v| v.round_dp(1))),
            format_optional(point.average_rpe.map(|r| r.round_dp(1))),
            format_optional(point.estimated_one_rm.map(|m| m.round_dp(1))),
        );
    }
    Ok(())
}

fn run_compare(
    config: &AppConfig,
    exercise_name: &str,
    weight: Option<Decimal>,
    reps: Option<u32>,
) -> Result<()> {
    let db = open_database(config)?;
    let user = &config.settings.default_user_id;
    let exercise = db.ensure_exercise(user, exercise_name)?;

    let now = Utc::now();
    let last_set = db.fetch_last_set(user, &exercise.id)?;
    let weekly_sets = db.fetch_weekly_sets(user, &exercise.id, now - Duration::days(7))?;
    let best_set = db.fetch_all_time_best_set(user, &exercise.id)?;

    let current = CurrentAttempt::from_load(weight, reps);
    let comparison = OverloadComparator::compare_overload(
        &exercise.id,
        current,
        last_set.as_ref(),
        &weekly_sets,
        best_set.as_ref(),
    );

    println!(
        "{}",
        format!(
            "{} — proposed {}",
            exercise.name,
            format_load(&weight, &reps, config)
        )
        .blue()
        .bold()
    );
    print_comparison(&comparison, config);
    Ok(())
}

fn print_comparison(comparison: &OverloadComparison, config: &AppConfig) {
    let status_line = match comparison.status {
        OverloadStatus::Improved => "▲ improved — more volume than last session".green().bold(),
        OverloadStatus::Maintained => "= maintained — same volume as last session".yellow().bold(),
        OverloadStatus::Regressed => "▼ regressed — less volume than last session".red().bold(),
        OverloadStatus::New => "★ new — no comparable history".blue().bold(),
    };
    println!("{}", status_line);

    if let Some(last) = &comparison.last_session {
        println!(
            "  Last session:  {} on {}",
            format_load(&last.weight, &last.reps, config),
            last.session_started_at.format("%Y-%m-%d")
        );
    }
    if let Some(volume) = &comparison.weekly_average.volume {
        println!("  7-day avg volume: {}", volume.round_dp(1));
    }
    if let Some(best) = &comparison.all_time_best {
        println!(
            "  All-time best: {} (volume {}) on {}",
            format_load(&best.weight, &best.reps, config),
            format_optional(best.volume.map(|v| v.round_dp(1))),
            best.session_started_at.format("%Y-%m-%d")
        );
    }
}

/// Format a weight in the configured display units
fn format_weight(kg: Decimal, config: &AppConfig) -> String {
    match config.settings.default_units {
        Units::Metric => format!("{} kg", kg),
        Units::Imperial => format!("{} lb", kg_to_lbs(kg)),
    }
}

fn format_load(weight: &Option<Decimal>, reps: &Option<u32>, config: &AppConfig) -> String {
    let weight = match weight {
        Some(w) => format_weight(*w, config),
        None => "-".to_string(),
    };
    let reps = reps.map_or("-".to_string(), |r| r.to_string());
    format!("{} x {}", weight, reps)
}

fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or("-".to_string(), |v| v.to_string())
}
