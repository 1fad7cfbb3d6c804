//! Surcharge engine operator CLI
//!
//! Classifies single shifts, submits and deletes records in a JSON data file
//! and runs the batch recompute over it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use surcharge_engine::calculation::{DayKind, ShiftHours, classify};
use surcharge_engine::config::{ClassifierConfig, ConfigLoader};
use surcharge_engine::engine::{RecomputeJob, RecomputeOptions, RecordService};
use surcharge_engine::error::{EngineError, EngineResult};
use surcharge_engine::models::{NewRecord, RecordId};
use surcharge_engine::store::Store;

#[derive(Parser)]
#[command(name = "surcharge-engine")]
#[command(version)]
#[command(about = "Classify driver work days into statutory surcharge categories")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory (engine.yaml, catalog.yaml, rules/)
    #[arg(long, short = 'c', global = true, default_value = "config/colombia")]
    config: PathBuf,

    /// Use the rule set effective on this date instead of the newest one
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Actor recorded on written rows
    #[arg(long, global = true)]
    actor: Option<Uuid>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one shift and print the breakdown as JSON
    Classify {
        /// Clock-in hour
        #[arg(long)]
        start: Decimal,

        /// Clock-out hour
        #[arg(long)]
        end: Decimal,

        /// Hours worked
        #[arg(long)]
        total: Decimal,

        /// Sunday or public holiday
        #[arg(long)]
        special: bool,
    },

    /// Create a record from a JSON payload, or replace the days of an existing one
    Submit {
        /// Store data file (created if missing)
        #[arg(long, short = 'd')]
        data: PathBuf,

        /// JSON payload with the record and its days
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Replace the days of this record instead of creating one
        #[arg(long, short = 'r')]
        record: Option<u64>,
    },

    /// Soft-delete a record with its days and details
    Delete {
        /// Store data file
        #[arg(long, short = 'd')]
        data: PathBuf,

        /// Record to delete
        #[arg(long, short = 'r')]
        record: u64,
    },

    /// Recompute every persisted day and print the audit report
    Recompute {
        /// Store data file
        #[arg(long, short = 'd')]
        data: PathBuf,

        /// Number of parallel workers. 0 = auto (CPU count). Uses config value if not specified.
        #[arg(long, short = 'j')]
        workers: Option<usize>,

        /// Compare only, write nothing
        #[arg(long)]
        dry_run: bool,

        /// Also write the report as JSON to this file
        #[arg(long, short = 'o')]
        report: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> EngineResult<()> {
    let loader = ConfigLoader::load(&cli.config)?;
    let rules = select_rules(&loader, cli.as_of)?;
    let actor = cli.actor.unwrap_or_else(Uuid::nil);

    match cli.command {
        Commands::Classify {
            start,
            end,
            total,
            special,
        } => {
            let shift = ShiftHours {
                start_hour: start,
                end_hour: end,
                total_hours: total,
            };
            let breakdown = classify(&shift, DayKind::from_special(special), &rules);
            println!("{}", to_json(&breakdown)?);
        }

        Commands::Submit {
            data,
            input,
            record,
        } => {
            let payload: NewRecord = read_json(&input)?;
            let store = if data.exists() {
                Store::load_snapshot(&data)?
            } else {
                Store::new()
            };
            let service = RecordService::new(&store, loader.catalog(), rules);

            let saved = match record {
                Some(id) => service.update_record(RecordId(id), &payload.days, actor)?,
                None => service.create_record(payload, actor)?,
            };
            store.save_snapshot(&data)?;
            println!("{}", to_json(&saved)?);
        }

        Commands::Delete { data, record } => {
            let store = Store::load_snapshot(&data)?;
            RecordService::new(&store, loader.catalog(), rules).delete_record(RecordId(record))?;
            store.save_snapshot(&data)?;
            println!("Record {} deleted", record);
        }

        Commands::Recompute {
            data,
            workers,
            dry_run,
            report,
        } => {
            let store = Store::load_snapshot(&data)?;
            let mut options = RecomputeOptions::from(&loader.metadata().recompute);
            options.dry_run = dry_run;
            options.workers = match workers {
                Some(0) => num_cpus::get(),
                Some(n) => n,
                None => options.workers,
            };

            let result = RecomputeJob::new(&store, loader.catalog(), rules, actor)
                .with_options(options)
                .run();

            if !dry_run {
                store.save_snapshot(&data)?;
            }
            if let Some(path) = report {
                write_file(&path, &to_json(&result)?)?;
                info!(path = %path.display(), "Report written");
            }
            print!("{}", result);
        }
    }

    Ok(())
}

fn select_rules(loader: &ConfigLoader, as_of: Option<NaiveDate>) -> EngineResult<ClassifierConfig> {
    match as_of {
        Some(date) => loader.rules_at(date),
        None => Ok(loader.current_rules()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
        path: path.display().to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| EngineError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| EngineError::Snapshot {
        path: "<stdout>".to_string(),
        message: e.to_string(),
    })
}

fn write_file(path: &Path, content: &str) -> EngineResult<()> {
    fs::write(path, content).map_err(|e| EngineError::Snapshot {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
