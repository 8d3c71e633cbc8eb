//! CLI entry point for the pedestrian counts tool.
//!
//! Loads the dataset once, then answers a single query: hourly counts for a
//! location, the measured locations of a date, or a dataset summary.

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ped_counts::dataset::DatasetSource;
use ped_counts::output::{print_pretty, write_csv, write_json};
use ped_counts::service::DatasetService;
use ped_counts::view::{PersonGroup, filter_weather, hourly_points};
use serde::Serialize;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_SOURCE: &str = "Gesamtdatensatz.csv";

#[derive(Parser)]
#[command(name = "ped_counts")]
#[command(about = "Query hourly pedestrian counts per observation point", long_about = None)]
struct Cli {
    /// Dataset CSV (optionally gzipped), as a path or URL.
    /// Defaults to $PED_DATASET_SOURCE, then Gesamtdatensatz.csv
    #[arg(short, long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hourly counts for one location on one date
    PedData {
        /// Exact location name
        #[arg(short, long)]
        location: String,

        /// Date, e.g. 2021-09-29
        #[arg(short, long)]
        date: String,

        /// Zone of the observation point: all, 1, 2 or 3
        #[arg(short, long, default_value = "all")]
        zone: String,

        /// Reduce rows to chart points for a person group: all, adults or children
        #[arg(short, long)]
        group: Option<String>,

        /// Only keep rows with this weather condition
        #[arg(short, long, default_value = "all")]
        weather: String,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Locations with measured data on a date
    Locations {
        /// Date, e.g. 2021-09-29
        #[arg(short, long)]
        date: String,
    },
    /// Row count, location count and date range of the dataset
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    let source = cli
        .source
        .or_else(|| std::env::var("PED_DATASET_SOURCE").ok())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    let source = DatasetSource::parse(&source);

    info!(source = %source, "Loading dataset");
    let service = DatasetService::spawn(source.clone());
    let table = service
        .table()
        .await
        .with_context(|| format!("dataset {source} could not be loaded"))?;
    debug!(rows = table.len(), "Serving queries");

    match cli.command {
        Commands::PedData {
            location,
            date,
            zone,
            group,
            weather,
            format,
        } => {
            let rows = service.pedestrian_data(&location, &date, &zone).await?;
            let rows = filter_weather(rows, &weather);
            info!(%location, %date, %zone, rows = rows.len(), "Pedestrian data");

            match group {
                Some(group) => {
                    let group: PersonGroup = group.parse()?;
                    emit(&hourly_points(&rows, group), format)?;
                }
                None => emit(&rows, format)?,
            }
        }
        Commands::Locations { date } => {
            let groups = service.locations(&date).await?;
            info!(
                %date,
                locations = groups.iter().map(|g| g.locations.len()).sum::<usize>(),
                "Locations"
            );
            write_json(io::stdout().lock(), &groups)?;
        }
        Commands::Summary => {
            let summary = table.summary();
            print_pretty(&summary);
            write_json(io::stdout().lock(), &summary)?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(rows: &[T], format: Format) -> Result<()> {
    let stdout = io::stdout().lock();
    match format {
        Format::Json => write_json(stdout, rows),
        Format::Csv => write_csv(stdout, rows),
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// Stdout is reserved for query results.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ped_counts.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ped_counts.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
