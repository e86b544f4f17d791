//! Squall CLI - Run forecast queries against a collection directory
//!
//! Usage:
//!   squall [--data-dir <dir>] <command> [options]
//!
//! Examples:
//!   squall --data-dir ./data list --from 2025-01-26T06:00:00Z --to 2025-01-27T06:00:00Z --area kw
//!   squall facet-stats --from 2025-01-01 --to 2025-02-01
//!   squall bucket-areas
//!   squall list-densified --from 2025-01-21 --to 2025-01-27 --step-hours 6 --show-pipeline

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use squall::config::{ConnectionError, Settings, StoreConfig};
use squall::exec::Executor;
use squall::pipeline::{
    compose, Intent, TimeWindow, DEFAULT_BUCKET_BOUNDARIES, DEFAULT_BUCKET_LABEL,
    DEFAULT_DENSIFY_STEP_HOURS,
};
use squall::store::MemoryStore;

#[derive(Parser)]
#[command(name = "squall")]
#[command(about = "Squall - typed aggregation pipelines over forecast collections")]
#[command(version)]
struct Cli {
    /// Directory of collection files (falls back to SQUALL_DATA_DIR, then squall.toml)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to a config file (default: squall.toml discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the composed pipeline in wire form to stderr before running
    #[arg(long, global = true)]
    show_pipeline: bool,

    /// Output format
    #[arg(long, global = true, default_value = "pretty")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Inclusive time window; accepts RFC 3339 instants or bare dates (midnight UTC).
#[derive(Args)]
struct WindowArgs {
    /// Window start
    #[arg(long, value_parser = parse_instant)]
    from: DateTime<Utc>,

    /// Window end
    #[arg(long, value_parser = parse_instant)]
    to: DateTime<Utc>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly avg/min/max of the overnight low across 24-hour outlooks
    FacetStats {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Nowcast counts and members bucketed by area initial
    BucketAreas {
        /// Ascending bucket boundaries over area initials, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_BUCKET_BOUNDARIES.map(String::from))]
        boundaries: Vec<String>,

        /// Bucket label for initials outside every boundary range
        #[arg(long, default_value = DEFAULT_BUCKET_LABEL)]
        default_label: String,
    },

    /// Nowcast rows for areas matching a keyword, newest first
    List {
        #[command(flatten)]
        window: WindowArgs,

        /// Area keyword (case-insensitive substring; empty matches every area)
        #[arg(long, default_value = "")]
        area: String,
    },

    /// Listing with synthetic gap rows on a fixed step grid
    ListDensified {
        #[command(flatten)]
        window: WindowArgs,

        /// Area keyword (case-insensitive substring; empty matches every area)
        #[arg(long, default_value = "")]
        area: String,

        /// Gap step in hours
        #[arg(long, default_value_t = DEFAULT_DENSIFY_STEP_HOURS)]
        step_hours: i64,
    },

    /// Listing enriched with area coordinates from the reference collection
    ListEnriched {
        #[command(flatten)]
        window: WindowArgs,

        /// Area keyword (case-insensitive substring; empty matches every area)
        #[arg(long, default_value = "")]
        area: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Indented JSON array
    Pretty,
    /// Compact single-line JSON array
    Json,
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Some(at) = squall::document::parse_instant(raw) {
        return Ok(at);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!(
        "'{raw}' is not an RFC 3339 instant or YYYY-MM-DD date"
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("squall=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store_config = match resolve_store_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let store = match MemoryStore::open(&store_config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!(
                "Error opening store '{}' at '{}': {}",
                store_config.database_label(),
                store_config.data_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let intent = match build_intent(&cli.command) {
        Ok(intent) => intent,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    if cli.show_pipeline {
        let pipeline = compose(&intent);
        match serde_json::to_string_pretty(&pipeline.to_wire()) {
            Ok(rendered) => eprintln!("{rendered}"),
            Err(e) => eprintln!("Could not render pipeline: {e}"),
        }
    }

    let executor = Executor::new(store);
    match executor.run(&intent).await {
        Ok(output) => {
            let documents = Value::Array(
                output.documents.into_iter().map(Value::Object).collect(),
            );
            let rendered = match cli.output {
                OutputFormat::Pretty => serde_json::to_string_pretty(&documents),
                OutputFormat::Json => serde_json::to_string(&documents),
            };
            match rendered {
                Ok(rendered) => {
                    println!("{rendered}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error rendering results: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("Query error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Store location precedence: --data-dir flag, then SQUALL_DATA_DIR, then
/// the config file's [store] section.
fn resolve_store_config(cli: &Cli) -> Result<StoreConfig, String> {
    if let Some(dir) = &cli.data_dir {
        return Ok(StoreConfig::at(dir.clone()));
    }

    match StoreConfig::from_env() {
        Ok(config) => return Ok(config),
        Err(ConnectionError::MissingEnvVar(_)) => {}
        Err(e) => return Err(e.to_string()),
    }

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .map_err(|e| e.to_string())?;

    match settings.store_config().map_err(|e| e.to_string())? {
        Some(config) => Ok(config),
        None => Err(
            "no data directory configured; pass --data-dir, set SQUALL_DATA_DIR, \
             or add [store] data_dir to squall.toml"
                .to_string(),
        ),
    }
}

fn build_intent(command: &Commands) -> Result<Intent, String> {
    let window = |args: &WindowArgs| {
        TimeWindow::new(args.from, args.to).map_err(|e| e.to_string())
    };
    match command {
        Commands::FacetStats { window: args } => Ok(Intent::FacetStats {
            window: window(args)?,
        }),
        Commands::BucketAreas {
            boundaries,
            default_label,
        } => Ok(Intent::BucketByArea {
            boundaries: boundaries.clone(),
            default_label: default_label.clone(),
        }),
        Commands::List { window: args, area } => Ok(Intent::Listing {
            window: window(args)?,
            keyword: area.clone(),
        }),
        Commands::ListDensified {
            window: args,
            area,
            step_hours,
        } => {
            if *step_hours <= 0 {
                return Err(format!("--step-hours must be positive, got {step_hours}"));
            }
            Ok(Intent::DensifiedListing {
                window: window(args)?,
                keyword: area.clone(),
                step_hours: *step_hours,
            })
        }
        Commands::ListEnriched { window: args, area } => Ok(Intent::EnrichedListing {
            window: window(args)?,
            keyword: area.clone(),
        }),
    }
}
