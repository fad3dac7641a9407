use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use latest_departure::batch::{DEFAULT_BATCH_SIZE, WeightedQuery, commute_totals, run_batch};
use latest_departure::cache::{CacheConfig, CachedSchedule};
use latest_departure::domain::{SECS_PER_HOUR, ServiceTime, StopId};
use latest_departure::itinerary::{Itinerary, ItineraryError};
use latest_departure::report::QueryReport;
use latest_departure::schedule::{
    DatabaseConfig, InMemorySchedule, PostgresSchedule, ScheduleError, ScheduleStore,
};
use latest_departure::traversal::{Destination, Query, Traversal, TraversalConfig, TraversalError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON feed file; without it the database named by DBUSER, DBPASS,
    /// DBHOST, DBPORT and DBNAME is used
    #[arg(long, global = true)]
    feed: Option<PathBuf>,

    /// Window increment in minutes
    #[arg(long, global = true, default_value_t = SECS_PER_HOUR / 60)]
    window_mins: u32,

    /// Upper bound on each schedule store call, in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest departure from every stop to one destination
    Query {
        /// Destination stop name (or id with --by-id)
        destination: String,
        /// Service date, YYYY-MM-DD
        date: NaiveDate,
        /// Arrival deadline, HH:MM
        #[arg(value_parser = ServiceTime::parse_hhmm)]
        time: ServiceTime,
        /// Ignore departures before this time, HH:MM
        #[arg(long, default_value = "00:00", value_parser = ServiceTime::parse_hhmm)]
        earliest: ServiceTime,
        /// Treat the destination as a stop id
        #[arg(long)]
        by_id: bool,
        /// Also print the itinerary from the stop with this name
        #[arg(long)]
        itinerary_from: Option<String>,
    },
    /// Weighted commute totals over a JSON list of queries
    Commute {
        /// File with entries {destination, date, time, earliest_departure?, weight}
        queries: PathBuf,
    },
}

/// One entry of a commute file.
#[derive(Debug, Deserialize)]
struct CommuteEntry {
    destination: String,
    date: NaiveDate,
    time: ServiceTime,
    #[serde(default)]
    earliest_departure: ServiceTime,
    weight: u32,
}

#[derive(Debug, Serialize)]
struct CommuteTotal {
    name: String,
    minutes: f64,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    Itinerary(#[from] ItineraryError),

    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "query failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = TraversalConfig::new(cli.window_mins.saturating_mul(60), cli.timeout_secs);
    let cache_config = CacheConfig::default();

    match &cli.feed {
        Some(path) => {
            let store = InMemorySchedule::from_json_file(path)?;
            info!(path = %path.display(), stops = store.stop_count(), "loaded feed");
            execute(&CachedSchedule::new(store, &cache_config), &config, &cli.command).await
        }
        None => {
            let db = DatabaseConfig::from_env()?;
            let store = PostgresSchedule::connect(&db).await?;
            execute(&CachedSchedule::new(store, &cache_config), &config, &cli.command).await
        }
    }
}

async fn execute<S: ScheduleStore + Sync>(
    store: &S,
    config: &TraversalConfig,
    command: &Command,
) -> Result<(), CliError> {
    match command {
        Command::Query {
            destination,
            date,
            time,
            earliest,
            by_id,
            itinerary_from,
        } => {
            let destination = if *by_id {
                let id = StopId::parse(destination)
                    .map_err(|_| TraversalError::UnknownDestination(destination.clone()))?;
                Destination::Id(id)
            } else {
                Destination::Name(destination.clone())
            };
            let query = Query::new(destination, *date, *time).with_earliest_departure(*earliest);
            let map = Traversal::new(store, config).run(&query).await?;

            let itinerary = match itinerary_from {
                Some(name) => {
                    let start = map
                        .find_by_name(name)
                        .ok_or_else(|| ItineraryError::UnknownStop(name.clone()))?;
                    Some(Itinerary::reconstruct(&map, &start.stop.id)?)
                }
                None => None,
            };

            let report = QueryReport::new(&map, itinerary.as_ref());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Commute { queries } => {
            let json = std::fs::read_to_string(queries).map_err(|source| CliError::Read {
                path: queries.clone(),
                source,
            })?;
            let entries: Vec<CommuteEntry> = serde_json::from_str(&json)?;
            let weighted: Vec<WeightedQuery> = entries
                .into_iter()
                .map(|entry| {
                    WeightedQuery::new(
                        Query::new(Destination::Name(entry.destination), entry.date, entry.time)
                            .with_earliest_departure(entry.earliest_departure),
                        entry.weight,
                    )
                })
                .collect();

            let results = run_batch(store, config, &weighted, DEFAULT_BATCH_SIZE).await?;
            let totals = commute_totals(&results);
            let names: BTreeMap<&StopId, &str> = results
                .first()
                .map(|r| {
                    r.map
                        .stops
                        .iter()
                        .map(|(id, s)| (id, s.stop.name.as_str()))
                        .collect()
                })
                .unwrap_or_default();

            let rendered: BTreeMap<String, CommuteTotal> = totals
                .iter()
                .map(|(id, minutes)| {
                    let name = names.get(id).copied().unwrap_or_default().to_string();
                    (
                        id.to_string(),
                        CommuteTotal {
                            name,
                            minutes: *minutes,
                        },
                    )
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
    }

    Ok(())
}
