#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the risk data import tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use risk_map_database::{db, paths, queries, tracking};
use risk_map_ingest::{SliceOutcome, import_earthquakes, import_next_slice};
use risk_map_source::registry;
use risk_map_spatial::Coordinate;

#[derive(Parser)]
#[command(name = "risk_map_ingest", about = "Risk data import tool")]
struct Cli {
    /// Data directory holding the source files and the database
    /// (overrides `RISK_MAP_DATA_DIR`)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the next accident slice(s), resuming from the stored cursor
    Import {
        /// Number of units of work to process
        #[arg(long, default_value = "1")]
        slices: u64,
    },
    /// Import one year of the earthquake log
    Earthquakes {
        /// Year of the log file (e.g. 2023)
        year: u16,
    },
    /// Compute the risk summary along a route of coordinates
    Route {
        /// JSON file holding an array of [latitude, longitude] pairs
        file: PathBuf,
    },
    /// Show the import cursor and aggregate table sizes
    Status,
    /// List the configured datasets
    Datasets,
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(paths::data_dir);
    let db_path = paths::risk_db_path(&data_dir);

    match cli.command {
        Commands::Import { slices } => {
            let dataset = registry::accident_dataset();
            let conn = db::open(&db_path)?;

            for _ in 0..slices {
                match import_next_slice(&conn, &dataset, &data_dir)? {
                    SliceOutcome::Imported { cursor, records } => {
                        println!("Imported {records} record(s) for {cursor}");
                    }
                    SliceOutcome::Boundary { cursor } => {
                        println!("Crossed boundary: cursor now at {cursor}");
                    }
                    SliceOutcome::UpToDate { ending_year } => {
                        println!("Up to date: all published data through {ending_year} imported");
                        break;
                    }
                }
            }
        }
        Commands::Earthquakes { year } => {
            let dataset = registry::earthquake_dataset();
            let conn = db::open(&db_path)?;
            let today = chrono::Local::now().date_naive();
            let imported = import_earthquakes(&conn, &dataset, &data_dir, year, today)?;
            println!("Imported {imported} earthquake event(s) for {year}");
        }
        Commands::Route { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let pairs: Vec<Vec<f64>> = serde_json::from_str(&raw)?;
            let mut coordinates = Vec::with_capacity(pairs.len());
            for pair in &pairs {
                coordinates.push(Coordinate::from_pair(pair)?);
            }

            let conn = db::open(&db_path)?;
            let risk = queries::route_risk(&conn, &coordinates)?;
            println!("{}", serde_json::to_string_pretty(&risk)?);
        }
        Commands::Status => {
            let conn = db::open(&db_path)?;

            match tracking::load_cursor(&conn)? {
                Some(cursor) => println!("Cursor: {cursor}"),
                None => println!("Cursor: not started"),
            }

            let counts = queries::store_counts(&conn)?;
            println!("{:<24} ROWS", "TABLE");
            println!("{}", "-".repeat(32));
            println!("{:<24} {}", "traffic_accident", counts.traffic_cells);
            println!("{:<24} {}", "pedestrian_hell", counts.pedestrian_areas);
            println!("{:<24} {}", "earthquake", counts.earthquakes);
            println!("{:<24} {}", "earthquake_intensity", counts.intensity_areas);
        }
        Commands::Datasets => {
            let accidents = registry::accident_dataset();
            let earthquakes = registry::earthquake_dataset();
            println!("{:<20} YEARS        NAME", "ID");
            println!("{}", "-".repeat(60));
            println!(
                "{:<20} {:>4}-{:<6} {}",
                accidents.id, accidents.starting_year, accidents.ending_year, accidents.name
            );
            println!(
                "{:<20} {:>4}-{:<6} {}",
                earthquakes.id, earthquakes.starting_year, earthquakes.ending_year, earthquakes.name
            );
        }
    }

    Ok(())
}
