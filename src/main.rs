//! Prints the rows of a table that match a list of serialized where sets.
//!
//! ```text
//! recordkeeper <table> [where-sets.json]
//! ```
//!
//! The database and logging come from `recordkeeper.toml` and
//! `RECORDKEEPER__*` environment variables. Rows are written to stdout as
//! one JSON object per line.
use std::fs;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recordkeeper::persist::Persistor;
use recordkeeper::predicate::WhereSet;
use recordkeeper::settings::{Settings, DEFAULT_CONFIG_FILE};
use recordkeeper::{RecordKeeperError, Result};

fn run(settings: &Settings, table: &str, where_file: Option<&str>) -> Result<usize> {
    let where_sets: Vec<WhereSet> = match where_file {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| RecordKeeperError::Config(format!("cannot read {}: {}", path, e)))?;
            serde_json::from_str(&json)?
        }
        None => Vec::new(),
    };
    let persistor = Persistor::from_settings(settings)?;
    let rows = persistor.search(table, &where_sets, "")?;
    for row in &rows {
        println!("{}", row.to_json());
    }
    Ok(rows.len())
}

fn main() -> ExitCode {
    let settings = match Settings::load(DEFAULT_CONFIG_FILE) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_new(&settings.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(table) = args.first() else {
        eprintln!("usage: recordkeeper <table> [where-sets.json]");
        return ExitCode::FAILURE;
    };
    match run(&settings, table, args.get(1).map(String::as_str)) {
        Ok(count) => {
            info!(table = %table, rows = count, "search complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "search failed");
            ExitCode::FAILURE
        }
    }
}
