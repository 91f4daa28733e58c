//! fstable CLI
//!
//! Command-line interface for inspecting and editing a table store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fstable::{Config, Row, RowId, TableEngine, TableError, TableStorage};
use tracing_subscriber::{fmt, EnvFilter};

/// fstable CLI
#[derive(Parser, Debug)]
#[command(name = "fstable")]
#[command(about = "Partitioned key-row tables stored as delimited-text files")]
#[command(version)]
struct Args {
    /// Root directory of the table store
    #[arg(short, long, default_value = "./fstable_data")]
    root: PathBuf,

    /// Skip fsync on partition rewrites
    #[arg(long)]
    no_sync: bool,

    /// Print rows as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all tables
    Tables,

    /// List the partitions of a table
    Partitions {
        table: String,
    },

    /// Delete a table
    Drop {
        table: String,
    },

    /// Print a partition, or a single row
    Get {
        table: String,
        partition_key: String,
        row_key: Option<String>,
    },

    /// Print every row of a table
    Scan {
        table: String,
    },

    /// Insert a row (fails if the row exists)
    Insert(RowArgs),

    /// Insert a row, replacing any existing row
    Upsert(RowArgs),

    /// Merge cells into a row
    Merge(RowArgs),

    /// Delete rows from a partition
    Delete {
        table: String,
        partition_key: String,
        /// Row keys to delete
        #[arg(required = true)]
        row_keys: Vec<String>,
    },

    /// Remove temp files left by interrupted rewrites
    Sweep {
        table: String,
        /// Only remove temp files at least this old
        #[arg(long, default_value_t = 3600)]
        older_than_secs: u64,
    },
}

#[derive(clap::Args, Debug)]
struct RowArgs {
    table: String,
    partition_key: String,
    row_key: String,
    /// Cells as name=value
    #[arg(value_parser = parse_cell)]
    cells: Vec<(String, String)>,
}

impl RowArgs {
    fn into_row(self) -> (String, Row) {
        let mut row = Row::new(self.partition_key, self.row_key);
        for (name, value) in self.cells {
            row.set(name, value);
        }
        (self.table, row)
    }
}

fn parse_cell(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fstable=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .root_dir(&args.root)
        .sync_writes(!args.no_sync)
        .build();
    let engine = TableEngine::open(config);

    tracing::debug!("fstable v{} at {}", fstable::VERSION, args.root.display());

    match run(&engine, args.command, args.json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &TableEngine, command: Commands, json: bool) -> Result<(), TableError> {
    let print_rows = |rows: &[Row]| -> Result<(), TableError> {
        for row in rows {
            print_row(row, json)?;
        }
        Ok(())
    };

    match command {
        Commands::Tables => {
            for name in engine.list_table_names()? {
                println!("{}", name);
            }
        }
        Commands::Partitions { table } => {
            for key in engine.list_partitions(&table)? {
                println!("{}", key);
            }
        }
        Commands::Drop { table } => engine.delete_table(&table)?,
        Commands::Get {
            table,
            partition_key,
            row_key: Some(row_key),
        } => match engine.get_row(&table, &partition_key, &row_key)? {
            Some(row) => print_row(&row, json)?,
            None => println!("(not found)"),
        },
        Commands::Get {
            table,
            partition_key,
            row_key: None,
        } => print_rows(&engine.get_rows(&table, &partition_key)?)?,
        Commands::Scan { table } => print_rows(&engine.get_all_rows(&table)?)?,
        Commands::Insert(args) => {
            let (table, row) = args.into_row();
            engine.insert(&table, vec![row])?;
        }
        Commands::Upsert(args) => {
            let (table, row) = args.into_row();
            engine.insert_or_replace(&table, vec![row])?;
        }
        Commands::Merge(args) => {
            let (table, row) = args.into_row();
            engine.merge(&table, vec![row])?;
        }
        Commands::Delete {
            table,
            partition_key,
            row_keys,
        } => {
            let ids = row_keys
                .into_iter()
                .map(|rk| RowId::new(partition_key.as_str(), rk))
                .collect();
            engine.delete(&table, ids)?;
        }
        Commands::Sweep {
            table,
            older_than_secs,
        } => {
            let removed = engine.sweep_temp_files(&table, Duration::from_secs(older_than_secs))?;
            println!("removed {} temp file(s)", removed);
        }
    }
    Ok(())
}

fn print_row(row: &Row, json: bool) -> Result<(), TableError> {
    if json {
        let line = serde_json::to_string(row).map_err(|e| TableError::Format(e.to_string()))?;
        println!("{}", line);
        return Ok(());
    }

    let cells: Vec<String> = row
        .cells()
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    println!("{}/{}\t{}", row.partition_key(), row.row_key(), cells.join("\t"));
    Ok(())
}
