//! reldb CLI
//!
//! Executes one statement (or a file of statements) against a data
//! directory and renders the result. Not an interactive shell.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use reldb::output::{self, Format};
use reldb::{Config, Engine, Outcome};

#[derive(Parser, Debug)]
#[command(name = "reldb")]
#[command(about = "Small embedded relational database engine", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "reldb.toml")]
    config: PathBuf,

    /// Directory holding the table blobs (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output format: text or json (overrides config)
    #[arg(long)]
    format: Option<String>,

    /// Execute every statement in this file, one per line
    #[arg(long)]
    file: Option<PathBuf>,

    /// List table names and exit
    #[arg(long)]
    list_tables: bool,

    /// The statement to execute
    statement: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = if args.config.exists() {
        Config::from_file(&args.config).context("Failed to load configuration")?
    } else {
        Config::default()
    };

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.data_dir.clone());
    let format: Format = args
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown output format, expected 'text' or 'json'"))?;

    let engine = Engine::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;

    if args.list_tables {
        let tables = engine.list_tables()?;
        println!("{}", output::render(&Outcome::Tables(tables), format));
        return Ok(());
    }

    if let Some(path) = &args.file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for line in contents.lines() {
            let statement = line.trim();
            if statement.is_empty() || statement.starts_with("--") {
                continue;
            }
            let outcome = engine
                .execute_sql(statement)
                .with_context(|| format!("Failed executing: {statement}"))?;
            println!("{}", output::render(&outcome, format));
        }
        return Ok(());
    }

    let Some(statement) = &args.statement else {
        bail!("nothing to do: pass a statement, --file, or --list-tables");
    };
    let outcome = engine.execute_sql(statement)?;
    println!("{}", output::render(&outcome, format));
    Ok(())
}
