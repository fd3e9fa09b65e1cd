use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

pub mod cli;
pub mod sqlite;

use sqlite::{SQLiteDatabase, ScanPolicy, SchemaCatalog};

fn main() -> Result<()> {
    let args = cli::Args::parse();

    fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(args.log_level()).into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    run(args, &mut stdout.lock())
}

pub fn run(args: cli::Args, out: &mut impl Write) -> Result<()> {
    info!("Running {} on {}", args.command, args.file.display());

    let mut db = SQLiteDatabase::open(&args.file)
        .with_context(|| format!("failed to open database {}", args.file.display()))?;
    let policy = if args.skip_malformed {
        ScanPolicy::SkipMalformed
    } else {
        ScanPolicy::Strict
    };
    let catalog = SchemaCatalog::new(policy);

    match args.command {
        cli::Command::DbInfo => {
            let info = db.get_info().context("failed to read database info")?;
            writeln!(out, "database page size: {}", info.page_size())?;
            writeln!(out, "number of tables: {}", info.num_tables())?;
        }
        cli::Command::Tables => {
            let tables = db.list_tables(catalog).context("failed to list tables")?;
            for table in tables {
                writeln!(out, "{}", table.name)?;
            }
        }
        cli::Command::Schema => {
            let tables = db.list_tables(catalog).context("failed to read schema")?;
            for sql in tables.into_iter().filter_map(|table| table.sql) {
                writeln!(out, "{};", sql)?;
            }
        }
    }
    Ok(())
}
