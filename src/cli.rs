use clap::Parser;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::Level;

/// Available dot-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    DbInfo,
    Tables,
    Schema,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ".dbinfo" => Ok(Command::DbInfo),
            ".tables" => Ok(Command::Tables),
            ".schema" => Ok(Command::Schema),
            _ => Err(format!("unknown command: {}", s)),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::DbInfo => write!(f, ".dbinfo"),
            Command::Tables => write!(f, ".tables"),
            Command::Schema => write!(f, ".schema"),
        }
    }
}

/// Inspect the schema of a SQLite database file
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Path to the database file
    pub file: PathBuf,

    /// One of .dbinfo, .tables or .schema
    pub command: Command,

    /// Skip schema rows that fail to decode instead of stopping
    #[arg(long)]
    pub skip_malformed: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Log level selected by the verbosity flags
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
