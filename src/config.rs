use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const DEFAULT_URL: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/yellow_tripdata_2025-01.parquet";
pub const DEFAULT_TABLE: &str = "yellow_tripdata_2025_01";
pub const DEFAULT_DOWNLOAD_DIR: &str = "temp_downloads";

/// How a write behaves when the target table already exists.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    Fail,
    Replace,
    Append,
}

impl IfExists {
    // Directive for the data batches: replace only ever applies to the empty schema write
    pub fn batch_directive(self) -> IfExists {
        match self {
            IfExists::Replace => IfExists::Append,
            other => other,
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfExists::Fail => write!(f, "fail"),
            IfExists::Replace => write!(f, "replace"),
            IfExists::Append => write!(f, "append"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Import NY taxi trip data from a Parquet file to PostgreSQL",
    long_about = None
)]
pub struct Args {
    /// PostgreSQL username
    #[arg(long, env = "POSTGRES_USER", default_value = "root")]
    pub user: String,

    /// PostgreSQL password
    #[arg(
        short = 'p',
        long,
        env = "POSTGRES_PASSWORD",
        default_value = "root",
        hide_env_values = true
    )]
    pub password: String,

    /// PostgreSQL host
    #[arg(short = 'H', long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub host: String,

    /// PostgreSQL port
    #[arg(short = 'P', long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub port: u16,

    /// PostgreSQL database name
    #[arg(short = 'd', long, env = "POSTGRES_DB", default_value = "ny_taxi")]
    pub database: String,

    /// Target table name
    #[arg(short = 't', long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// URL of the Parquet file to download and import
    #[arg(short = 'u', long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Path to local Parquet file to import (alternative to --url)
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Number of rows to process in each chunk
    #[arg(short = 'c', long, default_value = "100000")]
    pub chunksize: NonZeroUsize,

    /// How to behave if the table already exists
    #[arg(long, value_enum, default_value_t = IfExists::Replace)]
    pub if_exists: IfExists,

    /// Show what would be done without actually importing data
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Where the rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionParams {
    // libpq key/value connection string, values quoted so spaces and quotes survive
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            libpq_quote(&self.host),
            self.port,
            libpq_quote(&self.database),
            libpq_quote(&self.user),
            libpq_quote(&self.password),
        )
    }
}

fn libpq_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Resolved, immutable settings for one import run.
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionParams,
    pub table: String,
    pub source: Source,
    pub download_dir: PathBuf,
    pub chunksize: NonZeroUsize,
    pub if_exists: IfExists,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Config {
    pub fn connection_string(&self) -> String {
        self.connection.connection_string()
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        // A local file wins over the (always defaulted) URL
        let source = match args.file {
            Some(path) => Source::File(path),
            None => Source::Url(args.url),
        };

        Config {
            connection: ConnectionParams {
                user: args.user,
                password: args.password,
                host: args.host,
                port: args.port,
                database: args.database,
            },
            table: args.table,
            source,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            chunksize: args.chunksize,
            if_exists: args.if_exists,
            dry_run: args.dry_run,
            verbose: args.verbose,
        }
    }
}
