use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use parquet_pg_import::config::{Args, Config};

fn main() -> ExitCode {
    // POSTGRES_* may live in a local .env file; a missing file is fine
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let config = Config::from(args);
    match parquet_pg_import::run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
