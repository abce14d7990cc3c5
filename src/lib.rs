pub mod config;
pub mod duckdb_load;
pub mod error;
pub mod file_load;
pub mod import;

pub use config::{Config, IfExists, Source};
pub use error::ImportError;
pub use import::{run, run_into, ImportSummary};
