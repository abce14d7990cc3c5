use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// Every failure the import pipeline can surface to the user
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Parquet file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to download file from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Unsupported file format for '{}': {reason}", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Error reading file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("Column names collide after normalization: '{0}'")]
    DuplicateColumn(String),

    #[error("Error normalizing columns: {0}")]
    Normalize(#[source] duckdb::Error),

    #[error("Failed to connect to database ({0}). Please check your connection parameters.")]
    Connection(#[source] BoxError),

    #[error("Error writing to table '{table}': {source}")]
    Write {
        table: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub(crate) fn download(url: &str, source: impl Into<BoxError>) -> Self {
        ImportError::Download {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn connection(source: impl Into<BoxError>) -> Self {
        ImportError::Connection(source.into())
    }

    pub(crate) fn write(table: &str, source: duckdb::Error) -> Self {
        ImportError::Write {
            table: table.to_string(),
            source,
        }
    }
}
