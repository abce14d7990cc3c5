use std::cell::Cell;
use std::io;
use std::path::{Path, PathBuf};

use duckdb::Connection;
use log::debug;

use crate::config::IfExists;
use crate::duckdb_load::table_sink::{Batch, TableSink};
use crate::duckdb_load::{quote_ident, quote_literal, DATASET_TABLE};
use crate::error::ImportError;

// Catalog alias the target database is attached under
const TARGET_ALIAS: &str = "target_db";

/// Database the dataset is copied into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// PostgreSQL reached through DuckDB's postgres extension
    Postgres { connection_string: String },
    /// A DuckDB database file. The connectivity check opens an existing file
    /// read-only and leaves a missing one uncreated.
    DuckDb { path: PathBuf },
}

impl SinkTarget {
    pub fn postgres(connection_string: impl Into<String>) -> Self {
        SinkTarget::Postgres {
            connection_string: connection_string.into(),
        }
    }

    pub fn duckdb(path: impl Into<PathBuf>) -> Self {
        SinkTarget::DuckDb { path: path.into() }
    }

    fn default_schema(&self) -> &'static str {
        match self {
            SinkTarget::Postgres { .. } => "public",
            SinkTarget::DuckDb { .. } => "main",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Detached,
    ReadOnly,
    ReadWrite,
}

// Writes dataset slices into a database attached to the dataset's own connection.
// Attaching is deferred to the first call that needs the target, and a DuckDB
// file is only opened for writing once something is written.
pub struct AttachedSink<'a> {
    conn: &'a Connection,
    target: SinkTarget,
    table: String,
    attachment: Cell<Attachment>,
}

impl<'a> AttachedSink<'a> {
    pub fn new(conn: &'a Connection, target: SinkTarget, table: &str) -> Self {
        Self {
            conn,
            target,
            table: table.to_string(),
            attachment: Cell::new(Attachment::Detached),
        }
    }

    fn attach(&self, mode: Attachment) -> Result<(), duckdb::Error> {
        let current = self.attachment.get();
        if current == mode || current == Attachment::ReadWrite {
            return Ok(());
        }
        if current == Attachment::ReadOnly {
            self.conn.execute(&format!("DETACH {};", TARGET_ALIAS), [])?;
        }

        let attached = match &self.target {
            SinkTarget::Postgres { connection_string } => {
                self.conn.execute_batch("INSTALL postgres; LOAD postgres;")?;
                self.conn.execute(
                    &format!(
                        "ATTACH {} AS {} (TYPE POSTGRES)",
                        quote_literal(connection_string),
                        TARGET_ALIAS
                    ),
                    [],
                )?;
                Attachment::ReadWrite
            }
            SinkTarget::DuckDb { path } => {
                let options = if mode == Attachment::ReadOnly {
                    " (READ_ONLY)"
                } else {
                    ""
                };
                self.conn.execute(
                    &format!(
                        "ATTACH {} AS {}{}",
                        quote_literal(&path.to_string_lossy()),
                        TARGET_ALIAS,
                        options
                    ),
                    [],
                )?;
                mode
            }
        };

        debug!("Attached target database as {} ({:?})", TARGET_ALIAS, attached);
        self.attachment.set(attached);
        Ok(())
    }

    // A DuckDB target that does not exist yet is created by the first write,
    // so checking it only needs the directory it will live in
    fn check_missing_duckdb_file(&self) -> Option<Result<(), ImportError>> {
        let SinkTarget::DuckDb { path } = &self.target else {
            return None;
        };
        if path.exists() {
            return None;
        }

        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if dir.is_dir() {
            Some(Ok(()))
        } else {
            Some(Err(ImportError::connection(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory {} does not exist", dir.display()),
            ))))
        }
    }

    // Get the schema qualified table
    fn qualified_table(&self) -> String {
        format!(
            "{}.{}.{}",
            TARGET_ALIAS,
            self.target.default_schema(),
            quote_ident(&self.table)
        )
    }

    fn table_exists(&self) -> Result<bool, duckdb::Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM duckdb_tables()
             WHERE database_name = ?
             AND schema_name = ?
             AND table_name = ?",
            [TARGET_ALIAS, self.target.default_schema(), self.table.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn slice_query(batch: &Batch) -> String {
        format!(
            "SELECT * FROM {} LIMIT {} OFFSET {}",
            DATASET_TABLE, batch.len, batch.offset
        )
    }

    fn create_from(&self, batch: &Batch) -> Result<(), duckdb::Error> {
        self.conn.execute(
            &format!(
                "CREATE TABLE {} AS {};",
                self.qualified_table(),
                Self::slice_query(batch)
            ),
            [],
        )?;
        Ok(())
    }

    fn insert_from(&self, batch: &Batch) -> Result<(), duckdb::Error> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} BY NAME {};",
                self.qualified_table(),
                Self::slice_query(batch)
            ),
            [],
        )?;
        Ok(())
    }

    fn drop_table(&self) -> Result<(), duckdb::Error> {
        self.conn.execute(
            &format!("DROP TABLE IF EXISTS {};", self.qualified_table()),
            [],
        )?;
        Ok(())
    }
}

impl TableSink for AttachedSink<'_> {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn check_connection(&self) -> Result<(), ImportError> {
        if let Some(checked) = self.check_missing_duckdb_file() {
            return checked;
        }

        self.attach(Attachment::ReadOnly)
            .and_then(|_| {
                self.conn.query_row(
                    "SELECT COUNT(*) FROM information_schema.schemata WHERE catalog_name = ?",
                    [TARGET_ALIAS],
                    |row| row.get::<_, i64>(0),
                )
            })
            .map(|_| ())
            .map_err(ImportError::connection)
    }

    fn write_batch(&self, batch: &Batch, directive: IfExists) -> Result<(), ImportError> {
        let write_err = |source| ImportError::write(&self.table, source);

        self.attach(Attachment::ReadWrite).map_err(write_err)?;
        let exists = self.table_exists().map_err(write_err)?;

        match (directive, exists) {
            (IfExists::Fail, true) => return Err(ImportError::TableExists(self.table.clone())),
            (IfExists::Replace, true) => {
                self.drop_table().map_err(write_err)?;
                self.create_from(batch).map_err(write_err)?;
            }
            (IfExists::Append, true) => self.insert_from(batch).map_err(write_err)?,
            (_, false) => self.create_from(batch).map_err(write_err)?,
        }
        Ok(())
    }

    fn count_rows(&self) -> Result<i64, ImportError> {
        let write_err = |source| ImportError::write(&self.table, source);

        self.attach(Attachment::ReadWrite).map_err(write_err)?;
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {};", self.qualified_table()),
                [],
                |row| row.get(0),
            )
            .map_err(write_err)
    }
}
