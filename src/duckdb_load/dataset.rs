use std::path::Path;

use duckdb::Connection;
use log::debug;

use crate::duckdb_load::{quote_literal, DATASET_TABLE};
use crate::error::ImportError;
use crate::file_load::{determine_file_type, FileType};

// The whole source file, held in an in-memory DuckDB table
pub struct Dataset {
    file_type: FileType,
    conn: Connection,
    columns: Vec<String>,
    row_count: usize,
}

impl Dataset {
    // Detect the format and read the file into the dataset table in one statement
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let file_type = determine_file_type(path)?;
        debug!("Reading {} file: {}", file_type, path.display());

        let read_err = |source: duckdb::Error| ImportError::Read {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open_in_memory().map_err(read_err)?;
        // Batches are LIMIT/OFFSET slices, so scans must keep row order
        conn.execute_batch("SET preserve_insertion_order = true;")
            .map_err(read_err)?;

        let path_literal = quote_literal(&path.to_string_lossy());
        let reader = match file_type {
            FileType::Parquet => format!("read_parquet({})", path_literal),
            FileType::Csv => format!("read_csv({})", path_literal),
        };
        conn.execute(
            &format!(
                "CREATE TABLE {} AS SELECT * FROM {};",
                DATASET_TABLE, reader
            ),
            [],
        )
        .map_err(read_err)?;

        let dataset = Self::from_connection(conn, file_type).map_err(read_err)?;
        dataset.log_schema().map_err(read_err)?;

        debug!("Loaded {} rows from {} file", dataset.row_count, file_type);
        Ok(dataset)
    }

    // Wrap a connection that already holds the dataset table
    fn from_connection(conn: Connection, file_type: FileType) -> Result<Self, duckdb::Error> {
        let mut dataset = Self {
            file_type,
            conn,
            columns: Vec::new(),
            row_count: 0,
        };
        dataset.refresh()?;
        Ok(dataset)
    }

    // Build a dataset from arbitrary SQL that creates the dataset table
    #[cfg(test)]
    pub(crate) fn from_sql(sql: &str) -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        Self::from_connection(conn, FileType::Csv).unwrap()
    }

    // Re-read column names and row count from the table
    pub(crate) fn refresh(&mut self) -> Result<(), duckdb::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name
             FROM information_schema.columns
             WHERE table_catalog = current_database()
             AND table_name = ?
             ORDER BY ordinal_position",
        )?;
        self.columns = stmt
            .query_map([DATASET_TABLE], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", DATASET_TABLE),
            [],
            |row| row.get(0),
        )?;
        self.row_count = count as usize;
        Ok(())
    }

    // Query the data and log the schema
    fn log_schema(&self) -> Result<(), duckdb::Error> {
        let query = format!("SELECT * FROM {} LIMIT 10", DATASET_TABLE);
        let mut stmt = self.conn.prepare(&query)?;
        let arrow_result = stmt.query_arrow([])?;
        debug!("The data schema is: {:?}", arrow_result.get_schema());
        Ok(())
    }

    // DuckDB type name of a column, e.g. TIMESTAMP or VARCHAR
    pub fn column_type(&self, column: &str) -> Result<String, duckdb::Error> {
        self.conn.query_row(
            "SELECT data_type
             FROM information_schema.columns
             WHERE table_catalog = current_database()
             AND table_name = ?
             AND column_name = ?",
            [DATASET_TABLE, column],
            |row| row.get(0),
        )
    }

    // Rebuild the dataset table from a projection of itself, keeping row order
    pub(crate) fn replace_with_projection(
        &self,
        select_list: &[String],
    ) -> Result<(), duckdb::Error> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE {table}_projected AS SELECT {select} FROM {table};
             DROP TABLE {table};
             ALTER TABLE {table}_projected RENAME TO {table};",
            table = DATASET_TABLE,
            select = select_list.join(", "),
        ))
    }

    // Getter methods for attributes that need to be accessed by the sink
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }
}
