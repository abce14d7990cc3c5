use crate::config::IfExists;
use crate::error::ImportError;

/// A contiguous row range of the dataset written in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub offset: usize,
    pub len: usize,
}

impl Batch {
    // Zero-row slice used to create the target schema
    pub fn empty() -> Self {
        Self { offset: 0, len: 0 }
    }

    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Destination for dataset batches.
/// Every write carries its own directive; the sink does not remember the
/// policy of earlier writes.
pub trait TableSink {
    /// Name of the table rows are written to
    fn table_name(&self) -> &str;

    /// Run a trivial query against the target. Nothing is written.
    fn check_connection(&self) -> Result<(), ImportError>;

    /// Write the rows of `batch` using `directive` for an existing table.
    fn write_batch(&self, batch: &Batch, directive: IfExists) -> Result<(), ImportError>;

    /// Number of rows currently in the target table
    fn count_rows(&self) -> Result<i64, ImportError>;
}
