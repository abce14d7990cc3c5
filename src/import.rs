use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{Config, IfExists};
use crate::duckdb_load::attached_sink::{AttachedSink, SinkTarget};
use crate::duckdb_load::dataset::Dataset;
use crate::duckdb_load::normalize::normalize_dataset;
use crate::duckdb_load::table_sink::{Batch, TableSink};
use crate::error::ImportError;
use crate::file_load::source::acquire;

/// The part of the configuration that governs writing.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub chunksize: NonZeroUsize,
    pub if_exists: IfExists,
    pub dry_run: bool,
}

impl From<&Config> for ImportOptions {
    fn from(config: &Config) -> Self {
        Self {
            chunksize: config.chunksize,
            if_exists: config.if_exists,
            dry_run: config.dry_run,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub rows_loaded: usize,
    pub batches_written: usize,
    pub rows_written: usize,
    pub verified_count: Option<i64>,
    pub dry_run: bool,
    pub elapsed: Duration,
}

// Split `row_count` rows into consecutive batches of at most `chunksize` rows
pub fn plan_batches(row_count: usize, chunksize: NonZeroUsize) -> Vec<Batch> {
    let size = chunksize.get();
    (0..row_count.div_ceil(size))
        .map(|i| {
            let offset = i * size;
            Batch {
                offset,
                len: size.min(row_count - offset),
            }
        })
        .collect()
}

/// Check the connection, then either preview the import (dry-run) or write
/// the dataset in two phases: an empty replace write when the policy is
/// replace, followed by every batch with the batch directive.
pub fn import_dataset<S: TableSink>(
    row_count: usize,
    sink: &S,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    sink.check_connection()?;

    if options.dry_run {
        println!("DRY RUN MODE - No data will be imported");
        println!("Would import {} rows to table '{}'", row_count, sink.table_name());
        println!("Would use chunksize: {}", options.chunksize);
        println!("Would use if_exists: {}", options.if_exists);
        return Ok(ImportSummary {
            rows_loaded: row_count,
            batches_written: 0,
            rows_written: 0,
            verified_count: None,
            dry_run: true,
            elapsed: Duration::ZERO,
        });
    }

    println!("Starting import of {} rows to table '{}'", row_count, sink.table_name());

    if options.if_exists == IfExists::Replace {
        sink.write_batch(&Batch::empty(), IfExists::Replace)?;
        debug!("Created table '{}' with schema", sink.table_name());
    }

    let directive = options.if_exists.batch_directive();
    let batches = plan_batches(row_count, options.chunksize);
    let n_batches = batches.len();
    let mut rows_written = 0;

    let total_start = Instant::now();
    for (i, batch) in batches.iter().enumerate() {
        let start = Instant::now();
        sink.write_batch(batch, directive)?;
        rows_written += batch.len;
        println!(
            "Chunk {}/{} inserted ({} rows) in {:.2} seconds",
            i + 1,
            n_batches,
            batch.len,
            start.elapsed().as_secs_f64()
        );
    }
    let elapsed = total_start.elapsed();
    println!("Total import time: {:.2} seconds", elapsed.as_secs_f64());

    let verified_count = match sink.count_rows() {
        Ok(count) => {
            println!("Total rows in table '{}': {}", sink.table_name(), count);
            Some(count)
        }
        Err(e) => {
            warn!("Could not verify row count: {}", e);
            None
        }
    };

    Ok(ImportSummary {
        rows_loaded: row_count,
        batches_written: n_batches,
        rows_written,
        verified_count,
        dry_run: false,
        elapsed,
    })
}

// Run the whole pipeline against the PostgreSQL database named in the config
pub fn run(config: &Config) -> Result<ImportSummary, ImportError> {
    run_into(config, SinkTarget::postgres(config.connection_string()))
}

/// Acquire, load, normalize and import into `target`. The downloaded file is
/// removed only when the run gets through the dry-run preview or the full
/// import; any earlier failure leaves it on disk.
pub fn run_into(config: &Config, target: SinkTarget) -> Result<ImportSummary, ImportError> {
    let acquired = acquire(&config.source, &config.download_dir, config.verbose)?;

    let mut dataset = Dataset::load(acquired.path())?;
    normalize_dataset(&mut dataset)?;

    let sink = AttachedSink::new(dataset.conn(), target, &config.table);
    let summary = import_dataset(dataset.row_count(), &sink, &ImportOptions::from(config))?;

    drop(dataset);
    acquired.cleanup();

    info!(
        "Finished {} of {} rows into '{}'",
        if summary.dry_run { "dry run" } else { "import" },
        summary.rows_loaded,
        config.table
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Check,
        Write(Batch, IfExists),
        Count,
    }

    // Records every call and simulates a table held in memory
    struct RecordingSink {
        calls: RefCell<Vec<Call>>,
        rows: RefCell<Option<i64>>,
        connect_ok: bool,
        fail_write_at: Option<usize>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                rows: RefCell::new(None),
                connect_ok: true,
                fail_write_at: None,
            }
        }

        fn with_existing_rows(rows: i64) -> Self {
            let sink = Self::new();
            *sink.rows.borrow_mut() = Some(rows);
            sink
        }

        fn writes(&self) -> Vec<(Batch, IfExists)> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|call| match call {
                    Call::Write(batch, directive) => Some((*batch, *directive)),
                    _ => None,
                })
                .collect()
        }
    }

    impl TableSink for RecordingSink {
        fn table_name(&self) -> &str {
            "trips"
        }

        fn check_connection(&self) -> Result<(), ImportError> {
            self.calls.borrow_mut().push(Call::Check);
            if self.connect_ok {
                Ok(())
            } else {
                Err(ImportError::connection(duckdb::Error::QueryReturnedNoRows))
            }
        }

        fn write_batch(&self, batch: &Batch, directive: IfExists) -> Result<(), ImportError> {
            let index = self.writes().len();
            self.calls.borrow_mut().push(Call::Write(*batch, directive));
            if self.fail_write_at == Some(index) {
                return Err(ImportError::write(
                    "trips",
                    duckdb::Error::QueryReturnedNoRows,
                ));
            }

            let mut rows = self.rows.borrow_mut();
            *rows = match (directive, *rows) {
                (IfExists::Fail, Some(_)) => return Err(ImportError::TableExists("trips".into())),
                (IfExists::Replace, _) | (_, None) => Some(batch.len as i64),
                (IfExists::Append, Some(existing)) => Some(existing + batch.len as i64),
            };
            Ok(())
        }

        fn count_rows(&self) -> Result<i64, ImportError> {
            self.calls.borrow_mut().push(Call::Count);
            Ok(self.rows.borrow().unwrap_or(0))
        }
    }

    fn options(chunksize: usize, if_exists: IfExists, dry_run: bool) -> ImportOptions {
        ImportOptions {
            chunksize: NonZeroUsize::new(chunksize).unwrap(),
            if_exists,
            dry_run,
        }
    }

    #[test]
    fn test_plan_batches_covers_every_row_once() {
        for (rows, size) in [(0, 3), (1, 1), (5, 2), (6, 3), (7, 100), (100_001, 100_000)] {
            let batches = plan_batches(rows, NonZeroUsize::new(size).unwrap());
            assert_eq!(batches.len(), rows.div_ceil(size), "rows={} size={}", rows, size);
            assert_eq!(batches.iter().map(|b| b.len).sum::<usize>(), rows);

            let mut next = 0;
            for batch in &batches {
                assert_eq!(batch.offset, next);
                assert!(batch.len > 0 && batch.len <= size);
                next = batch.end();
            }
        }
    }

    #[test]
    fn test_replace_creates_schema_once_then_appends() {
        let sink = RecordingSink::with_existing_rows(42);

        let summary = import_dataset(3, &sink, &options(2, IfExists::Replace, false)).unwrap();

        assert_eq!(
            sink.writes(),
            vec![
                (Batch::empty(), IfExists::Replace),
                (Batch { offset: 0, len: 2 }, IfExists::Append),
                (Batch { offset: 2, len: 1 }, IfExists::Append),
            ]
        );
        assert_eq!(summary.batches_written, 2);
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.verified_count, Some(3));
    }

    #[test]
    fn test_append_policy_passed_through() {
        let sink = RecordingSink::with_existing_rows(10);

        let summary = import_dataset(5, &sink, &options(2, IfExists::Append, false)).unwrap();

        let writes = sink.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|(_, directive)| *directive == IfExists::Append));
        assert_eq!(summary.verified_count, Some(15));
    }

    #[test]
    fn test_fail_policy_passed_through() {
        let sink = RecordingSink::new();

        let summary = import_dataset(2, &sink, &options(5, IfExists::Fail, false)).unwrap();

        assert_eq!(sink.writes(), vec![(Batch { offset: 0, len: 2 }, IfExists::Fail)]);
        assert_eq!(summary.verified_count, Some(2));
    }

    #[test]
    fn test_fail_policy_with_existing_table() {
        let sink = RecordingSink::with_existing_rows(1);

        let err = import_dataset(2, &sink, &options(5, IfExists::Fail, false)).unwrap_err();

        assert!(matches!(err, ImportError::TableExists(_)));
        assert!(!sink.calls.borrow().contains(&Call::Count));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let sink = RecordingSink::with_existing_rows(7);

        let summary = import_dataset(3, &sink, &options(2, IfExists::Replace, true)).unwrap();

        assert_eq!(*sink.calls.borrow(), vec![Call::Check]);
        assert!(summary.dry_run);
        assert_eq!(summary.rows_written, 0);
        assert_eq!(*sink.rows.borrow(), Some(7));
    }

    #[test]
    fn test_failed_connection_stops_before_any_write() {
        let mut sink = RecordingSink::new();
        sink.connect_ok = false;

        let err = import_dataset(3, &sink, &options(2, IfExists::Replace, false)).unwrap_err();

        assert!(matches!(err, ImportError::Connection(_)));
        assert_eq!(*sink.calls.borrow(), vec![Call::Check]);
    }

    #[test]
    fn test_batch_failure_is_fatal_and_keeps_earlier_batches() {
        let mut sink = RecordingSink::new();
        // write 0 is the schema, write 2 is the second data batch
        sink.fail_write_at = Some(2);

        let err = import_dataset(5, &sink, &options(2, IfExists::Replace, false)).unwrap_err();

        assert!(matches!(err, ImportError::Write { .. }));
        assert_eq!(sink.writes().len(), 3);
        assert_eq!(*sink.rows.borrow(), Some(2));
        assert!(!sink.calls.borrow().contains(&Call::Count));
    }

    #[test]
    fn test_empty_dataset_with_replace_only_creates_schema() {
        let sink = RecordingSink::new();

        let summary = import_dataset(0, &sink, &options(2, IfExists::Replace, false)).unwrap();

        assert_eq!(sink.writes(), vec![(Batch::empty(), IfExists::Replace)]);
        assert_eq!(summary.batches_written, 0);
        assert_eq!(summary.verified_count, Some(0));
    }
}
