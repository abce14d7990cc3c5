use std::collections::HashSet;

use log::debug;

use crate::duckdb_load::dataset::Dataset;
use crate::duckdb_load::quote_ident;
use crate::error::ImportError;

pub const DATETIME_COLUMNS: [&str; 2] = ["tpep_pickup_datetime", "tpep_dropoff_datetime"];

// Lowercase every name and replace spaces with underscores
pub fn normalize_column_names(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|name| name.to_lowercase().replace(' ', "_"))
        .collect()
}

/// Rename the dataset's columns to their normalized form and coerce the
/// pickup/dropoff columns to TIMESTAMP where they exist. Other columns keep
/// their values and types.
pub fn normalize_dataset(dataset: &mut Dataset) -> Result<(), ImportError> {
    let original = dataset.columns().to_vec();
    let normalized = normalize_column_names(&original);

    let mut seen = HashSet::new();
    if let Some(duplicate) = normalized.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(ImportError::DuplicateColumn(duplicate.clone()));
    }

    let mut changed = false;
    let select_list: Vec<String> = original
        .iter()
        .zip(&normalized)
        .map(|(from, to)| {
            if DATETIME_COLUMNS.contains(&to.as_str()) {
                changed = true;
                debug!("Converted {} to datetime", to);
                format!(
                    "CAST({} AS TIMESTAMP) AS {}",
                    quote_ident(from),
                    quote_ident(to)
                )
            } else {
                changed |= from != to;
                format!("{} AS {}", quote_ident(from), quote_ident(to))
            }
        })
        .collect();

    if changed {
        dataset
            .replace_with_projection(&select_list)
            .and_then(|_| dataset.refresh())
            .map_err(ImportError::Normalize)?;
    }
    debug!("Column names: {:?}", dataset.columns());
    Ok(())
}
