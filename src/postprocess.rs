// src/postprocess.rs

use anyhow::{Context, Result};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

use crate::{config::ScrapeConfig, error::ScrapeError, table::Table};

/// What the filtering step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The table had no column with the filter name; nothing was written.
    ColumnMissing,
    /// The column exists but no row matched; nothing was written.
    NoMatches,
    Written { path: PathBuf, table: Table },
}

/// Write `table` as CSV: header row first, no index column, UTF-8, overwrite.
///
/// Rows whose width differs from the header are written as they are.
pub fn write_csv(path: &Path, table: &Table) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Drop a filtered file left by an earlier run so it cannot outlive its matches.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed filtered output from a previous run");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

/// Rows whose `column` value, once trimmed, contains `target` ignoring case.
///
/// The returned table keeps every header and carries the trimmed value in
/// `column`. `None` when the column does not exist.
pub fn filter_rows(table: &Table, column: &str, target: &str) -> Option<Table> {
    let idx = table.column_index(column)?;
    let needle = target.to_lowercase();

    let rows = table
        .rows
        .iter()
        .filter_map(|row| {
            let value = row.get(idx)?.trim();
            if !value.to_lowercase().contains(&needle) {
                return None;
            }
            let mut row = row.clone();
            row[idx] = value.to_string();
            Some(row)
        })
        .collect();

    Some(Table::new(table.headers.clone(), rows))
}

/// Persist the full table, then the subset matching the configured target.
#[instrument(level = "info", skip(table, cfg), fields(rows = table.len()))]
pub fn persist(table: &Table, cfg: &ScrapeConfig) -> Result<(PathBuf, FilterOutcome)> {
    let full_path = cfg.full_output_path();
    write_csv(&full_path, table)
        .with_context(|| format!("writing {}", full_path.display()))?;
    info!(path = %full_path.display(), rows = table.len(), "saved scraped table");

    let Some(idx) = table.column_index(&cfg.filter_column) else {
        warn!(column = %cfg.filter_column, "column not found in the table; skipping filter");
        remove_stale(&cfg.filtered_output_path())?;
        return Ok((full_path, FilterOutcome::ColumnMissing));
    };

    let distinct: BTreeSet<&str> = table.column(idx).collect();
    debug!(column = %cfg.filter_column, values = ?distinct, "distinct values");

    let filtered = filter_rows(table, &cfg.filter_column, &cfg.target).unwrap_or_default();
    if filtered.is_empty() {
        warn!(term = %cfg.target, "no bids found for target");
        remove_stale(&cfg.filtered_output_path())?;
        return Ok((full_path, FilterOutcome::NoMatches));
    }

    let path = cfg.filtered_output_path();
    write_csv(&path, &filtered).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), rows = filtered.len(), term = %cfg.target, "saved filtered bids");

    Ok((full_path, FilterOutcome::Written { path, table: filtered }))
}
