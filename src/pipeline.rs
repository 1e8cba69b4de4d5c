// src/pipeline.rs

use anyhow::Result;
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{error, info, instrument};

use crate::{
    config::ScrapeConfig,
    paginate::{Pages, Termination},
    postprocess::{self, FilterOutcome},
    session::{self, PageDriver},
    table::Table,
};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct ScrapeReport {
    pub table: Table,
    pub pages: usize,
    pub termination: Termination,
    pub full_output: PathBuf,
    pub filter: FilterOutcome,
}

impl ScrapeReport {
    /// Pagination broke off before the listing said it was done.
    pub fn is_partial(&self) -> bool {
        self.termination.is_partial()
    }
}

/// Open the listing and drain the page sequence into one table.
async fn collect<D: PageDriver>(
    driver: &mut D,
    cfg: &ScrapeConfig,
) -> Result<(Table, usize, Termination)> {
    session::open(driver, cfg).await?;

    let mut pages = Pages::new(driver, cfg)?;
    let mut table = Table::default();
    while let Some(batch) = pages.next().await? {
        table.absorb(batch);
    }

    let seen = pages.pages_seen();
    let termination = pages
        .termination()
        .cloned()
        .unwrap_or(Termination::EndOfData);
    Ok((table, seen, termination))
}

/// Scrape with `driver`, release it, then write the outputs.
///
/// The driver is closed on every path, including a failed initial load.
#[instrument(level = "info", skip(driver, cfg))]
pub async fn run<D: PageDriver>(mut driver: D, cfg: &ScrapeConfig) -> Result<ScrapeReport> {
    let start = Instant::now();

    let collected = collect(&mut driver, cfg).await;
    let closed = driver.close().await;
    let (table, pages, termination) = collected?;
    if let Err(e) = closed {
        error!(error = %e, "failed to close browser cleanly");
    }

    info!(pages, rows = table.len(), elapsed = ?start.elapsed(), "scrape finished: {}", termination);

    let (full_output, filter) = postprocess::persist(&table, cfg)?;

    Ok(ScrapeReport {
        table,
        pages,
        termination,
        full_output,
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::paginate::tests::{fast_config, listing, NEXT, NEXT_DISABLED};
    use crate::session::mock::{MockDriver, MockPage};
    use std::{fs, path::Path, sync::atomic::Ordering};
    use tempfile::tempdir;
    use tracing_subscriber::{fmt, EnvFilter};

    const HEADERS: [&str; 3] = ["Bid ID", "Procuring Entity", "Deadline"];

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    fn data_rows(path: &Path) -> usize {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .unwrap();
        reader.records().count()
    }

    #[tokio::test]
    async fn two_pages_end_to_end() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let cfg = ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            ..fast_config()
        };

        let page1 = listing(
            &HEADERS,
            &[
                &["B-001", "Ethiopian Roads Authority", "2024-06-01"],
                &["B-002", "Ministry of Health", "2024-06-02"],
                &["B-003", "Addis Ababa Water", "2024-06-03"],
            ],
        );
        let page2 = listing(
            &HEADERS,
            &[
                &["B-004", "Ethio Telecom", "2024-06-04"],
                &["B-005", "ministry of defense hq", "2024-06-05"],
                &["B-006", "Ministry of Education", "2024-06-06"],
            ],
        );
        let driver = MockDriver::new(vec![
            MockPage::rows_after(3, &page1).with_next(NEXT),
            MockPage::rows_after(1, &page2).with_next(NEXT_DISABLED),
        ]);
        let closed = driver.closed_flag();

        let report = run(driver, &cfg).await?;

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(report.pages, 2);
        assert_eq!(report.termination, Termination::EndOfData);
        assert!(!report.is_partial());
        assert_eq!(report.table.headers, HEADERS);
        assert_eq!(report.table.len(), 6);

        assert_eq!(data_rows(&report.full_output), 6);
        let filtered_path = dir.path().join("ministry_of_defense_bids.csv");
        assert_eq!(data_rows(&filtered_path), 1);
        assert!(fs::read_to_string(&filtered_path)?.contains("B-005,ministry of defense hq"));
        match report.filter {
            FilterOutcome::Written { path, .. } => assert_eq!(path, filtered_path),
            other => panic!("expected filtered output, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn initial_timeout_propagates_and_still_closes() {
        init_logging();
        let dir = tempdir().unwrap();
        let cfg = ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            initial_wait: std::time::Duration::from_millis(20),
            ..fast_config()
        };
        let driver = MockDriver::new(vec![MockPage::never_renders()]);
        let closed = driver.closed_flag();

        let err = run(driver, &cfg).await.unwrap_err();

        assert!(err.downcast_ref::<ScrapeError>().is_some_and(ScrapeError::is_timeout));
        assert!(closed.load(Ordering::SeqCst));
        assert!(!cfg.full_output_path().exists());
    }

    #[tokio::test]
    async fn pagination_fault_keeps_rows_and_reports_partial() {
        init_logging();
        let dir = tempdir().unwrap();
        let cfg = ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            ..fast_config()
        };
        let driver = MockDriver::new(vec![
            MockPage::ready(&listing(&HEADERS, &[&["B-1", "Ministry of Defense", "x"]]))
                .with_next(NEXT)
                .with_failing_click(),
        ]);

        let report = run(driver, &cfg).await.unwrap();

        assert!(report.is_partial());
        assert_eq!(data_rows(&report.full_output), 1);
        assert!(cfg.filtered_output_path().exists());
    }

    #[tokio::test]
    async fn read_failure_on_later_page_still_writes_earlier_rows() {
        init_logging();
        let dir = tempdir().unwrap();
        let cfg = ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            ..fast_config()
        };
        let driver = MockDriver::new(vec![
            MockPage::ready(&listing(&HEADERS, &[&["B-1", "Ministry of Defense", "x"]]))
                .with_next(NEXT),
            MockPage::ready(&listing(&HEADERS, &[&["B-2", "ERA", "y"]]))
                .with_failing_reads_after(1)
                .with_next(NEXT),
        ]);
        let closed = driver.closed_flag();

        let report = run(driver, &cfg).await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert!(report.is_partial());
        assert_eq!(report.pages, 1);
        assert_eq!(data_rows(&report.full_output), 1);
        assert_eq!(data_rows(&cfg.filtered_output_path()), 1);
    }

    #[tokio::test]
    async fn missing_filter_column_writes_full_table_only() {
        let dir = tempdir().unwrap();
        let cfg = ScrapeConfig {
            output_dir: dir.path().to_path_buf(),
            ..fast_config()
        };
        let driver = MockDriver::new(vec![MockPage::ready(&listing(
            &["Bid ID", "Entity"],
            &[&["B-1", "Ministry of Defense"]],
        ))
        .with_next(NEXT_DISABLED)]);

        let report = run(driver, &cfg).await.unwrap();

        assert_eq!(report.filter, FilterOutcome::ColumnMissing);
        assert!(report.full_output.exists());
        assert!(!cfg.filtered_output_path().exists());
    }
}
