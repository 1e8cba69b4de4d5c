// src/paginate.rs

use std::fmt;
use tracing::{debug, info, warn};

use crate::{
    config::ScrapeConfig,
    error::ScrapeError,
    extract::TableExtractor,
    session::{wait_for_new_rows, PageDriver},
};

/// Rows pulled from one rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBatch {
    /// 1-based.
    pub page_number: usize,
    /// `Some` only on the page where headers were first captured.
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Why the page sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Next control reported itself disabled: the listing is exhausted.
    EndOfData,
    /// The configured page cap was reached.
    PageLimit,
    /// The page had no next control at all.
    NoNextControl,
    /// The bid table marker was missing on a page.
    TableNotFound { page: usize },
    /// Locating, clicking, or waiting after the next control failed.
    PaginationFault { page: usize, reason: String },
}

impl Termination {
    /// True when more pages may exist than were collected.
    pub fn is_partial(&self) -> bool {
        matches!(self, Termination::PaginationFault { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EndOfData => write!(f, "last page reached"),
            Termination::PageLimit => write!(f, "page limit reached"),
            Termination::NoNextControl => write!(f, "no next-page control"),
            Termination::TableNotFound { page } => write!(f, "table not found on page {page}"),
            Termination::PaginationFault { page, reason } => {
                write!(f, "pagination failed after page {page}: {reason}")
            }
        }
    }
}

enum State {
    /// Nothing extracted yet; the current page is the first one.
    Fresh,
    /// A batch was handed out; the next pull must advance first.
    Advance,
    Done(Termination),
}

/// Lazy, finite, non-restartable sequence of page batches.
///
/// Each `next` pull either extracts the page currently shown or, after the first
/// pull, clicks through to the next page and extracts that. Once `next` returns
/// `None`, `termination` says why and every later pull returns `None` again.
pub struct Pages<'d, D: PageDriver> {
    driver: &'d mut D,
    cfg: &'d ScrapeConfig,
    extractor: TableExtractor,
    state: State,
    page_number: usize,
    headers_captured: bool,
}

impl<'d, D: PageDriver> Pages<'d, D> {
    /// The driver must already show the first rendered page.
    pub fn new(driver: &'d mut D, cfg: &'d ScrapeConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            driver,
            cfg,
            extractor: TableExtractor::new(&cfg.table_selector)?,
            state: State::Fresh,
            page_number: 0,
            headers_captured: false,
        })
    }

    pub fn termination(&self) -> Option<&Termination> {
        match &self.state {
            State::Done(t) => Some(t),
            _ => None,
        }
    }

    pub fn pages_seen(&self) -> usize {
        self.page_number
    }

    /// Pull the next batch. Only a failure to read the first page is returned as
    /// an error; later read failures and every pagination problem end the
    /// sequence instead, so batches already handed out stay valid.
    pub async fn next(&mut self) -> anyhow::Result<Option<PageBatch>> {
        match self.state {
            State::Done(_) => return Ok(None),
            State::Advance => {
                if let Some(t) = self.advance().await {
                    self.finish(t);
                    return Ok(None);
                }
            }
            State::Fresh => {}
        }

        let html = match self.driver.content().await {
            Ok(html) => html,
            // Earlier pages are already handed out; keep them and stop here.
            Err(e) if self.page_number > 0 => {
                let t = self.fault(e);
                self.finish(t);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.page_number += 1;
        info!("scraping page {}", self.page_number);
        let extracted = match self
            .extractor
            .extract(&html, !self.headers_captured)
        {
            Ok(e) => e,
            Err(ScrapeError::TableNotFound { selector }) => {
                warn!(page = self.page_number, %selector, "table not found, check the page structure");
                self.finish(Termination::TableNotFound {
                    page: self.page_number,
                });
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(h) = &extracted.headers {
            info!(headers = ?h, "extracted headers");
            self.headers_captured = true;
        }
        debug!(page = self.page_number, rows = extracted.rows.len(), "page extracted");

        self.state = State::Advance;
        Ok(Some(PageBatch {
            page_number: self.page_number,
            headers: extracted.headers,
            rows: extracted.rows,
        }))
    }

    /// Move to the next page. `Some` means the sequence is over.
    async fn advance(&mut self) -> Option<Termination> {
        if let Some(max) = self.cfg.max_pages {
            if self.page_number >= max {
                return Some(Termination::PageLimit);
            }
        }

        let control = match self.driver.next_control().await {
            Ok(Some(c)) => c,
            Ok(None) => return Some(Termination::NoNextControl),
            Err(e) => return Some(self.fault(e)),
        };
        if control.is_disabled(&self.cfg.disabled_marker) {
            return Some(Termination::EndOfData);
        }

        // Snapshot the rows, not the whole page: the pager updates before the rows do.
        let before = match self.driver.content().await {
            Ok(html) => self.extractor.extract(&html, false).map(|e| e.rows).ok(),
            Err(e) => return Some(self.fault(e)),
        };
        if let Err(e) = self.driver.click_next().await {
            return Some(self.fault(e));
        }
        let extractor = &self.extractor;
        if let Err(e) = wait_for_new_rows(
            &*self.driver,
            self.cfg.page_wait,
            self.cfg.poll_interval,
            |html| match extractor.extract(html, false) {
                Ok(now) => !now.rows.is_empty() && before.as_ref() != Some(&now.rows),
                Err(_) => false,
            },
        )
        .await
        {
            return Some(self.fault(e));
        }
        None
    }

    fn fault(&self, err: anyhow::Error) -> Termination {
        Termination::PaginationFault {
            page: self.page_number,
            reason: format!("{err:#}"),
        }
    }

    fn finish(&mut self, t: Termination) {
        match &t {
            Termination::PaginationFault { .. } => warn!("pagination ended early: {}", t),
            Termination::NoNextControl => warn!("{}", t),
            _ => info!("pagination finished: {}", t),
        }
        self.state = State::Done(t);
    }
}
