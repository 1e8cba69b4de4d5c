// src/config.rs

use crate::error::ScrapeError;
use std::{env, path::PathBuf, time::Duration};
use url::Url;

/// The public bid listing we scrape.
pub const DEFAULT_URL: &str = "https://production.egp.gov.et/egp/bids/all";

/// The bid table carries this class once the listing has rendered.
pub const TABLE_SELECTOR: &str = "table.ant-table-fixed";
/// Generic row element used to decide whether a page has rendered.
pub const ROW_SELECTOR: &str = "tr";
pub const NEXT_SELECTOR: &str = ".ant-pagination-next";
/// Substring of the next control's class attribute on the last page.
pub const DISABLED_MARKER: &str = "disabled";

pub const FILTER_COLUMN: &str = "Procuring Entity";
pub const DEFAULT_TARGET: &str = "Ministry of Defense";

pub const FULL_OUTPUT: &str = "scraped_data.csv";
pub const FILTERED_OUTPUT: &str = "ministry_of_defense_bids.csv";

const INITIAL_WAIT: Duration = Duration::from_secs(30);
const PAGE_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Everything one run needs to know. `Default` reproduces the fixed behaviour;
/// `from_env` layers `BIDSCRAPER_*` overrides on top.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub url: Url,
    pub table_selector: String,
    pub row_selector: String,
    pub next_selector: String,
    pub disabled_marker: String,

    /// Bound on the wait for the first rows after navigation.
    pub initial_wait: Duration,
    /// Bound on the wait for new rows after clicking the next control.
    pub page_wait: Duration,
    pub poll_interval: Duration,
    /// Stop after this many pages, if set.
    pub max_pages: Option<usize>,

    pub output_dir: PathBuf,
    pub full_output: String,
    pub filtered_output: String,
    pub filter_column: String,
    pub target: String,

    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("default URL should parse"),
            table_selector: TABLE_SELECTOR.to_string(),
            row_selector: ROW_SELECTOR.to_string(),
            next_selector: NEXT_SELECTOR.to_string(),
            disabled_marker: DISABLED_MARKER.to_string(),
            initial_wait: INITIAL_WAIT,
            page_wait: PAGE_WAIT,
            poll_interval: POLL_INTERVAL,
            max_pages: None,
            output_dir: PathBuf::from("."),
            full_output: FULL_OUTPUT.to_string(),
            filtered_output: FILTERED_OUTPUT.to_string(),
            filter_column: FILTER_COLUMN.to_string(),
            target: DEFAULT_TARGET.to_string(),
            headless: true,
            chromium_path: None,
        }
    }
}

impl ScrapeConfig {
    /// Defaults plus any `BIDSCRAPER_*` variables present in the process environment.
    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("BIDSCRAPER_URL") {
            cfg.url = Url::parse(raw.trim())
                .map_err(|e| ScrapeError::Config(format!("BIDSCRAPER_URL `{raw}`: {e}")))?;
        }
        if let Some(dir) = lookup("BIDSCRAPER_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(dir);
        }
        if let Some(target) = lookup("BIDSCRAPER_TARGET") {
            if target.trim().is_empty() {
                return Err(ScrapeError::Config("BIDSCRAPER_TARGET is empty".into()));
            }
            cfg.target = target;
        }
        if let Some(raw) = lookup("BIDSCRAPER_MAX_PAGES") {
            let n: usize = raw.trim().parse().map_err(|e| {
                ScrapeError::Config(format!("BIDSCRAPER_MAX_PAGES `{raw}`: {e}"))
            })?;
            if n == 0 {
                return Err(ScrapeError::Config("BIDSCRAPER_MAX_PAGES must be > 0".into()));
            }
            cfg.max_pages = Some(n);
        }
        if let Some(raw) = lookup("BIDSCRAPER_HEADFUL") {
            cfg.headless = !parse_flag(&raw)
                .ok_or_else(|| ScrapeError::Config(format!("BIDSCRAPER_HEADFUL `{raw}`")))?;
        }
        if let Some(path) = lookup("BIDSCRAPER_CHROMIUM_PATH") {
            cfg.chromium_path = Some(PathBuf::from(path));
        }

        Ok(cfg)
    }

    pub fn full_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.full_output)
    }

    pub fn filtered_output_path(&self) -> PathBuf {
        self.output_dir.join(&self.filtered_output)
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
