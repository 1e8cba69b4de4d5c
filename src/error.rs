// src/error.rs

use std::time::Duration;
use thiserror::Error;

/// Faults the scraper distinguishes between. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A bounded wait for rendered rows ran out.
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    /// The bid table marker was not in the rendered markup.
    #[error("table `{selector}` not found in page markup")]
    TableNotFound { selector: String },

    #[error("browser: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        ScrapeError::Browser(err.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::Timeout { .. })
    }
}
