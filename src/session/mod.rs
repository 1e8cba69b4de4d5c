// src/session/mod.rs

// Driver abstraction the paginator talks to, plus the bounded waits used
// after navigation and after each page change.

pub mod chromium;
#[cfg(test)]
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use crate::{config::ScrapeConfig, error::ScrapeError};

pub use chromium::ChromiumDriver;

/// State of the next-page control as found in the live page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextControl {
    /// Raw `class` attribute, empty when absent.
    pub class: String,
}

impl NextControl {
    pub fn is_disabled(&self, marker: &str) -> bool {
        self.class.contains(marker)
    }
}

/// One controlled browser tab.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the tab to `url`.
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// Number of generic row elements currently in the DOM.
    async fn row_count(&self) -> Result<usize>;
    /// Full rendered markup.
    async fn content(&self) -> Result<String>;
    /// The next-page control, if the page has one.
    async fn next_control(&self) -> Result<Option<NextControl>>;
    /// Activate the next-page control.
    async fn click_next(&mut self) -> Result<()>;
    /// Release the browser. Consumes the driver.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Poll until the page shows rows. Fails with `ScrapeError::Timeout` once `timeout` passes.
pub async fn wait_for_rows<D: PageDriver + ?Sized>(
    driver: &D,
    timeout: Duration,
    poll: Duration,
) -> Result<()> {
    poll_rows(driver, timeout, poll, "rows", None).await
}

/// Poll until the page shows rows and `is_new` accepts its markup.
///
/// Used after a page change: the caller decides what "new" means, so a page
/// whose pager already moved while the old rows are still shown keeps waiting.
pub async fn wait_for_new_rows<D, F>(
    driver: &D,
    timeout: Duration,
    poll: Duration,
    is_new: F,
) -> Result<()>
where
    D: PageDriver + ?Sized,
    F: Fn(&str) -> bool,
{
    poll_rows(driver, timeout, poll, "new rows", Some(&is_new as &dyn Fn(&str) -> bool)).await
}

async fn poll_rows<D: PageDriver + ?Sized>(
    driver: &D,
    timeout: Duration,
    poll: Duration,
    what: &str,
    accept: Option<&dyn Fn(&str) -> bool>,
) -> Result<()> {
    let start = Instant::now();
    loop {
        if driver.row_count().await? > 0 {
            match accept {
                None => return Ok(()),
                Some(accept) => {
                    if accept(&driver.content().await?) {
                        return Ok(());
                    }
                }
            }
        }
        if start.elapsed() >= timeout {
            return Err(ScrapeError::Timeout {
                what: what.to_string(),
                after: timeout,
            }
            .into());
        }
        sleep(poll).await;
    }
}

/// Navigate to the configured listing and block until the first rows render.
#[instrument(level = "info", skip(driver, cfg), fields(url = %cfg.url))]
pub async fn open<D: PageDriver>(driver: &mut D, cfg: &ScrapeConfig) -> Result<()> {
    driver.goto(cfg.url.as_str()).await?;
    debug!("navigation issued; waiting for rows");
    wait_for_rows(&*driver, cfg.initial_wait, cfg.poll_interval).await?;
    info!("listing rendered");
    Ok(())
}
