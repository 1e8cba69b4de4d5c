// src/session/chromium.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{NextControl, PageDriver};
use crate::{config::ScrapeConfig, error::ScrapeError};

/// Pick a browser binary: explicit path first, then the usual names on PATH.
/// `None` leaves detection to chromiumoxide.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
        warn!(path = %path.display(), "configured Chromium path does not exist; searching PATH");
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// A launched browser plus the single tab we drive.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    row_selector: String,
    next_selector: String,
}

impl ChromiumDriver {
    /// Launch a browser process and open a blank tab.
    pub async fn launch(cfg: &ScrapeConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !cfg.headless {
            builder = builder.with_head();
        }
        if let Some(path) = find_chromium(cfg.chromium_path.as_ref()) {
            debug!(path = %path.display(), "using Chromium binary");
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::browser(format!("failed to build browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler.abort();
                return Err(e).context("failed to open a tab");
            }
        };

        info!(headless = cfg.headless, "browser launched");
        Ok(Self {
            browser,
            page,
            handler,
            row_selector: cfg.row_selector.clone(),
            next_selector: cfg.next_selector.clone(),
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))?;
        Ok(())
    }

    async fn row_count(&self) -> Result<usize> {
        let rows = self
            .page
            .find_elements(self.row_selector.as_str())
            .await
            .context("querying row elements")?;
        Ok(rows.len())
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.context("reading page markup")
    }

    async fn next_control(&self) -> Result<Option<NextControl>> {
        let mut found = self
            .page
            .find_elements(self.next_selector.as_str())
            .await
            .context("querying next-page control")?;
        if found.is_empty() {
            return Ok(None);
        }
        let el = found.swap_remove(0);
        let class = el
            .attribute("class")
            .await
            .context("reading next-page control class")?
            .unwrap_or_default();
        Ok(Some(NextControl { class }))
    }

    async fn click_next(&mut self) -> Result<()> {
        let el = self
            .page
            .find_element(self.next_selector.as_str())
            .await
            .context("locating next-page control")?;
        el.click().await.context("clicking next-page control")?;
        Ok(())
    }

    async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.context("closing browser")?;
        info!("browser closed");
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
