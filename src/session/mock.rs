// src/session/mock.rs

// Scripted in-memory driver for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use super::{NextControl, PageDriver};

#[derive(Debug, Clone)]
pub struct MockPage {
    html: String,
    /// Row polls that report nothing before rows show up. `None` never renders.
    hidden_polls: Option<usize>,
    next_class: Option<String>,
    click_fails: bool,
    /// Markup served for the first N reads after the page is loaded.
    stale: Option<(usize, String)>,
    /// Markup reads that succeed before every later read fails.
    readable: Option<usize>,
}

impl MockPage {
    pub fn ready(html: &str) -> Self {
        Self {
            html: html.to_string(),
            hidden_polls: Some(0),
            next_class: None,
            click_fails: false,
            stale: None,
            readable: None,
        }
    }

    pub fn rows_after(polls: usize, html: &str) -> Self {
        Self {
            hidden_polls: Some(polls),
            ..Self::ready(html)
        }
    }

    pub fn never_renders() -> Self {
        Self {
            hidden_polls: None,
            ..Self::ready("<html></html>")
        }
    }

    pub fn with_next(mut self, class: &str) -> Self {
        self.next_class = Some(class.to_string());
        self
    }

    pub fn with_failing_click(mut self) -> Self {
        self.click_fails = true;
        self
    }

    /// Serve `html` for the first `reads` markup reads, like a listing that
    /// updates its pager before its rows.
    pub fn with_stale_reads(mut self, reads: usize, html: &str) -> Self {
        self.stale = Some((reads, html.to_string()));
        self
    }

    pub fn with_failing_reads_after(mut self, reads: usize) -> Self {
        self.readable = Some(reads);
        self
    }
}

#[derive(Debug)]
pub struct MockDriver {
    pages: Vec<MockPage>,
    current: AtomicUsize,
    page_polls: AtomicUsize,
    page_reads: AtomicUsize,
    polls: AtomicUsize,
    visited: Mutex<Vec<String>>,
    closed: Arc<AtomicBool>,
}

impl MockDriver {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self {
            pages,
            current: AtomicUsize::new(0),
            page_polls: AtomicUsize::new(0),
            page_reads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            visited: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    /// Flag that flips once `close` ran; survives the driver being consumed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn page(&self) -> Result<&MockPage> {
        self.pages
            .get(self.current.load(Ordering::SeqCst))
            .ok_or_else(|| anyhow!("mock has no page loaded"))
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn row_count(&self) -> Result<usize> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let seen = self.page_polls.fetch_add(1, Ordering::SeqCst);
        match self.page()?.hidden_polls {
            Some(hidden) if seen >= hidden => Ok(1),
            _ => Ok(0),
        }
    }

    async fn content(&self) -> Result<String> {
        let page = self.page()?;
        let read = self.page_reads.fetch_add(1, Ordering::SeqCst);
        if page.readable.is_some_and(|ok| read >= ok) {
            return Err(anyhow!("CDP connection reset"));
        }
        match &page.stale {
            Some((reads, html)) if read < *reads => Ok(html.clone()),
            _ => Ok(page.html.clone()),
        }
    }

    async fn next_control(&self) -> Result<Option<NextControl>> {
        Ok(self
            .page()?
            .next_class
            .as_ref()
            .map(|class| NextControl {
                class: class.clone(),
            }))
    }

    async fn click_next(&mut self) -> Result<()> {
        if self.page()?.click_fails {
            return Err(anyhow!("element is not clickable"));
        }
        let idx = self.current.load(Ordering::SeqCst);
        if idx + 1 < self.pages.len() {
            self.current.store(idx + 1, Ordering::SeqCst);
            self.page_polls.store(0, Ordering::SeqCst);
            self.page_reads.store(0, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
