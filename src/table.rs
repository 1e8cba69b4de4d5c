// src/table.rs

use std::fmt;
use tracing::warn;

use crate::paginate::PageBatch;

/// Headers plus every extracted row, in page order then in-page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names from the first page that exposed a header row.
    pub headers: Vec<String>,
    /// One `Vec` of cell texts per row. Lengths are not forced to match `headers`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Fold one page into the table. Headers are only taken while none are held.
    pub fn absorb(&mut self, batch: PageBatch) {
        if self.headers.is_empty() {
            if let Some(headers) = batch.headers {
                self.headers = headers;
            }
        }
        for row in batch.rows {
            if !self.headers.is_empty() && row.len() != self.headers.len() {
                warn!(
                    page = batch.page_number,
                    expected = self.headers.len(),
                    got = row.len(),
                    "row width differs from header width"
                );
            }
            self.rows.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of column `idx`, skipping rows too short to have it.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(move |r| r.get(idx).map(String::as_str))
    }
}

impl FromIterator<PageBatch> for Table {
    fn from_iter<I: IntoIterator<Item = PageBatch>>(iter: I) -> Self {
        let mut table = Table::default();
        for batch in iter {
            table.absorb(batch);
        }
        table
    }
}

/// Aligned plain-text dump, one line per row, for eyeballing on stdout.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; width];
        for line in std::iter::once(&self.headers).chain(self.rows.iter()) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let index_width = self.rows.len().saturating_sub(1).to_string().len();

        let write_line = |f: &mut fmt::Formatter<'_>, label: &str, line: &[String]| {
            write!(f, "{label:>index_width$}")?;
            for (i, cell) in line.iter().enumerate() {
                write!(f, "  {cell:<w$}", w = widths[i])?;
            }
            writeln!(f)
        };

        write_line(f, "", &self.headers)?;
        for (i, row) in self.rows.iter().enumerate() {
            write_line(f, &i.to_string(), row)?;
        }
        write!(f, "[{} rows x {} columns]", self.rows.len(), self.headers.len())
    }
}
