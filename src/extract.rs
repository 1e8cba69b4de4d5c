// src/extract.rs

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use crate::error::ScrapeError;

/// What one rendered page contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Only filled when header capture was requested and the table had header cells.
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Compiled selectors for one table layout.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    table_css: String,
    table: Selector,
    row: Selector,
    header_cell: Selector,
    data_cell: Selector,
}

impl TableExtractor {
    pub fn new(table_css: &str) -> Result<Self, ScrapeError> {
        let table = Selector::parse(table_css)
            .map_err(|e| ScrapeError::Config(format!("table selector `{table_css}`: {e:?}")))?;
        Ok(Self {
            table_css: table_css.to_string(),
            table,
            row: Selector::parse("tr").expect("row selector should parse"),
            header_cell: Selector::parse("th").expect("header selector should parse"),
            data_cell: Selector::parse("td").expect("cell selector should parse"),
        })
    }

    /// Pull headers (optionally) and data rows out of rendered markup.
    ///
    /// The first `tr` of the table is taken to be the header row and skipped.
    /// Rows with no `td` cells are dropped.
    pub fn extract(&self, html: &str, capture_headers: bool) -> Result<Extracted, ScrapeError> {
        let doc = Html::parse_document(html);
        let table = doc
            .select(&self.table)
            .next()
            .ok_or_else(|| ScrapeError::TableNotFound {
                selector: self.table_css.clone(),
            })?;

        let headers = if capture_headers {
            let found: Vec<String> = table.select(&self.header_cell).map(cell_text).collect();
            debug!(count = found.len(), "header cells");
            (!found.is_empty()).then_some(found)
        } else {
            None
        };

        let rows: Vec<Vec<String>> = table
            .select(&self.row)
            .skip(1)
            .map(|tr| tr.select(&self.data_cell).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();
        trace!(rows = rows.len(), "extracted rows");

        Ok(Extracted { headers, rows })
    }
}

/// All descendant text of a cell, trimmed.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
