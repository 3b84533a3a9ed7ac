//! Untyped tables as read from CliFlo result pages and cache files.

use std::io::{Read, Write};

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

/// A grid of trimmed string cells. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        RawTable { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first row holding a cell equal to `marker`.
    pub fn header_index(&self, marker: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.iter().any(|cell| cell == marker))
    }

    /// Extracts the first `<table>` in `html` that has a cell equal to
    /// `marker`. Nested tables are skipped so a layout table does not swallow
    /// the data table it wraps. Returns an empty table when nothing matches.
    pub fn from_html(html: &str, marker: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let table_selector = selector("table")?;
        let row_selector = selector("tr")?;
        let cell_selector = selector("th, td")?;

        for table in document.select(&table_selector) {
            if table.select(&table_selector).next().is_some() {
                continue;
            }

            let rows: Vec<Vec<String>> = table
                .select(&row_selector)
                .map(|row| row.select(&cell_selector).map(cell_text).collect())
                .collect();

            let table = RawTable::new(rows);
            if table.header_index(marker).is_some() {
                return Ok(table);
            }
        }

        Ok(RawTable::default())
    }

    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }

        Ok(RawTable::new(rows))
    }

    pub fn to_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector `{}`: {}", css, e))
}

fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// -- Tests -------------------------------------------------------------------
