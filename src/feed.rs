// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Reading and parsing the daily rates feed.
//!
//! The feed is comma separated. The first line is `<label>,<code1>,<code2>,...`
//! and every following line is `<M/D/YYYY>,<rate1>,<rate2>,...`, with rates
//! matching the header codes by position.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;

/// Accepts single- or double-digit month and day, e.g. `1/2/2023` and `12/31/2022`.
pub const FEED_DATE_FORMAT: &str = "%m/%d/%Y";

/// Where the feed is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    File(PathBuf),
    Url(String),
}

impl FeedSource {
    /// `http://` and `https://` locations are fetched over the network, anything else is a path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            FeedSource::Url(location.to_string())
        } else {
            FeedSource::File(PathBuf::from(location))
        }
    }

    /// Read the whole feed into memory.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            FeedSource::File(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read feed file {}", path.display())),
            FeedSource::Url(url) => {
                let response = reqwest::get(url)
                    .await
                    .with_context(|| format!("Failed to request feed {}", url))?
                    .error_for_status()
                    .with_context(|| format!("Feed {} returned an error status", url))?;
                let body = response
                    .bytes()
                    .await
                    .with_context(|| format!("Failed to read feed body from {}", url))?;
                Ok(body.to_vec())
            }
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::File(path) => write!(f, "{}", path.display()),
            FeedSource::Url(url) => f.write_str(url),
        }
    }
}

/// One parsed data line: a date and one rate per header code.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub date: NaiveDate,
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFeed {
    pub codes: Vec<String>,
    pub rows: Vec<FeedRow>,
    pub skipped_lines: usize,
}

impl ParsedFeed {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.rows.is_empty()
    }
}

/// Parse a feed. Malformed data lines are logged and skipped; only an
/// unreadable header fails the whole parse.
pub fn parse_feed<R: Read>(input: R) -> Result<ParsedFeed> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut records = reader.records();

    let header = match records.next() {
        Some(header) => header.context("Failed to read feed header")?,
        None => {
            tracing::warn!("Feed is empty or missing its header line");
            return Ok(ParsedFeed::default());
        }
    };

    let codes: Vec<String> = significant_cells(&header)
        .into_iter()
        .skip(1)
        .map(str::to_string)
        .collect();
    if let Some(position) = codes.iter().position(|code| code.is_empty()) {
        bail!("Feed header has an empty currency code in column {}", position + 2);
    }

    let mut feed = ParsedFeed {
        codes,
        ..ParsedFeed::default()
    };

    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Failed to read feed line: {}", e);
                feed.skipped_lines += 1;
                continue;
            }
        };

        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let cells = significant_cells(&record);
        if cells.is_empty() {
            continue;
        }

        match parse_row(&cells, feed.codes.len()) {
            Ok(row) => feed.rows.push(row),
            Err(e) => {
                tracing::error!(
                    "Failed to parse feed line {}: '{}'. Error: {}",
                    line,
                    record.iter().collect::<Vec<_>>().join(","),
                    e
                );
                feed.skipped_lines += 1;
            }
        }
    }

    Ok(feed)
}

/// Cells of a line without its trailing empty ones, so `a,b,` reads as `a,b`.
fn significant_cells(record: &csv::StringRecord) -> Vec<&str> {
    let mut cells: Vec<&str> = record.iter().collect();
    while cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }
    cells
}

fn parse_row(cells: &[&str], columns: usize) -> Result<FeedRow> {
    if cells.len() != columns + 1 {
        bail!("expected {} fields, found {}", columns + 1, cells.len());
    }

    let date_field = cells[0];
    let date = NaiveDate::parse_from_str(date_field, FEED_DATE_FORMAT)
        .with_context(|| format!("invalid date '{}'", date_field))?;

    let rates = cells
        .iter()
        .skip(1)
        .map(|field| {
            field
                .parse::<f64>()
                .ok()
                .filter(|rate| rate.is_finite())
                .with_context(|| format!("invalid rate '{}'", field))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeedRow { date, rates })
}
