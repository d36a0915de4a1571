// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::feed::{parse_feed, FeedSource};
use crate::models::{
    get_currency, insert_currency, insert_rate_if_absent, Currency, InsertOutcome, NewExchangeRate,
};
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;

/// Resolves currency codes to stored currencies, creating missing ones.
///
/// Lives for a single ingestion run; each code hits the database at most once.
pub struct CurrencyResolver<'a> {
    pool: &'a SqlitePool,
    cache: HashMap<String, Currency>,
}

impl<'a> CurrencyResolver<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, code: &str) -> Result<Currency> {
        if let Some(currency) = self.cache.get(code) {
            return Ok(currency.clone());
        }

        let currency = match get_currency(self.pool, code).await? {
            Some(currency) => currency,
            None => {
                tracing::info!("Currency '{}' not found. Creating new entry.", code);
                insert_currency(self.pool, code).await?
            }
        };

        self.cache.insert(code.to_string(), currency.clone());
        Ok(currency)
    }

    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub currencies: usize,
    pub candidates: usize,
    pub skipped_lines: usize,
    pub saved: SaveSummary,
}

/// Save a batch of rates, skipping any whose (date, currency) pair is already stored.
///
/// Every record is written on its own. A failing record is logged and counted,
/// and the rest of the batch still goes through.
pub async fn save_rates(pool: &SqlitePool, rates: &[NewExchangeRate]) -> SaveSummary {
    tracing::debug!("Saving batch of {} exchange rates", rates.len());

    let mut summary = SaveSummary::default();
    for rate in rates {
        match insert_rate_if_absent(pool, rate).await {
            Ok(InsertOutcome::Inserted) => summary.inserted += 1,
            Ok(InsertOutcome::AlreadyExists) => {
                tracing::debug!(
                    "Exchange rate already exists for currency '{}' on {}, skipping",
                    rate.currency.code,
                    rate.date
                );
                summary.already_present += 1;
            }
            Err(e) => {
                tracing::error!(
                    "Error saving exchange rate for currency '{}' on {}: {:#}",
                    rate.currency.code,
                    rate.date,
                    e
                );
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Saved {} new exchange rates out of {} ({} already present, {} failed)",
        summary.inserted,
        rates.len(),
        summary.already_present,
        summary.failed
    );
    summary
}

/// Ingest an in-memory feed: resolve the header currencies, build one rate per
/// cell and save the batch.
pub async fn ingest_feed(pool: &SqlitePool, input: &[u8]) -> Result<IngestionReport> {
    let feed = parse_feed(input)?;
    if feed.is_empty() {
        return Ok(IngestionReport::default());
    }

    let mut resolver = CurrencyResolver::new(pool);
    let mut columns = Vec::with_capacity(feed.codes.len());
    for code in &feed.codes {
        let currency = resolver
            .resolve(code)
            .await
            .with_context(|| format!("Failed to resolve currency {}", code))?;
        columns.push(currency);
    }

    let batch: Vec<NewExchangeRate> = feed
        .rows
        .iter()
        .flat_map(|row| {
            columns
                .iter()
                .zip(&row.rates)
                .map(move |(currency, &rate)| NewExchangeRate {
                    date: row.date,
                    currency: currency.clone(),
                    rate,
                })
        })
        .collect();

    let saved = save_rates(pool, &batch).await;

    Ok(IngestionReport {
        currencies: resolver.resolved_count(),
        candidates: batch.len(),
        skipped_lines: feed.skipped_lines,
        saved,
    })
}

/// Update exchange rates in the database from the feed
pub async fn update_exchange_rates(pool: &SqlitePool, source: &FeedSource) -> Result<IngestionReport> {
    tracing::info!("Starting exchange rate import from {}", source);

    let input = source.fetch().await?;
    let report = ingest_feed(pool, &input)
        .await
        .with_context(|| format!("Failed to import exchange rates from {}", source))?;

    tracing::info!(
        "Exchange rate import completed: {} currencies, {} rates read, {} lines skipped, {} new rates saved",
        report.currencies,
        report.candidates,
        report.skipped_lines,
        report.saved.inserted
    );
    Ok(report)
}
