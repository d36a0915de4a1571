// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::error::{AppError, AppResult};
use crate::models::{self, Currency, ExchangeRate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 2000;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    fn clamped_size(&self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
}

/// List all currencies
pub async fn get_all_currencies(pool: &SqlitePool) -> AppResult<Vec<Currency>> {
    let currencies = models::list_currencies(pool).await?;
    tracing::debug!("Fetched {} currencies", currencies.len());
    Ok(currencies)
}

/// List all exchange rates, one page at a time
pub async fn get_exchange_rates(
    pool: &SqlitePool,
    request: PageRequest,
) -> AppResult<Page<ExchangeRate>> {
    let size = request.clamped_size();
    let offset = i64::from(request.page) * i64::from(size);

    let total_elements = models::count_rates(pool).await?;
    let content = models::list_rates(pool, i64::from(size), offset).await?;
    let total_pages = (total_elements + i64::from(size) - 1) / i64::from(size);

    tracing::debug!(
        "Fetched {} exchange rates on page {} (size {})",
        content.len(),
        request.page,
        size
    );

    Ok(Page {
        content,
        page: request.page,
        size,
        total_elements,
        total_pages,
    })
}

/// List the exchange rates of every currency on a date; an empty list is a valid answer
pub async fn get_exchange_rates_by_date(
    pool: &SqlitePool,
    date: NaiveDate,
) -> AppResult<Vec<ExchangeRate>> {
    let rates = models::list_rates_by_date(pool, date).await?;
    if rates.is_empty() {
        tracing::warn!("No exchange rates found for {}", date);
    }
    Ok(rates)
}

/// Get the exchange rate of one currency on a date
pub async fn get_exchange_rate(
    pool: &SqlitePool,
    date: NaiveDate,
    currency: &str,
) -> AppResult<ExchangeRate> {
    models::get_rate(pool, date, currency)
        .await?
        .ok_or_else(|| not_found(date, currency))
}

/// Convert a EUR amount into `currency` using the rate stored for `date`.
///
/// Rates are quoted as units of the currency per 1 EUR, so the result is
/// `amount * rate`. The amount is validated before any lookup.
pub async fn convert(
    pool: &SqlitePool,
    currency: &str,
    amount: f64,
    date: NaiveDate,
) -> AppResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::InvalidInput(format!(
            "Amount must be a non-negative number, got {}",
            amount
        )));
    }

    let rate = get_exchange_rate(pool, date, currency).await?;
    let converted = amount * rate.rate;
    if !converted.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "Amount {} is too large to convert to {}",
            amount, currency
        )));
    }
    tracing::debug!(
        "Converted {} EUR to {} {} on {}",
        amount,
        converted,
        currency,
        date
    );
    Ok(converted)
}

fn not_found(date: NaiveDate, currency: &str) -> AppError {
    AppError::NotFound(format!(
        "No exchange rate found for currency '{}' on {}",
        currency, date
    ))
}
