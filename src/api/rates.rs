// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::currencies::{self, Page, PageRequest};
use crate::error::AppResult;
use crate::models::ExchangeRate;

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
struct DateCurrencyQuery {
    date: NaiveDate,
    currency: String,
}

#[derive(Deserialize)]
struct ConvertQuery {
    currency: String,
    amount: f64,
    date: NaiveDate,
}

pub fn routes() -> Router<SqlitePool> {
    Router::new()
        .route("/rates", get(get_rates))
        .route("/rates/date", get(get_rates_by_date))
        .route("/rates/date-currency", get(get_rate_by_date_and_currency))
        .route("/convert", get(convert))
}

async fn get_rates(
    State(pool): State<SqlitePool>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<Page<ExchangeRate>>> {
    tracing::info!(
        "Fetching exchange rates (page: {}, size: {})",
        page.page,
        page.size
    );
    let rates = currencies::get_exchange_rates(&pool, page).await?;
    Ok(Json(rates))
}

async fn get_rates_by_date(
    State(pool): State<SqlitePool>,
    Query(q): Query<DateQuery>,
) -> AppResult<Json<Vec<ExchangeRate>>> {
    tracing::info!("Fetching exchange rates for {}", q.date);
    let rates = currencies::get_exchange_rates_by_date(&pool, q.date).await?;
    Ok(Json(rates))
}

async fn get_rate_by_date_and_currency(
    State(pool): State<SqlitePool>,
    Query(q): Query<DateCurrencyQuery>,
) -> AppResult<Json<ExchangeRate>> {
    tracing::info!("Fetching rate for {} on {}", q.currency, q.date);
    let rate = currencies::get_exchange_rate(&pool, q.date, &q.currency).await?;
    Ok(Json(rate))
}

async fn convert(
    State(pool): State<SqlitePool>,
    Query(q): Query<ConvertQuery>,
) -> AppResult<Json<f64>> {
    tracing::info!("Converting {} EUR to {} on {}", q.amount, q.currency, q.date);
    let converted = currencies::convert(&pool, &q.currency, q.amount, q.date).await?;
    Ok(Json(converted))
}
