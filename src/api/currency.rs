// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{extract::State, routing::get, Json, Router};
use sqlx::SqlitePool;

use crate::currencies;
use crate::error::AppResult;
use crate::models::Currency;

pub fn routes() -> Router<SqlitePool> {
    Router::new().route("/currencies", get(get_currencies))
}

async fn get_currencies(State(pool): State<SqlitePool>) -> AppResult<Json<Vec<Currency>>> {
    tracing::info!("Fetching all available currencies");
    let currencies = currencies::get_all_currencies(&pool).await?;
    Ok(Json(currencies))
}
