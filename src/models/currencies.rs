// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

/// A currency known to the store, identified by its code (e.g. "USD").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Currency {
    pub id: i64,
    pub code: String,
}

/// Get a currency from the database by its code
pub async fn get_currency(pool: &SqlitePool, code: &str) -> Result<Option<Currency>> {
    let record = sqlx::query_as::<_, Currency>(
        r#"
        SELECT id, code
        FROM currencies
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Insert a currency unless the code already exists, returning the stored row either way
pub async fn insert_currency(pool: &SqlitePool, code: &str) -> Result<Currency> {
    sqlx::query(
        r#"
        INSERT INTO currencies (code)
        VALUES (?)
        ON CONFLICT(code) DO NOTHING
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    get_currency(pool, code)
        .await?
        .ok_or_else(|| anyhow!("Currency {} vanished after insert", code))
}

/// List all currencies in the database
pub async fn list_currencies(pool: &SqlitePool) -> Result<Vec<Currency>> {
    let records = sqlx::query_as::<_, Currency>(
        r#"
        SELECT id, code
        FROM currencies
        ORDER BY code
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records)
}
