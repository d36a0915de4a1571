// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::Currency;

/// A stored rate: units of `currency` per 1 EUR on `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: i64,
    pub date: NaiveDate,
    pub rate: f64,
    pub currency: Currency,
}

/// A rate that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExchangeRate {
    pub date: NaiveDate,
    pub currency: Currency,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(sqlx::FromRow)]
struct ExchangeRateRow {
    id: i64,
    date: NaiveDate,
    rate: f64,
    currency_id: i64,
    currency_code: String,
}

impl From<ExchangeRateRow> for ExchangeRate {
    fn from(row: ExchangeRateRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            rate: row.rate,
            currency: Currency {
                id: row.currency_id,
                code: row.currency_code,
            },
        }
    }
}

const SELECT_RATES: &str = r#"
    SELECT r.id, r.date, r.rate, c.id AS currency_id, c.code AS currency_code
    FROM exchange_rates r
    JOIN currencies c ON c.id = r.currency_id
"#;

/// Insert a rate unless one already exists for its (date, currency) pair.
///
/// The check and the write are a single statement; the unique index on
/// `(date, currency_id)` turns a concurrent duplicate into a no-op.
pub async fn insert_rate_if_absent(pool: &SqlitePool, rate: &NewExchangeRate) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO exchange_rates (date, currency_id, rate)
        VALUES (?, ?, ?)
        ON CONFLICT(date, currency_id) DO NOTHING
        "#,
    )
    .bind(rate.date)
    .bind(rate.currency.id)
    .bind(rate.rate)
    .execute(pool)
    .await?;

    Ok(if result.rows_affected() > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::AlreadyExists
    })
}

/// Get the rate for a currency code on a date
pub async fn get_rate(pool: &SqlitePool, date: NaiveDate, code: &str) -> Result<Option<ExchangeRate>> {
    let record = sqlx::query_as::<_, ExchangeRateRow>(&format!(
        "{} WHERE r.date = ? AND c.code = ?",
        SELECT_RATES
    ))
    .bind(date)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(ExchangeRate::from))
}

/// List every rate recorded on a date, ordered by currency code
pub async fn list_rates_by_date(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<ExchangeRate>> {
    let records = sqlx::query_as::<_, ExchangeRateRow>(&format!(
        "{} WHERE r.date = ? ORDER BY c.code",
        SELECT_RATES
    ))
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(ExchangeRate::from).collect())
}

/// List a window of rates in insertion order
pub async fn list_rates(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<ExchangeRate>> {
    let records = sqlx::query_as::<_, ExchangeRateRow>(&format!(
        "{} ORDER BY r.id LIMIT ? OFFSET ?",
        SELECT_RATES
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(ExchangeRate::from).collect())
}

pub async fn count_rates(pool: &SqlitePool) -> Result<i64> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM exchange_rates")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::insert_currency;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_rate() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let usd = insert_currency(&pool, "USD").await?;

        let outcome = insert_rate_if_absent(
            &pool,
            &NewExchangeRate {
                date: date(2023, 1, 2),
                currency: usd.clone(),
                rate: 1.0667,
            },
        )
        .await?;
        assert_eq!(outcome, InsertOutcome::Inserted);

        let rate = get_rate(&pool, date(2023, 1, 2), "USD").await?.unwrap();
        assert_eq!(rate.currency, usd);
        assert_eq!(rate.date, date(2023, 1, 2));
        assert_relative_eq!(rate.rate, 1.0667);

        // Test getting non-existent rate
        assert!(get_rate(&pool, date(2023, 1, 3), "USD").await?.is_none());
        assert!(get_rate(&pool, date(2023, 1, 2), "GBP").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_skipped() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let usd = insert_currency(&pool, "USD").await?;

        let first = NewExchangeRate {
            date: date(2023, 1, 2),
            currency: usd.clone(),
            rate: 1.0667,
        };
        let second = NewExchangeRate {
            rate: 2.0,
            ..first.clone()
        };

        assert_eq!(insert_rate_if_absent(&pool, &first).await?, InsertOutcome::Inserted);
        assert_eq!(
            insert_rate_if_absent(&pool, &second).await?,
            InsertOutcome::AlreadyExists
        );

        // The original value is never overwritten
        let stored = get_rate(&pool, date(2023, 1, 2), "USD").await?.unwrap();
        assert_relative_eq!(stored.rate, 1.0667);
        assert_eq!(count_rates(&pool).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_rates_by_date() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let usd = insert_currency(&pool, "USD").await?;
        let gbp = insert_currency(&pool, "GBP").await?;

        for (currency, value) in [(usd, 1.0667), (gbp, 0.8837)] {
            insert_rate_if_absent(
                &pool,
                &NewExchangeRate {
                    date: date(2023, 1, 2),
                    currency,
                    rate: value,
                },
            )
            .await?;
        }

        let rates = list_rates_by_date(&pool, date(2023, 1, 2)).await?;
        let codes: Vec<_> = rates.iter().map(|r| r.currency.code.as_str()).collect();
        assert_eq!(codes, vec!["GBP", "USD"]);

        // Empty result for a date without data
        assert!(list_rates_by_date(&pool, date(2023, 1, 3)).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_rates_window() -> Result<()> {
        let pool = db::create_test_pool().await?;
        let usd = insert_currency(&pool, "USD").await?;

        for day in 1..=5 {
            insert_rate_if_absent(
                &pool,
                &NewExchangeRate {
                    date: date(2023, 3, day),
                    currency: usd.clone(),
                    rate: 1.0 + day as f64 / 100.0,
                },
            )
            .await?;
        }

        let window = list_rates(&pool, 2, 2).await?;
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].date, date(2023, 3, 3));
        assert_eq!(window[1].date, date(2023, 3, 4));

        assert!(list_rates(&pool, 2, 10).await?.is_empty());
        assert_eq!(count_rates(&pool).await?, 5);

        Ok(())
    }
}
