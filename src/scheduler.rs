// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Background scheduler for the daily exchange rate import.

use chrono::{Local, NaiveDateTime, NaiveTime};
use sqlx::sqlite::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::exchange_rates::update_exchange_rates;
use crate::feed::FeedSource;

/// How long to wait from `now` until the next occurrence of `at`.
/// If `at` is exactly now, the next run is a full day away.
pub fn until_next_run(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let today = now.date().and_time(at);
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

/// Starts the daily import at local time `at`.
pub fn start_ingestion_scheduler(
    pool: SqlitePool,
    source: FeedSource,
    at: NaiveTime,
    run_on_startup: bool,
) -> JoinHandle<()> {
    tracing::info!("Exchange rate import scheduled daily at {}", at);
    spawn_ingestion_loop(pool, source, run_on_startup, move || {
        until_next_run(Local::now().naive_local(), at)
    })
}

/// Runs never overlap: each one finishes before `next_wait` is asked for the
/// following delay, and a failed run is retried only at the next trigger.
fn spawn_ingestion_loop<W>(
    pool: SqlitePool,
    source: FeedSource,
    run_on_startup: bool,
    mut next_wait: W,
) -> JoinHandle<()>
where
    W: FnMut() -> Duration + Send + 'static,
{
    tokio::spawn(async move {
        if run_on_startup {
            run_scheduled_ingestion(&pool, &source).await;
        }

        loop {
            let wait = next_wait();
            tracing::debug!("Next exchange rate import in {:?}", wait);
            sleep(wait).await;
            run_scheduled_ingestion(&pool, &source).await;
        }
    })
}

async fn run_scheduled_ingestion(pool: &SqlitePool, source: &FeedSource) {
    if let Err(e) = update_exchange_rates(pool, source).await {
        tracing::error!("Exchange rate import failed: {:#}", e);
    }
}
