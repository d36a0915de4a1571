// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod api;
mod config;
mod currencies;
mod db;
mod error;
mod exchange_rates;
mod feed;
mod models;
mod scheduler;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::feed::FeedSource;

#[derive(Parser)]
#[command(author, version, about = "EUR exchange rate API with a daily feed import")]
struct Cli {
    /// Path to the config file (defaults to RATES_CONFIG or config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run the daily import (default)
    Serve,
    /// Run a single import and exit
    Ingest {
        /// Feed file path or URL, overriding the configured source
        #[arg(long)]
        feed: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = config::load_config(cli.config.as_deref())?;

    let pool = db::create_db_pool(&config.database_url).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let _scheduler = scheduler::start_ingestion_scheduler(
                pool.clone(),
                config.feed(),
                config.ingest_at,
                config.ingest_on_startup,
            );

            let router = api::router(pool);
            tracing::info!("Listening on {}", config.listen_addr);
            let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
            axum::serve(listener, router).await?;
        }
        Commands::Ingest { feed } => {
            let source = feed
                .as_deref()
                .map(FeedSource::parse)
                .unwrap_or_else(|| config.feed());
            let report = exchange_rates::update_exchange_rates(&pool, &source).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
