use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::feed::FeedSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    /// Local path or http(s) URL of the rates feed.
    pub feed_source: String,
    /// Local wall-clock time of the daily import.
    pub ingest_at: NaiveTime,
    pub ingest_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "sqlite://rates.db".to_string(),
            feed_source: "data/exchange_rates.csv".to_string(),
            ingest_at: NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN),
            ingest_on_startup: true,
        }
    }
}

impl Config {
    pub fn feed(&self) -> FeedSource {
        FeedSource::parse(&self.feed_source)
    }

    /// Apply `RATES_*` and `DATABASE_URL` overrides from the environment.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(addr) = env::var("RATES_LISTEN_ADDR") {
            self.listen_addr = addr
                .parse()
                .with_context(|| format!("Invalid RATES_LISTEN_ADDR '{}'", addr))?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(source) = env::var("RATES_FEED_SOURCE") {
            self.feed_source = source;
        }
        if let Ok(at) = env::var("RATES_INGEST_AT") {
            self.ingest_at = NaiveTime::parse_from_str(&at, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(&at, "%H:%M"))
                .with_context(|| format!("Invalid RATES_INGEST_AT '{}'", at))?;
        }
        if let Ok(flag) = env::var("RATES_INGEST_ON_STARTUP") {
            self.ingest_on_startup = flag
                .parse()
                .with_context(|| format!("Invalid RATES_INGEST_ON_STARTUP '{}'", flag))?;
        }
        Ok(self)
    }
}

fn get_config_path() -> PathBuf {
    if let Ok(path) = env::var("RATES_CONFIG") {
        return PathBuf::from(path);
    }
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.toml");
    path
}

pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    Ok(config)
}

/// Read a config file; a missing file yields the defaults.
pub fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&config_str).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the configuration: `.env`, then the config file, then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    dotenvy::dotenv().ok();
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    read_config_file(&path)?.apply_env()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() -> Result<()> {
        let config = parse_config(
            r#"
            listen_addr = "127.0.0.1:9000"
            database_url = "sqlite://test.db"
            feed_source = "https://example.com/rates.csv"
            ingest_at = "02:30:00"
            ingest_on_startup = false
            "#,
        )?;

        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse()?);
        assert_eq!(config.database_url, "sqlite://test.db");
        assert_eq!(
            config.feed(),
            FeedSource::Url("https://example.com/rates.csv".to_string())
        );
        assert_eq!(config.ingest_at, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        assert!(!config.ingest_on_startup);
        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let config = parse_config(r#"feed_source = "/srv/feed.csv""#)?;
        let defaults = Config::default();

        assert_eq!(config.feed_source, "/srv/feed.csv");
        assert_eq!(config.listen_addr, defaults.listen_addr);
        assert_eq!(config.ingest_at, NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        assert!(config.ingest_on_startup);
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(parse_config(r#"listen_addr = "not an address""#).is_err());
        assert!(parse_config(r#"ingest_at = "25:00:00""#).is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = read_config_file(&dir.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_read_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "database_url = \"sqlite::memory:\"\n")?;

        let config = read_config_file(&path)?;
        assert_eq!(config.database_url, "sqlite::memory:");
        Ok(())
    }
}
