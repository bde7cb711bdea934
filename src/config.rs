use crate::infrastructure::loader::NEWS_FILE;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

/// Environment-backed configuration for the batch run. Every variable has
/// a default; CLI flags on the binary override these.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub news_file: String,
    /// Explicit ticker list; empty means discover from the data directory.
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data/raw".to_string());
        let news_file = env::var("NEWS_FILE").unwrap_or_else(|_| NEWS_FILE.to_string());

        let tickers = env::var("TICKERS")
            .map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let start_date = env::var("START_DATE")
            .unwrap_or_else(|_| "2020-01-01".to_string())
            .parse::<NaiveDate>()
            .context("Invalid START_DATE, expected YYYY-MM-DD")?;
        let end_date = env::var("END_DATE")
            .unwrap_or_else(|_| "2025-01-01".to_string())
            .parse::<NaiveDate>()
            .context("Invalid END_DATE, expected YYYY-MM-DD")?;

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            news_file,
            tickers,
            start_date,
            end_date,
        })
    }
}
