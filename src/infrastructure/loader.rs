//! CSV data loading for news and per-ticker price files.
//!
//! Load failures are non-fatal by design: a bad news file yields an empty
//! article list, and a failing ticker is skipped while its siblings load.

use crate::domain::errors::DataError;
use crate::domain::ports::PriceHistoryService;
use crate::domain::types::{Article, PriceBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reserved filename for the news table; excluded from ticker discovery.
pub const NEWS_FILE: &str = "financial_news.csv";

#[derive(Debug, Deserialize)]
struct NewsRecord {
    date: String,
    stock: String,
    headline: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceRecord {
    #[serde(alias = "Date")]
    date: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(default, alias = "Volume")]
    volume: Option<f64>,
}

pub struct DataLoader {
    data_dir: PathBuf,
    price_history: Arc<dyn PriceHistoryService>,
    news: Option<Vec<Article>>,
    prices: HashMap<String, Vec<PriceBar>>,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>, price_history: Arc<dyn PriceHistoryService>) -> Self {
        Self {
            data_dir: data_dir.into(),
            price_history,
            news: None,
            prices: HashMap::new(),
        }
    }

    /// Load the news CSV. Any read or parse failure is logged and yields
    /// an empty list. Reloading overwrites the cached articles.
    pub fn load_news(&mut self, file_name: &str) -> Vec<Article> {
        let path = self.data_dir.join(file_name);
        match read_news_csv(&path) {
            Ok(articles) => {
                info!("Loaded news data with {} articles", articles.len());
                self.news = Some(articles.clone());
                articles
            }
            Err(e) => {
                error!("Error loading news data: {}", e);
                self.news = Some(Vec::new());
                Vec::new()
            }
        }
    }

    /// Load daily bars per ticker, preferring a local `{ticker}.csv` and
    /// falling back to the network price-history service. A failing ticker
    /// is skipped; the others still load.
    pub async fn load_prices(
        &mut self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> &HashMap<String, Vec<PriceBar>> {
        for ticker in tickers {
            let csv_path = self.data_dir.join(format!("{ticker}.csv"));
            let loaded = if csv_path.exists() {
                read_price_csv(&csv_path).map_err(anyhow::Error::from)
            } else {
                self.price_history.fetch_daily(ticker, start, end).await
            };

            match loaded {
                Ok(bars) => {
                    info!("Loaded data for {}: {} records", ticker, bars.len());
                    self.prices.insert(ticker.clone(), bars);
                }
                Err(e) => {
                    error!("Error loading data for {}: {}", ticker, e);
                }
            }
        }
        &self.prices
    }

    /// Ticker symbols derivable from `.csv` filenames in the data
    /// directory, excluding the reserved news file. Sorted.
    pub fn available_tickers(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list data directory {:?}: {}", self.data_dir, e);
                return Vec::new();
            }
        };

        let mut tickers: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let ticker = name.strip_suffix(".csv")?;
                (name != NEWS_FILE).then(|| ticker.to_string())
            })
            .collect();
        tickers.sort();
        tickers
    }

    /// Inner join of the loaded articles (filtered to `ticker`) with that
    /// ticker's price bars, on date. Empty when either side is missing.
    pub fn merge_for_ticker(&self, ticker: &str) -> Vec<(Article, PriceBar)> {
        let (Some(news), Some(bars)) = (self.news.as_ref(), self.prices.get(ticker)) else {
            return Vec::new();
        };

        let bars_by_date: HashMap<NaiveDate, &PriceBar> =
            bars.iter().map(|bar| (bar.date, bar)).collect();

        news.iter()
            .filter(|article| article.stock == ticker)
            .filter_map(|article| {
                bars_by_date
                    .get(&article.date)
                    .map(|bar| (article.clone(), (*bar).clone()))
            })
            .collect()
    }

    pub fn news(&self) -> Option<&[Article]> {
        self.news.as_deref()
    }

    pub fn prices(&self) -> &HashMap<String, Vec<PriceBar>> {
        &self.prices
    }
}

fn read_news_csv(path: &Path) -> Result<Vec<Article>, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| map_csv_error(e, &display))?;

    let mut articles = Vec::new();
    for record in reader.deserialize::<NewsRecord>() {
        let record = record.map_err(|e| map_csv_error(e, &display))?;
        articles.push(Article {
            date: parse_date(&record.date, &display)?,
            stock: record.stock,
            headline: record.headline,
        });
    }
    Ok(articles)
}

pub(crate) fn read_price_csv(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| map_csv_error(e, &display))?;
    parse_price_records(reader.deserialize(), &display)
}

/// Shared OHLCV record parsing for local files and fetched payloads; this
/// is where the `Date`/`date` column naming gets unified.
pub(crate) fn parse_price_records(
    records: impl Iterator<Item = Result<PriceRecord, csv::Error>>,
    source: &str,
) -> Result<Vec<PriceBar>, DataError> {
    let mut bars = Vec::new();
    for record in records {
        let record = record.map_err(|e| map_csv_error(e, source))?;
        bars.push(PriceBar {
            date: parse_date(&record.date, source)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    Ok(bars)
}

fn parse_date(value: &str, source: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .map_err(|_| DataError::Date {
            value: value.to_string(),
            path: source.to_string(),
        })
}

fn map_csv_error(e: csv::Error, path: &str) -> DataError {
    DataError::Csv {
        path: path.to_string(),
        source: e,
    }
}
