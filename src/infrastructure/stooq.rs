//! Stooq daily price-history fetch, the network fallback when no local
//! CSV exists for a ticker. Stooq serves the same Date/OHLCV schema the
//! local files use, so the payload goes through the shared CSV parser.

use crate::domain::errors::DataError;
use crate::domain::ports::PriceHistoryService;
use crate::domain::types::PriceBar;
use crate::infrastructure::loader::parse_price_records;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://stooq.com";

pub struct StooqClient {
    client: Client,
    base_url: String,
}

impl StooqClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for StooqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistoryService for StooqClient {
    async fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        // Stooq keys US equities as lowercase "<ticker>.us".
        let url = format!(
            "{}/q/d/l/?s={}.us&d1={}&d2={}&i=d",
            self.base_url,
            ticker.to_lowercase(),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        );
        debug!("Fetching price history: {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("price history request failed for {ticker}"))?
            .error_for_status()
            .with_context(|| format!("price history request rejected for {ticker}"))?
            .text()
            .await
            .with_context(|| format!("price history body unreadable for {ticker}"))?;

        // Stooq answers unknown symbols with a 200 and a stub body.
        if !body.starts_with("Date") {
            return Err(DataError::Fetch {
                ticker: ticker.to_string(),
                reason: "no data returned".to_string(),
            }
            .into());
        }

        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let bars = parse_price_records(reader.deserialize(), &url)?;
        Ok(bars)
    }
}
