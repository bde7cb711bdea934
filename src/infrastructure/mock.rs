//! In-memory price-history service for tests and offline runs.

use crate::domain::ports::PriceHistoryService;
use crate::domain::types::PriceBar;
use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Default)]
pub struct MockPriceHistoryService {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl MockPriceHistoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }
}

#[async_trait]
impl PriceHistoryService for MockPriceHistoryService {
    async fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        match self.bars.get(ticker) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|bar| bar.date >= start && bar.date <= end)
                .cloned()
                .collect()),
            None => bail!("no mock price history for {}", ticker),
        }
    }
}
