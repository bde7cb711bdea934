use crate::domain::types::PriceBar;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// External daily price-history source, used as a fallback when no local
/// CSV exists for a ticker.
#[async_trait]
pub trait PriceHistoryService: Send + Sync {
    async fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>>;
}
