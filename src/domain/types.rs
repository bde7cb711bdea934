use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single news article, as loaded from the news CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub date: NaiveDate,
    pub stock: String,
    pub headline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
            Self::Positive => write!(f, "positive"),
        }
    }
}

/// An article annotated with both sentiment scorers' output.
///
/// `combined` is the mean of the lexicon polarity and VADER compound score;
/// `final_label` thresholds `combined` with the lexicon cutoffs.
#[derive(Debug, Clone)]
pub struct AnnotatedArticle {
    pub article: Article,
    pub polarity: f64,
    pub subjectivity: f64,
    pub lexicon_label: SentimentLabel,
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub vader_label: SentimentLabel,
    pub combined: f64,
    pub final_label: SentimentLabel,
}

/// Per-calendar-day aggregation of annotated articles.
#[derive(Debug, Clone)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub avg_sentiment: f64,
    /// Sample std of the combined score; `None` when the day has one article.
    pub sentiment_std: Option<f64>,
    pub article_count: usize,
    pub avg_polarity: f64,
    pub avg_compound: f64,
    pub dominant_label: SentimentLabel,
}

/// One OHLCV observation. `volume` is optional because some price files
/// ship without a Volume column; dependent analyses are skipped then.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// A price bar plus every derived indicator column.
///
/// Indicator fields are `None` until the corresponding rolling window is
/// filled; that warm-up gap is part of the data model, not an error.
#[derive(Debug, Clone, Default)]
pub struct EnrichedBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub daily_return: Option<f64>,
    pub cumulative_return: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub volatility_20: Option<f64>,
    pub atr_14: Option<f64>,
    pub price_vs_sma_20: Option<f64>,
    pub sma_20_vs_sma_50: Option<f64>,
}

impl EnrichedBar {
    pub fn from_bar(bar: &PriceBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ..Self::default()
        }
    }
}

/// Correlation statistics for one (sentiment, price-metric) pairing.
#[derive(Debug, Clone)]
pub struct CorrelationResult {
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub spearman_rho: f64,
    pub spearman_p: f64,
    pub sample_size: usize,
    /// Lag-k Pearson r (sentiment leads price by k days). An entry exists
    /// only when the cleaned sample is longer than k.
    pub lagged: BTreeMap<usize, f64>,
}

/// Per-sentiment-label return aggregation.
#[derive(Debug, Clone)]
pub struct SentimentImpact {
    pub label: SentimentLabel,
    pub avg_daily_return: Option<f64>,
    pub return_std: Option<f64>,
    pub article_count: usize,
    pub return_per_article: Option<f64>,
}
