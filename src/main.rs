use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use sentistock::application::correlation::CorrelationAnalysis;
use sentistock::application::indicators::TechnicalIndicators;
use sentistock::application::sentiment::SentimentAnalyzer;
use sentistock::config::Config;
use sentistock::domain::types::SentimentLabel;
use sentistock::infrastructure::loader::DataLoader;
use sentistock::infrastructure::stooq::StooqClient;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Correlate news sentiment with stock price behavior.
#[derive(Parser, Debug)]
#[command(name = "sentistock", version, about)]
struct Args {
    /// Directory holding the news CSV and per-ticker price CSVs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Tickers to analyze (default: discovered from the data directory)
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Start of the price history range (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End of the price history range (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// News CSV filename inside the data directory
    #[arg(long)]
    news_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if !args.tickers.is_empty() {
        config.tickers = args.tickers;
    }
    if let Some(start) = args.start {
        config.start_date = start;
    }
    if let Some(end) = args.end {
        config.end_date = end;
    }
    if let Some(news_file) = args.news_file {
        config.news_file = news_file;
    }

    let mut loader = DataLoader::new(config.data_dir.clone(), Arc::new(StooqClient::new()));

    let articles = loader.load_news(&config.news_file);
    let tickers = if config.tickers.is_empty() {
        loader.available_tickers()
    } else {
        config.tickers.clone()
    };
    if tickers.is_empty() {
        warn!("No tickers configured or discoverable in {:?}", config.data_dir);
        return Ok(());
    }

    loader
        .load_prices(&tickers, config.start_date, config.end_date)
        .await;

    let analyzer = SentimentAnalyzer::new();

    for ticker in &tickers {
        let Some(bars) = loader.prices().get(ticker) else {
            warn!("Skipping {}: no price data loaded", ticker);
            continue;
        };

        let ticker_articles: Vec<_> = articles
            .iter()
            .filter(|a| &a.stock == ticker)
            .cloned()
            .collect();
        if ticker_articles.is_empty() {
            info!("Skipping {}: no news articles", ticker);
            continue;
        }

        let annotated = analyzer.analyze(&ticker_articles);
        let daily = SentimentAnalyzer::aggregate_daily(&annotated);
        let enriched = TechnicalIndicators::calculate_all_indicators(bars);

        let results = CorrelationAnalysis::full_analysis(&daily, &enriched);

        println!("\n########## {} ##########\n", ticker);
        println!("{}", CorrelationAnalysis::report(&results));

        // Article-level merged rows: final label joined with that day's return.
        let returns_by_date: HashMap<_, _> = enriched
            .iter()
            .map(|row| (row.date, row.daily_return))
            .collect();
        let impact_rows: Vec<(SentimentLabel, Option<f64>)> = annotated
            .iter()
            .filter_map(|row| {
                returns_by_date
                    .get(&row.article.date)
                    .map(|ret| (row.final_label, *ret))
            })
            .collect();

        let impact = CorrelationAnalysis::sentiment_impact(&impact_rows);
        if !impact.is_empty() {
            println!("SENTIMENT IMPACT:");
            println!("{}", "-".repeat(30));
            for row in impact {
                println!(
                    "{}: avg_daily_return={} return_std={} article_count={} return_per_article={}",
                    row.label,
                    fmt_opt(row.avg_daily_return),
                    fmt_opt(row.return_std),
                    row.article_count,
                    fmt_opt(row.return_per_article),
                );
            }
        }
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "n/a".to_string(),
    }
}
