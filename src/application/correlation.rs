//! Alignment and correlation statistics between daily sentiment and price
//! behavior.
//!
//! All statistics degrade per metric: a series with fewer than two valid
//! paired observations yields no result, and a lag entry exists only when
//! the cleaned sample is longer than the lag.

use crate::domain::types::{
    CorrelationResult, DailySentiment, EnrichedBar, SentimentImpact, SentimentLabel,
};
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use tracing::debug;

/// Lags (in days) tested for a sentiment-leads-price relationship.
const LAGS: [usize; 4] = [1, 2, 3, 5];

pub struct CorrelationAnalysis;

impl CorrelationAnalysis {
    /// Restrict both series to their common dates, in date order. The
    /// output length never exceeds the shorter input.
    pub fn align(
        sentiment: &[DailySentiment],
        prices: &[EnrichedBar],
    ) -> (Vec<DailySentiment>, Vec<EnrichedBar>) {
        let sentiment_by_date: BTreeMap<NaiveDate, &DailySentiment> =
            sentiment.iter().map(|row| (row.date, row)).collect();
        let prices_by_date: BTreeMap<NaiveDate, &EnrichedBar> =
            prices.iter().map(|row| (row.date, row)).collect();

        let common: BTreeSet<NaiveDate> = sentiment_by_date
            .keys()
            .filter(|date| prices_by_date.contains_key(date))
            .copied()
            .collect();

        let aligned_sentiment = common
            .iter()
            .map(|date| sentiment_by_date[date].clone())
            .collect();
        let aligned_prices = common
            .iter()
            .map(|date| prices_by_date[date].clone())
            .collect();
        (aligned_sentiment, aligned_prices)
    }

    /// Pearson/Spearman correlations with two-sided p-values, plus lagged
    /// Pearson coefficients. `None` when fewer than 2 valid pairs remain
    /// after dropping indexes where either side is undefined.
    pub fn correlate(a: &[Option<f64>], b: &[Option<f64>]) -> Option<CorrelationResult> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = a
            .iter()
            .zip(b.iter())
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip();

        let n = xs.len();
        if n < 2 {
            debug!("correlate: only {} valid pairs, skipping", n);
            return None;
        }

        let (pearson_r, pearson_p) = Self::pearson(&xs, &ys);
        let (spearman_rho, spearman_p) = Self::pearson(&Self::ranks(&xs), &Self::ranks(&ys));

        let mut lagged = BTreeMap::new();
        for lag in LAGS {
            if n > lag {
                let (r, _) = Self::pearson(&xs[..n - lag], &ys[lag..]);
                lagged.insert(lag, r);
            }
        }

        Some(CorrelationResult {
            pearson_r,
            pearson_p,
            spearman_rho,
            spearman_p,
            sample_size: n,
            lagged,
        })
    }

    /// Per-label return aggregation over article-level merged rows. Output
    /// is ordered negative/neutral/positive; labels with no rows are
    /// omitted. Counts include rows whose return is undefined, but the
    /// mean/std only use present returns.
    pub fn sentiment_impact(
        rows: &[(SentimentLabel, Option<f64>)],
    ) -> Vec<SentimentImpact> {
        let mut grouped: BTreeMap<SentimentLabel, Vec<Option<f64>>> = BTreeMap::new();
        for (label, ret) in rows {
            grouped.entry(*label).or_default().push(*ret);
        }

        grouped
            .into_iter()
            .map(|(label, returns)| {
                let count = returns.len();
                let present: Vec<f64> = returns.into_iter().flatten().collect();

                let avg = (!present.is_empty())
                    .then(|| present.iter().sum::<f64>() / present.len() as f64);
                let std = (present.len() > 1).then(|| {
                    let mean = avg.unwrap_or(0.0);
                    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                        / (present.len() as f64 - 1.0);
                    var.sqrt()
                });

                SentimentImpact {
                    label,
                    avg_daily_return: avg,
                    return_std: std,
                    article_count: count,
                    return_per_article: avg.map(|a| a * count as f64),
                }
            })
            .collect()
    }

    /// Run `correlate` between daily average sentiment and each price
    /// metric. Volume and RSI analyses run only when the aligned rows
    /// actually carry those columns.
    pub fn full_analysis(
        sentiment: &[DailySentiment],
        prices: &[EnrichedBar],
    ) -> Vec<(String, Option<CorrelationResult>)> {
        let (sentiment, prices) = Self::align(sentiment, prices);
        let avg_sentiment: Vec<Option<f64>> =
            sentiment.iter().map(|row| Some(row.avg_sentiment)).collect();

        let mut results = Vec::new();
        results.push((
            "sentiment_vs_returns".to_string(),
            Self::correlate(
                &avg_sentiment,
                &prices.iter().map(|r| r.daily_return).collect::<Vec<_>>(),
            ),
        ));
        results.push((
            "sentiment_vs_volatility".to_string(),
            Self::correlate(
                &avg_sentiment,
                &prices.iter().map(|r| r.volatility_20).collect::<Vec<_>>(),
            ),
        ));

        if prices.iter().any(|r| r.volume.is_some()) {
            results.push((
                "sentiment_vs_volume".to_string(),
                Self::correlate(
                    &avg_sentiment,
                    &prices.iter().map(|r| r.volume).collect::<Vec<_>>(),
                ),
            ));
        }
        if prices.iter().any(|r| r.rsi_14.is_some()) {
            results.push((
                "sentiment_vs_rsi".to_string(),
                Self::correlate(
                    &avg_sentiment,
                    &prices.iter().map(|r| r.rsi_14).collect::<Vec<_>>(),
                ),
            ));
        }

        results
    }

    /// Render results as a text report. P-values carry significance
    /// markers: *** below 0.001, ** below 0.01, * below 0.05.
    pub fn report(results: &[(String, Option<CorrelationResult>)]) -> String {
        let mut out = String::new();
        out.push_str("CORRELATION ANALYSIS REPORT\n");
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");

        for (name, result) in results {
            let _ = writeln!(out, "{}:", name.to_uppercase().replace('_', " "));
            out.push_str(&"-".repeat(30));
            out.push('\n');

            match result {
                Some(stats) => {
                    let _ = writeln!(out, "pearson_correlation: {:.4}", stats.pearson_r);
                    let _ = writeln!(
                        out,
                        "pearson_p_value: {:.4} {}",
                        stats.pearson_p,
                        Self::significance(stats.pearson_p)
                    );
                    let _ = writeln!(out, "spearman_correlation: {:.4}", stats.spearman_rho);
                    let _ = writeln!(
                        out,
                        "spearman_p_value: {:.4} {}",
                        stats.spearman_p,
                        Self::significance(stats.spearman_p)
                    );
                    let _ = writeln!(out, "sample_size: {}", stats.sample_size);
                    for (lag, r) in &stats.lagged {
                        let _ = writeln!(out, "pearson_lag_{}: {:.4}", lag, r);
                    }
                }
                None => out.push_str("insufficient data\n"),
            }
            out.push('\n');
        }

        out
    }

    fn significance(p: f64) -> &'static str {
        if p < 0.001 {
            "***"
        } else if p < 0.01 {
            "**"
        } else if p < 0.05 {
            "*"
        } else {
            ""
        }
    }

    /// Pearson r with a two-sided p-value from the t approximation.
    /// Degenerate inputs (zero variance) yield (0, 1).
    fn pearson(xs: &[f64], ys: &[f64]) -> (f64, f64) {
        let n = xs.len();
        let mean_x = xs.iter().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;

        let mut numer = 0.0;
        let mut denom_x = 0.0;
        let mut denom_y = 0.0;
        for i in 0..n {
            let dx = xs[i] - mean_x;
            let dy = ys[i] - mean_y;
            numer += dx * dy;
            denom_x += dx * dx;
            denom_y += dy * dy;
        }

        if denom_x == 0.0 || denom_y == 0.0 {
            return (0.0, 1.0);
        }

        let r = (numer / (denom_x.sqrt() * denom_y.sqrt())).clamp(-1.0, 1.0);
        (r, Self::two_sided_p(r, n))
    }

    fn two_sided_p(r: f64, n: usize) -> f64 {
        if n <= 2 {
            return 1.0;
        }
        let residual = 1.0 - r * r;
        if residual <= f64::EPSILON {
            return 0.0;
        }
        let t = r * ((n as f64 - 2.0) / residual).sqrt();
        match StudentsT::new(0.0, 1.0, n as f64 - 2.0) {
            Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
            Err(_) => 1.0,
        }
    }

    /// Average ranks (1-based); ties share the mean of their rank span.
    fn ranks(values: &[f64]) -> Vec<f64> {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

        let mut ranks = vec![0.0; values.len()];
        let mut i = 0;
        while i < order.len() {
            let mut j = i;
            while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
                j += 1;
            }
            // Positions i..=j hold equal values; all get the average rank.
            let avg_rank = (i + j) as f64 / 2.0 + 1.0;
            for k in i..=j {
                ranks[order[k]] = avg_rank;
            }
            i = j + 1;
        }
        ranks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn daily(day: u32, score: f64) -> DailySentiment {
        DailySentiment {
            date: date(day),
            avg_sentiment: score,
            sentiment_std: None,
            article_count: 1,
            avg_polarity: score,
            avg_compound: score,
            dominant_label: SentimentLabel::Neutral,
        }
    }

    fn bar(day: u32, daily_return: Option<f64>) -> EnrichedBar {
        EnrichedBar {
            date: date(day),
            close: 100.0,
            daily_return,
            ..EnrichedBar::default()
        }
    }

    fn wrap(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_align_never_grows_cardinality() {
        let sentiment: Vec<_> = [1, 2, 3, 5].iter().map(|d| daily(*d, 0.1)).collect();
        let prices: Vec<_> = [2, 3, 4].iter().map(|d| bar(*d, Some(0.01))).collect();

        let (s, p) = CorrelationAnalysis::align(&sentiment, &prices);
        assert_eq!(s.len(), p.len());
        assert!(s.len() <= sentiment.len().min(prices.len()));
        assert_eq!(
            s.iter().map(|r| r.date).collect::<Vec<_>>(),
            vec![date(2), date(3)]
        );
        for (a, b) in s.iter().zip(p.iter()) {
            assert_eq!(a.date, b.date);
        }
    }

    #[test]
    fn test_align_empty_intersection() {
        let sentiment = vec![daily(1, 0.2)];
        let prices = vec![bar(9, None)];
        let (s, p) = CorrelationAnalysis::align(&sentiment, &prices);
        assert!(s.is_empty());
        assert!(p.is_empty());
    }

    #[test]
    fn test_correlate_requires_two_valid_pairs() {
        assert!(CorrelationAnalysis::correlate(&[], &[]).is_none());
        assert!(CorrelationAnalysis::correlate(&[Some(1.0)], &[Some(2.0)]).is_none());
        // NaN-style gaps knock out pairs before the count check.
        assert!(
            CorrelationAnalysis::correlate(
                &[Some(1.0), None, Some(3.0)],
                &[Some(2.0), Some(4.0), None],
            )
            .is_none()
        );
    }

    #[test]
    fn test_correlate_perfect_linear_relationship() {
        let xs = wrap(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let ys = wrap(&[3.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0, 17.0]);

        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();
        assert!((stats.pearson_r - 1.0).abs() < 1e-9);
        assert!(stats.pearson_p < 1e-6);
        assert!((stats.spearman_rho - 1.0).abs() < 1e-9);
        assert_eq!(stats.sample_size, 8);
    }

    #[test]
    fn test_correlate_anticorrelated() {
        let xs = wrap(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ys = wrap(&[10.0, 8.0, 6.0, 4.0, 2.0]);
        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();
        assert!((stats.pearson_r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_spearman_captures_monotonic_nonlinear() {
        let xs = wrap(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let ys = wrap(&[1.0, 8.0, 27.0, 64.0, 125.0, 216.0]);
        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();
        assert!((stats.spearman_rho - 1.0).abs() < 1e-9);
        assert!(stats.pearson_r < 1.0);
    }

    #[test]
    fn test_lag_entries_exist_iff_sample_exceeds_lag() {
        let xs = wrap(&[1.0, 2.0, 3.0, 4.0]);
        let ys = wrap(&[2.0, 4.0, 6.0, 8.0]);
        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();

        // n = 4: lags 1-3 computable, lag 5 is not.
        assert!(stats.lagged.contains_key(&1));
        assert!(stats.lagged.contains_key(&2));
        assert!(stats.lagged.contains_key(&3));
        assert!(!stats.lagged.contains_key(&5));
    }

    #[test]
    fn test_lagged_correlation_shifts_series() {
        // ys is xs shifted forward by one step: lag-1 should be perfect.
        let xs = wrap(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let ys = wrap(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();
        assert!((stats.lagged[&1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlate_constant_series_is_degenerate() {
        let xs = wrap(&[1.0, 1.0, 1.0, 1.0]);
        let ys = wrap(&[2.0, 3.0, 4.0, 5.0]);
        let stats = CorrelationAnalysis::correlate(&xs, &ys).unwrap();
        assert_eq!(stats.pearson_r, 0.0);
        assert_eq!(stats.pearson_p, 1.0);
    }

    #[test]
    fn test_ranks_average_ties() {
        let ranks = CorrelationAnalysis::ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_sentiment_impact_grouping() {
        let rows = vec![
            (SentimentLabel::Positive, Some(0.02)),
            (SentimentLabel::Positive, Some(0.04)),
            (SentimentLabel::Negative, Some(-0.01)),
            (SentimentLabel::Positive, None),
        ];

        let impact = CorrelationAnalysis::sentiment_impact(&rows);
        assert_eq!(impact.len(), 2);

        // Ordered negative first, positive last; neutral absent.
        assert_eq!(impact[0].label, SentimentLabel::Negative);
        assert_eq!(impact[0].article_count, 1);
        assert_eq!(impact[0].return_std, None);

        let positive = &impact[1];
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert_eq!(positive.article_count, 3);
        assert!((positive.avg_daily_return.unwrap() - 0.03).abs() < 1e-12);
        // return_per_article counts every row, including the undefined one.
        assert!((positive.return_per_article.unwrap() - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_full_analysis_skips_missing_columns() {
        let sentiment: Vec<_> = (1..=6).map(|d| daily(d, 0.1 * d as f64)).collect();
        let prices: Vec<_> = (1..=6)
            .map(|d| bar(d, Some(0.01 * d as f64)))
            .collect();

        let results = CorrelationAnalysis::full_analysis(&sentiment, &prices);
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();

        // Fixture bars carry neither volume nor RSI.
        assert_eq!(names, vec!["sentiment_vs_returns", "sentiment_vs_volatility"]);
        assert!(results[0].1.is_some());
        // Volatility column is entirely absent: not computable, not an error.
        assert!(results[1].1.is_none());
    }

    #[test]
    fn test_report_formatting_and_significance() {
        let sentiment: Vec<_> = (1..=10).map(|d| daily(d, 0.1 * d as f64)).collect();
        let prices: Vec<_> = (1..=10)
            .map(|d| bar(d, Some(0.01 * d as f64)))
            .collect();

        let results = CorrelationAnalysis::full_analysis(&sentiment, &prices);
        let report = CorrelationAnalysis::report(&results);

        assert!(report.starts_with("CORRELATION ANALYSIS REPORT"));
        assert!(report.contains("SENTIMENT VS RETURNS:"));
        assert!(report.contains("pearson_correlation: 1.0000"));
        // Perfect linear fit: p-value significant at the *** level.
        assert!(report.contains("***"));
        assert!(report.contains("sample_size: 10"));
        assert!(report.contains("pearson_lag_1:"));
        assert!(report.contains("SENTIMENT VS VOLATILITY:"));
        assert!(report.contains("insufficient data"));
    }
}
