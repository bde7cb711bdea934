//! Derived indicator columns over a daily price series.
//!
//! Each `calculate_*` method fills its own columns on a mutable row slice,
//! so callers can apply any subset; `calculate_all_indicators` runs the
//! full fixed pipeline. Indicator state machines come from the `ta` crate,
//! driven per bar via `Next`; outputs are gated to `None` until the rolling
//! window is actually filled, so leading rows stay "not available" instead
//! of carrying partially-warmed values.

use crate::domain::types::{EnrichedBar, PriceBar};
use statrs::statistics::{Data, Distribution};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage,
    MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::{DataItem, Next};

const SMA_PERIODS: [usize; 3] = [20, 50, 200];
const EMA_FAST: usize = 12;
const EMA_SLOW: usize = 26;
const RSI_PERIOD: usize = 14;
const MACD_SIGNAL: usize = 9;
const BB_PERIOD: usize = 20;
const BB_MULTIPLIER: f64 = 2.0;
const VOLATILITY_WINDOW: usize = 20;
const ATR_PERIOD: usize = 14;

pub struct TechnicalIndicators;

impl TechnicalIndicators {
    /// Copy raw bars into enriched rows with every indicator column unset.
    pub fn enrich(bars: &[PriceBar]) -> Vec<EnrichedBar> {
        bars.iter().map(EnrichedBar::from_bar).collect()
    }

    /// Daily return (close over previous close) and the running cumulative
    /// return. Both are undefined at the first observation.
    pub fn calculate_returns(rows: &mut [EnrichedBar]) {
        let mut cumulative = 0.0;
        for i in 0..rows.len() {
            if i == 0 {
                rows[i].daily_return = None;
                rows[i].cumulative_return = None;
                continue;
            }
            let prev = rows[i - 1].close;
            if prev > 0.0 {
                let ret = rows[i].close / prev - 1.0;
                cumulative = (1.0 + cumulative) * (1.0 + ret) - 1.0;
                rows[i].daily_return = Some(ret);
                rows[i].cumulative_return = Some(cumulative);
            } else {
                rows[i].daily_return = None;
                rows[i].cumulative_return = None;
            }
        }
    }

    /// SMA(20/50/200) and EMA(12/26) of the close.
    pub fn calculate_moving_averages(rows: &mut [EnrichedBar]) {
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();

        for period in SMA_PERIODS {
            let column = Self::sma_column(&closes, period);
            for (row, value) in rows.iter_mut().zip(column) {
                match period {
                    20 => row.sma_20 = value,
                    50 => row.sma_50 = value,
                    _ => row.sma_200 = value,
                }
            }
        }

        let fast = Self::ema_column(&closes, EMA_FAST);
        let slow = Self::ema_column(&closes, EMA_SLOW);
        for (i, row) in rows.iter_mut().enumerate() {
            row.ema_12 = fast[i];
            row.ema_26 = slow[i];
        }
    }

    /// RSI(14), undefined for the first 14 observations.
    pub fn calculate_rsi(rows: &mut [EnrichedBar]) {
        let mut rsi = RelativeStrengthIndex::new(RSI_PERIOD).unwrap();
        for (i, row) in rows.iter_mut().enumerate() {
            let value = rsi.next(row.close);
            row.rsi_14 = (i >= RSI_PERIOD).then_some(value);
        }
    }

    /// MACD(12, 26, 9): line, signal, histogram. The line needs the slow
    /// EMA warmed up; signal and histogram additionally need 9 line values.
    pub fn calculate_macd(rows: &mut [EnrichedBar]) {
        let mut macd =
            MovingAverageConvergenceDivergence::new(EMA_FAST, EMA_SLOW, MACD_SIGNAL).unwrap();
        let line_start = EMA_SLOW - 1;
        let signal_start = EMA_SLOW + MACD_SIGNAL - 2;

        for (i, row) in rows.iter_mut().enumerate() {
            let out = macd.next(row.close);
            row.macd = (i >= line_start).then_some(out.macd);
            row.macd_signal = (i >= signal_start).then_some(out.signal);
            row.macd_hist = (i >= signal_start).then_some(out.histogram);
        }
    }

    /// Bollinger Bands(20, 2σ) plus relative band width.
    pub fn calculate_bollinger_bands(rows: &mut [EnrichedBar]) {
        let mut bb = BollingerBands::new(BB_PERIOD, BB_MULTIPLIER).unwrap();
        for (i, row) in rows.iter_mut().enumerate() {
            let out = bb.next(row.close);
            if i + 1 >= BB_PERIOD {
                row.bb_upper = Some(out.upper);
                row.bb_middle = Some(out.average);
                row.bb_lower = Some(out.lower);
                if out.average != 0.0 {
                    row.bb_width = Some((out.upper - out.lower) / out.average);
                }
            }
        }
    }

    /// Rolling 20-day sample std of daily returns, and ATR(14).
    pub fn calculate_volatility(rows: &mut [EnrichedBar]) {
        let returns: Vec<Option<f64>> = rows.iter().map(|r| r.daily_return).collect();
        for i in 0..rows.len() {
            if i + 1 <= VOLATILITY_WINDOW {
                continue;
            }
            let window: Vec<f64> = returns[i + 1 - VOLATILITY_WINDOW..=i]
                .iter()
                .flatten()
                .copied()
                .collect();
            if window.len() == VOLATILITY_WINDOW {
                rows[i].volatility_20 = Data::new(window).std_dev();
            }
        }

        let mut atr = AverageTrueRange::new(ATR_PERIOD).unwrap();
        for (i, row) in rows.iter_mut().enumerate() {
            let item = DataItem::builder()
                .open(row.open)
                .high(row.high)
                .low(row.low)
                .close(row.close)
                .volume(row.volume.unwrap_or(0.0))
                .build();
            if let Ok(item) = item {
                let value = atr.next(&item);
                row.atr_14 = (i >= ATR_PERIOD).then_some(value);
            }
        }
    }

    /// Price-vs-SMA20 and SMA20-vs-SMA50, both in percent.
    pub fn calculate_ratio_indicators(rows: &mut [EnrichedBar]) {
        for row in rows.iter_mut() {
            if let Some(sma_20) = row.sma_20 {
                if sma_20 != 0.0 {
                    row.price_vs_sma_20 = Some((row.close / sma_20 - 1.0) * 100.0);
                }
                if let Some(sma_50) = row.sma_50 {
                    if sma_50 != 0.0 {
                        row.sma_20_vs_sma_50 = Some((sma_20 / sma_50 - 1.0) * 100.0);
                    }
                }
            }
        }
    }

    /// The full fixed pipeline, in order.
    pub fn calculate_all_indicators(bars: &[PriceBar]) -> Vec<EnrichedBar> {
        let mut rows = Self::enrich(bars);
        Self::calculate_returns(&mut rows);
        Self::calculate_moving_averages(&mut rows);
        Self::calculate_rsi(&mut rows);
        Self::calculate_macd(&mut rows);
        Self::calculate_bollinger_bands(&mut rows);
        Self::calculate_volatility(&mut rows);
        Self::calculate_ratio_indicators(&mut rows);
        rows
    }

    fn sma_column(closes: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut sma = SimpleMovingAverage::new(period).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let value = sma.next(*close);
                (i + 1 >= period).then_some(value)
            })
            .collect()
    }

    fn ema_column(closes: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut ema = ExponentialMovingAverage::new(period).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let value = ema.next(*close);
                (i + 1 >= period).then_some(value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| PriceBar {
                date: start + chrono::Days::new(i as u64),
                open: *close,
                high: close * 1.01,
                low: close * 0.99,
                close: *close,
                volume: Some(1_000_000.0),
            })
            .collect()
    }

    #[test]
    fn test_returns_undefined_at_first_observation() {
        let bars = bars_from_closes(&[100.0, 110.0, 99.0]);
        let mut rows = TechnicalIndicators::enrich(&bars);
        TechnicalIndicators::calculate_returns(&mut rows);

        assert_eq!(rows[0].daily_return, None);
        assert!((rows[1].daily_return.unwrap() - 0.10).abs() < 1e-12);
        assert!((rows[2].daily_return.unwrap() - (-0.10)).abs() < 1e-12);
        // Cumulative: 1.10 * 0.90 - 1 = -0.01
        assert!((rows[2].cumulative_return.unwrap() - (-0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_sma_warm_up_gap() {
        let bars = bars_from_closes(&vec![50.0; 30]);
        let mut rows = TechnicalIndicators::enrich(&bars);
        TechnicalIndicators::calculate_moving_averages(&mut rows);

        assert_eq!(rows[18].sma_20, None);
        assert!(rows[19].sma_20.is_some());
        assert_eq!(rows[29].sma_50, None);
        assert_eq!(rows[29].sma_200, None);
    }

    #[test]
    fn test_sma_equals_price_on_constant_series() {
        let bars = bars_from_closes(&vec![42.0; 25]);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);
        assert!((rows[24].sma_20.unwrap() - 42.0).abs() < 1e-9);
        assert!((rows[24].ema_12.unwrap() - 42.0).abs() < 1e-6);
    }

    #[test]
    fn test_rsi_converges_to_100_on_steady_gains() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        assert_eq!(rows[13].rsi_14, None);
        let rsi = rows[59].rsi_14.unwrap();
        assert!(rsi > 99.0, "expected RSI near 100, got {rsi}");
        assert!(rsi <= 100.0);
    }

    #[test]
    fn test_macd_histogram_vanishes_on_linear_ramp() {
        let closes: Vec<f64> = (0..180).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        assert_eq!(rows[24].macd, None);
        assert!(rows[25].macd.is_some());
        assert_eq!(rows[32].macd_hist, None);
        assert!(rows[33].macd_hist.is_some());

        let hist = rows[179].macd_hist.unwrap();
        assert!(hist.abs() < 0.1, "expected converged histogram, got {hist}");
    }

    #[test]
    fn test_bollinger_bands_on_constant_series() {
        let bars = bars_from_closes(&vec![42.0; 30]);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        assert_eq!(rows[18].bb_middle, None);
        let row = &rows[29];
        assert!((row.bb_middle.unwrap() - 42.0).abs() < 1e-9);
        // Zero variance: bands collapse onto the middle.
        assert!((row.bb_upper.unwrap() - row.bb_lower.unwrap()).abs() < 1e-9);
        assert!(row.bb_width.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_volatility_window_gating() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 * (1.0 + 0.01 * ((i % 3) as f64 - 1.0)).powi(i as i32))
            .collect();
        let bars = bars_from_closes(&closes);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        // First full window of 20 returns ends at index 20.
        assert_eq!(rows[19].volatility_20, None);
        assert!(rows[20].volatility_20.is_some());
        assert!(rows[20].volatility_20.unwrap() >= 0.0);
    }

    #[test]
    fn test_atr_warm_up_and_positivity() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let bars = bars_from_closes(&closes);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        assert_eq!(rows[13].atr_14, None);
        assert!(rows[14].atr_14.is_some());
        assert!(rows[29].atr_14.unwrap() > 0.0);
    }

    #[test]
    fn test_ratio_indicators_need_their_inputs() {
        let bars = bars_from_closes(&vec![50.0; 60]);
        let rows = TechnicalIndicators::calculate_all_indicators(&bars);

        // price_vs_sma_20 appears with SMA20, sma_20_vs_sma_50 with SMA50.
        assert_eq!(rows[18].price_vs_sma_20, None);
        assert!(rows[19].price_vs_sma_20.is_some());
        assert_eq!(rows[48].sma_20_vs_sma_50, None);
        assert!(rows[49].sma_20_vs_sma_50.is_some());
        assert!(rows[59].price_vs_sma_20.unwrap().abs() < 1e-9);
        assert!(rows[59].sma_20_vs_sma_50.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_methods_are_composable_in_isolation() {
        let bars = bars_from_closes(&vec![10.0; 25]);
        let mut rows = TechnicalIndicators::enrich(&bars);
        TechnicalIndicators::calculate_rsi(&mut rows);

        // Only RSI touched; everything else stays unset.
        assert!(rows[24].rsi_14.is_some());
        assert_eq!(rows[24].sma_20, None);
        assert_eq!(rows[24].daily_return, None);
        assert_eq!(rows[24].macd, None);
    }
}
