//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries::empty(IndicatorType::Ema(period));
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = if i < period - 1 {
            sum += bar.close;
            false
        } else if i == period - 1 {
            sum += bar.close;
            ema = sum / period as f64;
            true
        } else {
            ema = bar.close * k + ema * (1.0 - k);
            true
        };
        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: if valid { ema } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                OhlcvBar::new(
                    start + Duration::hours(i as i64),
                    close,
                    close,
                    close,
                    close,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn ema_warmup() {
        let series = calculate_ema(&make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_seed_is_sma_then_recursive() {
        let series = calculate_ema(&make_bars(&[10.0, 20.0, 30.0, 40.0]), 3);
        let k = 2.0 / 4.0;
        let sma = 20.0;
        assert!((series.values[2].value - sma).abs() < f64::EPSILON);
        let next = 40.0 * k + sma * (1.0 - k);
        assert!((series.values[3].value - next).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&make_bars(&[100.0; 6]), 3);
        for point in &series.values[2..] {
            assert!((point.value - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_degenerate_inputs() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        assert!(calculate_ema(&make_bars(&[1.0, 2.0]), 0).values.is_empty());
    }

    #[test]
    fn ema_short_input_never_valid() {
        let series = calculate_ema(&make_bars(&[1.0, 2.0]), 5);
        assert_eq!(series.values.len(), 2);
        assert!(series.last().is_none());
    }
}
