//! Average True Range with Wilder's smoothing.
//!
//! TR[0] = high - low; TR[i] = true_range(prev close). The first valid value
//! is the mean of the first n true ranges, then ATR = (prev*(n-1) + TR) / n.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if bars.len() < period || period == 0 {
        return IndicatorSeries::empty(IndicatorType::Atr(period));
    }

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;
    let mut seed = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.range()
        } else {
            bar.true_range(bars[i - 1].close)
        };

        let valid = if i < period - 1 {
            seed += tr;
            false
        } else if i == period - 1 {
            atr = (seed + tr) / period as f64;
            true
        } else {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
            true
        };

        results.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: if valid { atr } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_bar(i: i64, high: f64, low: f64, close: f64) -> OhlcvBar {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        OhlcvBar::new(start + Duration::minutes(5 * i), close, high, low, close, 1000.0)
    }

    #[test]
    fn atr_constant_range() {
        let bars: Vec<OhlcvBar> = (0..5).map(|i| make_bar(i, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);
        assert!(!series.values[1].valid);
        assert!((series.values[2].value - 20.0).abs() < f64::EPSILON);
        assert!((series.last().unwrap() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn atr_wilder_step_uses_true_range() {
        let bars = vec![
            make_bar(0, 110.0, 90.0, 100.0),
            make_bar(1, 110.0, 90.0, 100.0),
            // gap up: TR = max(10, |140-100|, |130-100|) = 40
            make_bar(2, 140.0, 130.0, 135.0),
        ];
        let series = calculate_atr(&bars, 2);
        // seed (20 + 20) / 2 = 20, then (20 + 40) / 2 = 30
        assert!((series.values[1].value - 20.0).abs() < f64::EPSILON);
        assert!((series.values[2].value - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn atr_insufficient_bars_empty() {
        let bars: Vec<OhlcvBar> = (0..2).map(|i| make_bar(i, 2.0, 1.0, 1.5)).collect();
        assert!(calculate_atr(&bars, 14).values.is_empty());
    }
}
