//! Rolling mean and population standard deviation of close.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_stddev(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Stddev(period));
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i + 1 >= period;
            let value = if valid {
                let (_, sd) = mean_and_stddev(&bars[i + 1 - period..=i]);
                sd
            } else {
                0.0
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}

/// Mean and population standard deviation of the closes in `window`.
pub fn mean_and_stddev(window: &[OhlcvBar]) -> (f64, f64) {
    if window.is_empty() {
        return (0.0, 0.0);
    }
    let n = window.len() as f64;
    let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
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
            .map(|(i, &c)| OhlcvBar::new(start + Duration::hours(i as i64), c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn stddev_constant_prices_is_zero() {
        let series = calculate_stddev(&make_bars(&[5.0; 4]), 3);
        assert!(series.last().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_known_population_value() {
        // 2,4,4,4,5,5,7,9 → mean 5, population sd 2
        let bars = make_bars(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let series = calculate_stddev(&bars, 8);
        assert!((series.last().unwrap() - 2.0).abs() < 1e-12);
        let (mean, sd) = mean_and_stddev(&bars);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stddev_warmup() {
        let series = calculate_stddev(&make_bars(&[1.0, 2.0, 3.0]), 3);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }
}
