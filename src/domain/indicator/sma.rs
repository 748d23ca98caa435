//! Simple Moving Average over closes, or over any value sequence.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;
use chrono::{DateTime, Utc};

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let points: Vec<(DateTime<Utc>, f64)> = bars.iter().map(|b| (b.timestamp, b.close)).collect();
    sma_of(&points, period)
}

/// SMA of an arbitrary timestamped sequence (e.g. an ATR series).
pub fn sma_of(points: &[(DateTime<Utc>, f64)], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries::empty(IndicatorType::Sma(period));
    }

    let mut values = Vec::with_capacity(points.len());
    let mut sum = 0.0;

    for (i, &(timestamp, value)) in points.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= points[i - period].1;
        }
        let valid = i + 1 >= period;
        values.push(IndicatorPoint {
            timestamp,
            valid,
            value: if valid { sum / period as f64 } else { 0.0 },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_bars(closes: &[f64]) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar::new(start + Duration::hours(i as i64), c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn sma_rolls_window() {
        let series = calculate_sma(&make_bars(&[1.0, 2.0, 3.0, 4.0]), 2);
        assert!(!series.values[0].valid);
        assert!((series.values[1].value - 1.5).abs() < f64::EPSILON);
        assert!((series.values[3].value - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_period_zero_is_empty() {
        assert!(calculate_sma(&make_bars(&[1.0]), 0).values.is_empty());
    }
}
