//! Higher-timeframe context: narrative trend, institutional levels and
//! macro bias.

use crate::domain::indicator::ema::calculate_ema;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFact {
    pub direction: Direction,
    pub close: f64,
    pub ema: f64,
    /// (close - ema) / ema
    pub distance: f64,
    /// Percent change of the EMA over its last three values.
    pub slope_pct: f64,
}

/// Trend of the latest close relative to EMA(`period`).
pub fn trend(bars: &[OhlcvBar], period: usize) -> Option<TrendFact> {
    let ema = calculate_ema(bars, period);
    let last_ema = ema.last()?;
    let close = bars.last()?.close;
    if last_ema == 0.0 {
        return None;
    }

    let slope_pct = match ema.from_end(2) {
        Some(start) if start != 0.0 => (last_ema - start) / start * 100.0,
        _ => 0.0,
    };

    Some(TrendFact {
        direction: if close > last_ema {
            Direction::Long
        } else {
            Direction::Short
        },
        close,
        ema: last_ema,
        distance: (close - last_ema) / last_ema,
        slope_pct,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct H4Levels {
    pub prev_high: f64,
    pub prev_low: f64,
}

/// High and low of the last H4 bar that had closed by `as_of`.
pub fn previous_h4_levels(h4: &[OhlcvBar], as_of: DateTime<Utc>) -> Option<H4Levels> {
    let span = Timeframe::H4.duration();
    h4.iter()
        .rev()
        .find(|b| b.timestamp + span <= as_of)
        .map(|b| H4Levels {
            prev_high: b.high,
            prev_low: b.low,
        })
}

/// `bar` swept the previous H4 extreme on the side a `direction` setup needs.
pub fn htf_sweep(bar: &OhlcvBar, levels: &H4Levels, direction: Direction) -> bool {
    match direction {
        Direction::Long => bar.low < levels.prev_low && bar.close > levels.prev_low,
        Direction::Short => bar.high > levels.prev_high && bar.close < levels.prev_high,
    }
}

/// Daily close versus EMA(`period`). `None` without enough history.
pub fn macro_bias(d1: &[OhlcvBar], period: usize) -> Option<Direction> {
    let ema = calculate_ema(d1, period).last()?;
    let close = d1.last()?.close;
    if close > ema {
        Some(Direction::Long)
    } else if close < ema {
        Some(Direction::Short)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn closes(values: &[f64], step: Duration) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar::new(start + step * i as i32, c, c + 0.5, c - 0.5, c, 1.0))
            .collect()
    }

    #[test]
    fn rising_closes_trend_long() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let t = trend(&closes(&values, Duration::hours(1)), 3).unwrap();
        assert_eq!(t.direction, Direction::Long);
        assert!(t.distance > 0.0);
        assert!(t.slope_pct > 0.0);
    }

    #[test]
    fn distance_is_relative_to_ema() {
        let mut values = vec![100.0; 5];
        values.push(101.0);
        // EMA(1) tracks close exactly, so distance is zero and direction short
        let t = trend(&closes(&values, Duration::hours(1)), 1).unwrap();
        assert!(t.distance.abs() < f64::EPSILON);
        assert_eq!(t.direction, Direction::Short);
    }

    #[test]
    fn trend_needs_warmup() {
        assert!(trend(&closes(&[1.0, 2.0], Duration::hours(1)), 100).is_none());
    }

    #[test]
    fn previous_h4_bar_is_last_closed() {
        let bars = closes(&[10.0, 20.0, 30.0], Duration::hours(4));
        let as_of = bars[2].timestamp + Duration::hours(1);
        let levels = previous_h4_levels(&bars, as_of).unwrap();
        assert!((levels.prev_high - 20.5).abs() < f64::EPSILON);
        assert!((levels.prev_low - 19.5).abs() < f64::EPSILON);
    }

    #[test]
    fn htf_sweep_requires_close_back_inside() {
        let levels = H4Levels {
            prev_high: 1.2,
            prev_low: 1.0,
        };
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let reclaim = OhlcvBar::new(ts, 1.05, 1.06, 0.99, 1.04, 1.0);
        let breakdown = OhlcvBar::new(ts, 1.05, 1.06, 0.98, 0.99, 1.0);
        assert!(htf_sweep(&reclaim, &levels, Direction::Long));
        assert!(!htf_sweep(&breakdown, &levels, Direction::Long));
        assert!(!htf_sweep(&reclaim, &levels, Direction::Short));
    }

    #[test]
    fn macro_bias_follows_daily_ema() {
        let up: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 0.01).collect();
        assert_eq!(macro_bias(&closes(&up, Duration::days(1)), 20), Some(Direction::Long));
        assert_eq!(macro_bias(&closes(&up[..5], Duration::days(1)), 20), None);
    }
}
