//! Liquidity sweep detection.
//!
//! A bar sweeps when it trades through the extreme of the preceding `L`
//! bars, closes back inside, and leaves a rejection wick of at least
//! `min_wick_ratio` of its range.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Timelike, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepFact {
    pub direction: Direction,
    /// The swept extreme: lookback low for a bullish sweep, high for bearish.
    pub level: f64,
    pub origin: Timeframe,
    pub wick_ratio: f64,
    pub timestamp: DateTime<Utc>,
    /// 0 when the sweep is the latest bar.
    pub bars_ago: usize,
}

/// Lookback length by hour of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookbackSchedule {
    /// 13:00-21:59
    pub primary: usize,
    /// 07:00-12:59
    pub secondary: usize,
    pub off_hours: usize,
}

impl Default for LookbackSchedule {
    fn default() -> Self {
        Self {
            primary: 50,
            secondary: 35,
            off_hours: 21,
        }
    }
}

impl LookbackSchedule {
    pub fn for_hour(&self, hour: u32) -> usize {
        match hour {
            13..=21 => self.primary,
            7..=12 => self.secondary,
            _ => self.off_hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepDetector {
    pub min_wick_ratio: f64,
    pub lookbacks: LookbackSchedule,
    /// Bars scanned for a delayed sweep that still holds.
    pub recent_window: usize,
}

impl Default for SweepDetector {
    fn default() -> Self {
        Self {
            min_wick_ratio: 0.60,
            lookbacks: LookbackSchedule::default(),
            recent_window: 20,
        }
    }
}

impl SweepDetector {
    /// Lookback for the last bar in `bars`, unless `pinned`.
    pub fn lookback_for(&self, bars: &[OhlcvBar], pinned: Option<usize>) -> Option<usize> {
        let last = bars.last()?;
        Some(pinned.unwrap_or_else(|| self.lookbacks.for_hour(last.timestamp.hour())))
    }

    /// Sweep on the last bar of `bars` against the `lookback` bars before it.
    pub fn detect(&self, bars: &[OhlcvBar], lookback: usize, origin: Timeframe) -> Option<SweepFact> {
        if lookback == 0 || bars.len() < lookback + 1 {
            return None;
        }
        let current = bars[bars.len() - 1];
        let range = current.range();
        if range <= 0.0 {
            return None;
        }

        let window = &bars[bars.len() - 1 - lookback..bars.len() - 1];
        let lookback_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let lookback_high = window
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);

        let fact = |direction, level, wick_ratio| SweepFact {
            direction,
            level,
            origin,
            wick_ratio,
            timestamp: current.timestamp,
            bars_ago: 0,
        };

        let lower_ratio = current.lower_wick() / range;
        if current.low < lookback_low
            && current.close > lookback_low
            && lower_ratio >= self.min_wick_ratio
        {
            return Some(fact(Direction::Long, lookback_low, lower_ratio));
        }

        let upper_ratio = current.upper_wick() / range;
        if current.high > lookback_high
            && current.close < lookback_high
            && upper_ratio >= self.min_wick_ratio
        {
            return Some(fact(Direction::Short, lookback_high, upper_ratio));
        }

        None
    }

    /// Most recent sweep within the last `recent_window` bars whose level has
    /// held on every close since.
    pub fn detect_recent(
        &self,
        bars: &[OhlcvBar],
        lookback: usize,
        origin: Timeframe,
    ) -> Option<SweepFact> {
        for bars_ago in 0..self.recent_window.min(bars.len()) {
            let end = bars.len() - bars_ago;
            let Some(sweep) = self.detect(&bars[..end], lookback, origin) else {
                continue;
            };
            let held = bars[end..].iter().all(|b| match sweep.direction {
                Direction::Long => b.close > sweep.level,
                Direction::Short => b.close < sweep.level,
            });
            if held {
                return Some(SweepFact { bars_ago, ..sweep });
            }
        }
        None
    }
}
