//! Range / expansion phase classification (accumulation, manipulation,
//! distribution).
//!
//! Stateless: every call infers the phase from the bar window alone.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Accumulation,
    Manipulation,
    DistributionLong,
    DistributionShort,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Accumulation => "ACCUMULATION",
            Phase::Manipulation => "MANIPULATION",
            Phase::DistributionLong => "DISTRIBUTION_LONG",
            Phase::DistributionShort => "DISTRIBUTION_SHORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACCUMULATION" => Some(Phase::Accumulation),
            "MANIPULATION" => Some(Phase::Manipulation),
            "DISTRIBUTION_LONG" => Some(Phase::DistributionLong),
            "DISTRIBUTION_SHORT" => Some(Phase::DistributionShort),
            _ => None,
        }
    }

    pub fn alignment(self, direction: Direction) -> PhaseAlignment {
        match (self, direction) {
            (Phase::DistributionLong, Direction::Long)
            | (Phase::DistributionShort, Direction::Short) => PhaseAlignment::Confirms,
            (Phase::DistributionLong, Direction::Short)
            | (Phase::DistributionShort, Direction::Long) => PhaseAlignment::Opposes,
            (Phase::Manipulation, _) => PhaseAlignment::Manipulation,
            (Phase::Accumulation, _) => PhaseAlignment::Neutral,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAlignment {
    Confirms,
    Manipulation,
    Opposes,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseFact {
    pub phase: Phase,
    pub range_high: f64,
    pub range_low: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseClassifier {
    /// Consolidation window immediately before the recent window.
    pub range_bars: usize,
    pub recent_bars: usize,
}

impl Default for PhaseClassifier {
    fn default() -> Self {
        Self {
            range_bars: 24,
            recent_bars: 5,
        }
    }
}

impl PhaseClassifier {
    pub fn min_bars(&self) -> usize {
        self.range_bars + self.recent_bars
    }

    pub fn classify(&self, bars: &[OhlcvBar]) -> Option<PhaseFact> {
        if self.range_bars == 0 || self.recent_bars == 0 || bars.len() < self.min_bars() {
            return None;
        }
        let recent_start = bars.len() - self.recent_bars;
        let range = &bars[recent_start - self.range_bars..recent_start];
        let recent = &bars[recent_start..];

        let range_high = range.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range_low = range.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let recent_high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let recent_low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        let first_open = recent[0].open;
        let last_close = recent[recent.len() - 1].close;
        let net_move = last_close - first_open;

        let swept_low = recent_low < range_low && last_close > range_low;
        let swept_high = recent_high > range_high && last_close < range_high;

        let phase = if swept_low && last_close > range_high && net_move > 0.0 {
            Phase::DistributionLong
        } else if swept_high && last_close < range_low && net_move < 0.0 {
            Phase::DistributionShort
        } else if swept_low || swept_high {
            Phase::Manipulation
        } else {
            Phase::Accumulation
        };

        Some(PhaseFact {
            phase,
            range_high,
            range_low,
        })
    }
}
