//! Three-bar price imbalances (fair value gaps).

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// Long for a bullish gap (bar3.low > bar1.high), short for bearish.
    pub direction: Direction,
    pub bottom: f64,
    pub top: f64,
    /// Timestamp of the middle bar.
    pub timestamp: DateTime<Utc>,
}

impl Gap {
    /// Whether `price` sits inside the band, widened by `tolerance` (a
    /// fraction of price) on both edges.
    pub fn contains(&self, price: f64, tolerance: f64) -> bool {
        price <= self.top * (1.0 + tolerance) && price >= self.bottom * (1.0 - tolerance)
    }
}

/// Gaps among the last `sequences` three-bar sequences, oldest first.
pub fn detect_gaps(bars: &[OhlcvBar], sequences: usize) -> Vec<Gap> {
    if bars.len() < 3 {
        return Vec::new();
    }
    let start = bars.len().saturating_sub(sequences + 2);
    bars[start..]
        .windows(3)
        .filter_map(|w| {
            let (first, middle, third) = (w[0], w[1], w[2]);
            if third.low > first.high {
                Some(Gap {
                    direction: Direction::Long,
                    bottom: first.high,
                    top: third.low,
                    timestamp: middle.timestamp,
                })
            } else if third.high < first.low {
                Some(Gap {
                    direction: Direction::Short,
                    bottom: third.high,
                    top: first.low,
                    timestamp: middle.timestamp,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Whether `price` is inside any gap matching `direction`.
pub fn price_in_gap(price: f64, gaps: &[Gap], direction: Direction, tolerance: f64) -> bool {
    gaps.iter()
        .any(|g| g.direction == direction && g.contains(price, tolerance))
}
