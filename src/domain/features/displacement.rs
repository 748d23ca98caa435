//! Momentum displacement: a large-bodied bar closing in the trade direction.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;

pub const DEFAULT_MIN_BODY_RATIO: f64 = 0.60;

pub fn is_displacement(bar: &OhlcvBar, direction: Direction, min_body_ratio: f64) -> bool {
    let Some(ratio) = bar.body_ratio() else {
        return false;
    };
    let closes_with_direction = match direction {
        Direction::Long => bar.is_bullish(),
        Direction::Short => bar.is_bearish(),
    };
    ratio >= min_body_ratio && closes_with_direction
}

/// Displacement on the latest bar of `bars`.
pub fn displaced(bars: &[OhlcvBar], direction: Direction, min_body_ratio: f64) -> bool {
    bars.last()
        .is_some_and(|bar| is_displacement(bar, direction, min_body_ratio))
}
