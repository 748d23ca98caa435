//! Volatility expansion and pullback entry conditions on the entry timeframe.

use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::sma_of;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use chrono::{DateTime, Utc};

/// Tolerance around the fast EMA for a pullback touch, as a fraction of price.
const EMA_TOUCH_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumConfig {
    pub atr_period: usize,
    /// SMA length over the ATR series.
    pub atr_average: usize,
    pub rsi_period: usize,
    pub fast_ema: usize,
    /// RSI level a long pullback must cross back above.
    pub pullback_long: f64,
    /// RSI level a short pullback must cross back below.
    pub pullback_short: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_average: 50,
            rsi_period: 14,
            fast_ema: 20,
            pullback_long: 40.0,
            pullback_short: 60.0,
        }
    }
}

impl MomentumConfig {
    /// ATR on the last bar.
    pub fn latest_atr(&self, bars: &[OhlcvBar]) -> Option<f64> {
        calculate_atr(bars, self.atr_period)
            .last()
            .filter(|atr| atr.is_finite() && *atr > 0.0)
    }

    /// ATR above its own average and not falling.
    pub fn is_volatile(&self, bars: &[OhlcvBar]) -> bool {
        let atr = calculate_atr(bars, self.atr_period);
        let (Some(current), Some(previous)) = (atr.last(), atr.from_end(1)) else {
            return false;
        };
        let points: Vec<(DateTime<Utc>, f64)> = atr
            .values
            .iter()
            .filter(|p| p.valid)
            .map(|p| (p.timestamp, p.value))
            .collect();
        match sma_of(&points, self.atr_average).last() {
            Some(average) => current > average && current >= previous,
            None => false,
        }
    }

    /// RSI crossing back through the pullback level while the last bar
    /// touches the fast EMA.
    pub fn is_pullback(&self, bars: &[OhlcvBar], direction: Direction) -> bool {
        let rsi = calculate_rsi(bars, self.rsi_period);
        let (Some(now), Some(before)) = (rsi.last(), rsi.from_end(1)) else {
            return false;
        };
        let Some(ema) = calculate_ema(bars, self.fast_ema).last() else {
            return false;
        };
        let Some(bar) = bars.last() else {
            return false;
        };

        match direction {
            Direction::Long => {
                before < self.pullback_long
                    && now >= self.pullback_long
                    && bar.low <= ema * (1.0 + EMA_TOUCH_TOLERANCE)
            }
            Direction::Short => {
                before > self.pullback_short
                    && now <= self.pullback_short
                    && bar.high >= ema * (1.0 - EMA_TOUCH_TOLERANCE)
            }
        }
    }

    /// RSI on the last bar.
    pub fn latest_rsi(&self, bars: &[OhlcvBar]) -> Option<f64> {
        calculate_rsi(bars, self.rsi_period).last()
    }
}
