//! Pin bar and engulfing patterns on the side of the slow EMA.

use super::{CycleContext, Setup, Strategy, classifier_features, evidence, finalize};
use crate::domain::facts::gather_facts;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::levels::LevelPlan;
use crate::domain::market::MarketView;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{CandidateSignal, Direction};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceActionSpecialist {
    pub rsi_long: (f64, f64),
    pub rsi_short: (f64, f64),
    /// Wick at least this multiple of the body for a pin bar.
    pub pin_wick_body: f64,
    /// Wick at least this fraction of the range for a pin bar.
    pub pin_wick_range: f64,
    /// ATR must be at least this fraction of its recent average.
    pub atr_floor: f64,
    pub atr_average: usize,
    pub plan: LevelPlan,
    pub confidence: f64,
    pub threshold: f64,
}

impl Default for PriceActionSpecialist {
    fn default() -> Self {
        Self {
            rsi_long: (45.0, 65.0),
            rsi_short: (35.0, 55.0),
            pin_wick_body: 2.0,
            pin_wick_range: 0.6,
            atr_floor: 0.9,
            atr_average: 20,
            plan: LevelPlan {
                stop_atr: 0.5,
                partial_atr: 1.0,
                tp1_atr: 2.0,
                tp2_atr: 4.0,
                breakeven_atr: 1.5,
            },
            confidence: 7.0,
            threshold: 7.0,
        }
    }
}

impl PriceActionSpecialist {
    pub const ID: &'static str = "price_action_specialist";

    /// Pattern name if `last` (after `prev`) is a pin bar or engulfing bar
    /// in `direction`.
    pub fn pattern(&self, prev: &OhlcvBar, last: &OhlcvBar, direction: Direction) -> Option<&'static str> {
        let range = last.range();
        if range <= 0.0 {
            return None;
        }
        let body = last.body();
        let (wick, engulfing) = match direction {
            Direction::Long => (
                last.lower_wick(),
                prev.is_bearish()
                    && last.is_bullish()
                    && last.open <= prev.close
                    && last.close >= prev.open,
            ),
            Direction::Short => (
                last.upper_wick(),
                prev.is_bullish()
                    && last.is_bearish()
                    && last.open >= prev.close
                    && last.close <= prev.open,
            ),
        };

        if wick >= self.pin_wick_body * body && wick >= self.pin_wick_range * range {
            Some("pin bar")
        } else if engulfing {
            Some("engulfing")
        } else {
            None
        }
    }

    fn atr_is_active(&self, bars: &[OhlcvBar], period: usize) -> Option<f64> {
        let values = calculate_atr(bars, period).valid_values();
        let current = *values.last()?;
        if values.len() < self.atr_average {
            return None;
        }
        let window = &values[values.len() - self.atr_average..];
        let average = window.iter().sum::<f64>() / window.len() as f64;
        (current > 0.0 && current >= self.atr_floor * average).then_some(current)
    }
}

impl Strategy for PriceActionSpecialist {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Price Action Specialist"
    }

    fn analyze(
        &self,
        profile: &InstrumentProfile,
        view: &MarketView,
        ctx: &CycleContext,
    ) -> Option<CandidateSignal> {
        let cfg = &ctx.config.features;
        let m5 = view.m5;
        if m5.len() < cfg.slow_ema.max(2) {
            return None;
        }
        let at = view.decision_time()?;
        if !cfg.sessions.allows(at, profile.session_hours) {
            return None;
        }

        let last = m5[m5.len() - 1];
        let prev = m5[m5.len() - 2];
        let ema = calculate_ema(m5, cfg.slow_ema).last()?;
        let direction = if last.close > ema {
            Direction::Long
        } else if last.close < ema {
            Direction::Short
        } else {
            return None;
        };
        let pattern = self.pattern(&prev, &last, direction)?;

        let rsi = cfg.momentum.latest_rsi(m5)?;
        let (lo, hi) = match direction {
            Direction::Long => self.rsi_long,
            Direction::Short => self.rsi_short,
        };
        if rsi < lo || rsi > hi {
            return None;
        }
        let atr = self.atr_is_active(m5, cfg.momentum.atr_period)?;

        let reference = match direction {
            Direction::Long => last.low,
            Direction::Short => last.high,
        };
        let facts = gather_facts(view, profile, direction, None, cfg);
        let mut lines = evidence(&facts);
        lines.insert(0, format!("{} beyond EMA({})", pattern, cfg.slow_ema));

        finalize(
            profile,
            Setup {
                strategy_id: Self::ID,
                direction,
                rule_score: self.confidence,
                threshold: self.threshold,
                entry: last.close,
                reference,
                atr,
                plan: self.plan,
                at,
                phase: facts.phase,
                evidence: lines,
                features: classifier_features(view, cfg, &facts, atr),
            },
            ctx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(), open, high, low, close, 1.0)
    }

    #[test]
    fn bullish_pin_bar() {
        let pa = PriceActionSpecialist::default();
        let prev = bar(1.10, 1.11, 1.09, 1.10);
        let pin = bar(1.100, 1.102, 1.090, 1.101);
        assert_eq!(pa.pattern(&prev, &pin, Direction::Long), Some("pin bar"));
        assert_eq!(pa.pattern(&prev, &pin, Direction::Short), None);
    }

    #[test]
    fn bearish_engulfing() {
        let pa = PriceActionSpecialist::default();
        let prev = bar(1.100, 1.104, 1.099, 1.103);
        let engulf = bar(1.104, 1.105, 1.097, 1.098);
        assert_eq!(pa.pattern(&prev, &engulf, Direction::Short), Some("engulfing"));
        assert_eq!(pa.pattern(&prev, &engulf, Direction::Long), None);
    }

    #[test]
    fn zero_range_bar_is_no_pattern() {
        let pa = PriceActionSpecialist::default();
        let flat = bar(1.1, 1.1, 1.1, 1.1);
        assert_eq!(pa.pattern(&flat, &flat, Direction::Long), None);
    }
}
