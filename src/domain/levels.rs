//! Stop, targets and breakeven trigger from a structural reference and ATR.

use crate::domain::instrument::InstrumentProfile;
use crate::domain::signal::Direction;
use chrono::{DateTime, Timelike, Utc};

/// ATR multiples for one setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelPlan {
    /// Distance of the stop beyond the reference level.
    pub stop_atr: f64,
    pub partial_atr: f64,
    pub tp1_atr: f64,
    pub tp2_atr: f64,
    pub breakeven_atr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop: f64,
    pub partial_tp: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub breakeven_trigger: f64,
}

impl TradeLevels {
    /// Distance from entry to the original stop.
    pub fn risk(&self) -> f64 {
        (self.entry - self.stop).abs()
    }
}

/// Defaults and session-adaptive TP2 multipliers. Loaded from `[levels]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelConfig {
    pub stop_atr: f64,
    pub partial_atr: f64,
    pub tp1_atr: f64,
    pub breakeven_atr: f64,
    /// New York overlap, 13:00-15:59 UTC.
    pub tp2_overlap: f64,
    /// London and New York, 08:00-20:59 UTC otherwise.
    pub tp2_active: f64,
    /// Low-liquidity hours.
    pub tp2_quiet: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            stop_atr: 0.5,
            partial_atr: 0.5,
            tp1_atr: 1.0,
            breakeven_atr: 0.75,
            tp2_overlap: 1.8,
            tp2_active: 1.5,
            tp2_quiet: 1.2,
        }
    }
}

impl LevelConfig {
    pub fn session_tp2(&self, at: DateTime<Utc>) -> f64 {
        match at.hour() {
            13..=15 => self.tp2_overlap,
            8..=20 => self.tp2_active,
            _ => self.tp2_quiet,
        }
    }

    /// Plan for `profile` at `at`. A learned TP2 multiplier replaces the
    /// session value.
    pub fn plan_for(
        &self,
        profile: &InstrumentProfile,
        at: DateTime<Utc>,
        learned_tp2: Option<f64>,
    ) -> LevelPlan {
        LevelPlan {
            stop_atr: self.stop_atr,
            partial_atr: profile.partial_atr.unwrap_or(self.partial_atr),
            tp1_atr: self.tp1_atr,
            tp2_atr: learned_tp2.unwrap_or_else(|| self.session_tp2(at)),
            breakeven_atr: profile.breakeven_atr.unwrap_or(self.breakeven_atr),
        }
    }
}

/// `None` for an unusable ATR or when the stop would not sit on the losing
/// side of entry.
pub fn compute_levels(
    direction: Direction,
    entry: f64,
    reference: f64,
    atr: f64,
    plan: &LevelPlan,
) -> Option<TradeLevels> {
    if !atr.is_finite() || atr <= 0.0 || !entry.is_finite() || !reference.is_finite() {
        return None;
    }
    let s = direction.sign();
    let stop = reference - s * plan.stop_atr * atr;
    if (entry - stop) * s <= 0.0 {
        return None;
    }

    Some(TradeLevels {
        entry,
        stop,
        partial_tp: entry + s * plan.partial_atr * atr,
        tp1: entry + s * plan.tp1_atr * atr,
        tp2: entry + s * plan.tp2_atr * atr,
        breakeven_trigger: entry + s * plan.breakeven_atr * atr,
    })
}
