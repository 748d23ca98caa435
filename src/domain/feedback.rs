//! Feedback controllers that tune the next run from resolved outcomes.
//!
//! The Auto-Optimizer learns a TP2 multiplier per instrument and the
//! Performance Weighter a confidence multiplier per strategy. Both are
//! folded into an immutable [`TuningParameters`] snapshot, built once per
//! run and passed by reference.

use crate::domain::lifecycle::Outcome;
use crate::domain::scoring::round1;
use log::info;
use std::collections::{BTreeMap, HashMap};

/// One resolved signal as read back from the journal.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOutcome {
    pub instrument: String,
    pub strategy_id: String,
    pub outcome: Outcome,
    pub r_multiple: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TpAdjustment {
    Tighten(f64),
    Widen(f64),
    Default(f64),
}

impl TpAdjustment {
    pub fn multiplier(self) -> f64 {
        match self {
            TpAdjustment::Tighten(m) | TpAdjustment::Widen(m) | TpAdjustment::Default(m) => m,
        }
    }

    /// A learned override. `Default` leaves the session-adaptive value in force.
    pub fn learned(self) -> Option<f64> {
        match self {
            TpAdjustment::Tighten(m) | TpAdjustment::Widen(m) => Some(m),
            TpAdjustment::Default(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoOptimizer {
    /// Most recent outcomes considered per instrument.
    pub window: usize,
    pub tighten_above: f64,
    pub widen_below: f64,
    /// Outcomes required before widening.
    pub min_samples: usize,
    pub tighten_multiplier: f64,
    pub widen_multiplier: f64,
    pub default_multiplier: f64,
}

impl Default for AutoOptimizer {
    fn default() -> Self {
        Self {
            window: 50,
            tighten_above: 0.40,
            widen_below: 0.10,
            min_samples: 5,
            tighten_multiplier: 1.2,
            widen_multiplier: 1.8,
            default_multiplier: 1.5,
        }
    }
}

impl AutoOptimizer {
    /// `outcomes` oldest first. Breakeven-like exits are breakeven and
    /// partial-loss closes.
    pub fn evaluate(&self, outcomes: &[Outcome]) -> TpAdjustment {
        let recent = &outcomes[outcomes.len().saturating_sub(self.window)..];
        if recent.is_empty() {
            return TpAdjustment::Default(self.default_multiplier);
        }
        let breakevens = recent.iter().filter(|o| o.is_breakeven_like()).count();
        let rate = breakevens as f64 / recent.len() as f64;

        if rate > self.tighten_above {
            TpAdjustment::Tighten(self.tighten_multiplier)
        } else if rate < self.widen_below && recent.len() >= self.min_samples {
            TpAdjustment::Widen(self.widen_multiplier)
        } else {
            TpAdjustment::Default(self.default_multiplier)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceWeighter {
    pub strong_win_rate: f64,
    pub weak_win_rate: f64,
    /// Boost per unit of win rate above the strong threshold.
    pub boost: f64,
    pub max_multiplier: f64,
    pub weak_multiplier: f64,
}

impl Default for PerformanceWeighter {
    fn default() -> Self {
        Self {
            strong_win_rate: 0.35,
            weak_win_rate: 0.25,
            boost: 0.5,
            max_multiplier: 1.5,
            weak_multiplier: 0.7,
        }
    }
}

impl PerformanceWeighter {
    /// Confidence multiplier from a strategy's outcomes. A win is a full TP2.
    pub fn multiplier(&self, outcomes: &[Outcome]) -> f64 {
        if outcomes.is_empty() {
            return 1.0;
        }
        let wins = outcomes.iter().filter(|o| **o == Outcome::Tp2).count();
        let win_rate = wins as f64 / outcomes.len() as f64;

        let m = if win_rate > self.strong_win_rate {
            (1.0 + self.boost * win_rate).min(self.max_multiplier)
        } else if win_rate < self.weak_win_rate {
            self.weak_multiplier
        } else {
            1.0
        };
        (m * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackConfig {
    pub optimizer: AutoOptimizer,
    pub weighter: PerformanceWeighter,
    /// Resolved outcomes read from the journal at startup.
    pub history_limit: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            optimizer: AutoOptimizer::default(),
            weighter: PerformanceWeighter::default(),
            history_limit: 1000,
        }
    }
}

/// Run-wide tuning snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuningParameters {
    /// Learned TP2 multiplier per instrument. Absent means session-adaptive.
    pub atr_multipliers: HashMap<String, f64>,
    pub strategy_multipliers: HashMap<String, f64>,
}

impl TuningParameters {
    /// `outcomes` oldest first.
    pub fn from_outcomes(outcomes: &[ResolvedOutcome], cfg: &FeedbackConfig) -> Self {
        let mut by_instrument: BTreeMap<&str, Vec<Outcome>> = BTreeMap::new();
        let mut by_strategy: BTreeMap<&str, Vec<Outcome>> = BTreeMap::new();
        for r in outcomes {
            by_instrument.entry(&r.instrument).or_default().push(r.outcome);
            by_strategy.entry(&r.strategy_id).or_default().push(r.outcome);
        }

        let mut tuning = Self::default();
        for (instrument, history) in by_instrument {
            let adjustment = cfg.optimizer.evaluate(&history);
            if let Some(m) = adjustment.learned() {
                info!("{}: TP2 multiplier {:?} over {} outcomes", instrument, adjustment, history.len());
                tuning.atr_multipliers.insert(instrument.to_string(), m);
            }
        }
        for (strategy, history) in by_strategy {
            let m = cfg.weighter.multiplier(&history);
            if (m - 1.0).abs() > f64::EPSILON {
                info!("{}: confidence multiplier {:.2}", strategy, m);
            }
            tuning.strategy_multipliers.insert(strategy.to_string(), m);
        }
        tuning
    }

    pub fn tp2_multiplier(&self, instrument: &str) -> Option<f64> {
        self.atr_multipliers.get(instrument).copied()
    }

    pub fn strategy_multiplier(&self, strategy_id: &str) -> f64 {
        self.strategy_multipliers
            .get(strategy_id)
            .copied()
            .unwrap_or(1.0)
    }

    /// `confidence` scaled by the strategy multiplier, rounded to one decimal.
    pub fn weigh(&self, strategy_id: &str, confidence: f64) -> f64 {
        round1(confidence * self.strategy_multiplier(strategy_id))
    }
}
