//! Rule-fusion scoring: an additive rule list over structural facts, then
//! instrument override blocks.

use crate::domain::facts::StructuralFacts;
use crate::domain::features::phase::PhaseAlignment;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::signal::Direction;
use crate::domain::timeframe::Timeframe;

/// Weights of the additive rule list. Loaded from `[scoring]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringRules {
    pub base_aligned: f64,
    pub base_misaligned: f64,
    pub sweep_m5: f64,
    pub sweep_m15: f64,
    /// Sweeps from H1 or coarser.
    pub sweep_htf: f64,
    pub displacement: f64,
    pub no_displacement: f64,
    pub pullback: f64,
    pub volatility: f64,
    pub gap: f64,
    pub asian_quality: f64,
    pub asian_low_quality: f64,
    pub adr_exhausted: f64,
    pub at_value: f64,
    pub htf_sweep: f64,
    pub phase_confirm: f64,
    pub phase_manipulation: f64,
    pub phase_oppose: f64,
    /// |H1 distance from trend EMA| above which the move is over-extended.
    pub overextension_limit: f64,
    pub overextension: f64,
    pub macro_aligned: f64,
    pub macro_opposed: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_aligned: 3.0,
            base_misaligned: 1.5,
            sweep_m5: 2.0,
            sweep_m15: 3.0,
            sweep_htf: 3.5,
            displacement: 2.0,
            no_displacement: -1.0,
            pullback: 1.5,
            volatility: 0.5,
            gap: 2.0,
            asian_quality: 1.5,
            asian_low_quality: -1.5,
            adr_exhausted: -3.0,
            at_value: 1.5,
            htf_sweep: 1.5,
            phase_confirm: 1.0,
            phase_manipulation: 0.5,
            phase_oppose: -1.0,
            overextension_limit: 0.008,
            overextension: -2.0,
            macro_aligned: 0.5,
            macro_opposed: -1.0,
        }
    }
}

impl ScoringRules {
    /// Confidence for `direction`, rounded to one decimal. Unbounded.
    pub fn score(
        &self,
        facts: &StructuralFacts,
        profile: &InstrumentProfile,
        direction: Direction,
    ) -> f64 {
        let mut score = if facts.htf_aligned {
            self.base_aligned
        } else {
            self.base_misaligned
        };

        score += match facts.sweep_origin {
            Some(Timeframe::M5) => self.sweep_m5,
            Some(Timeframe::M15) => self.sweep_m15,
            Some(_) => self.sweep_htf,
            None => 0.0,
        };

        score += if facts.displaced {
            self.displacement
        } else {
            self.no_displacement
        };
        if facts.pullback {
            score += self.pullback;
        }
        if facts.volatile {
            score += self.volatility;
        }
        if facts.in_gap {
            score += self.gap;
        }
        if facts.asian_sweep {
            score += if facts.asian_quality {
                self.asian_quality
            } else {
                self.asian_low_quality
            };
        }
        if facts.adr_exhausted {
            score += self.adr_exhausted;
        }
        if facts.at_value {
            score += self.at_value;
        }
        if facts.htf_sweep {
            score += self.htf_sweep;
        }

        score += match facts.phase.alignment(direction) {
            PhaseAlignment::Confirms => self.phase_confirm,
            PhaseAlignment::Manipulation => self.phase_manipulation,
            PhaseAlignment::Opposes => self.phase_oppose,
            PhaseAlignment::Neutral => 0.0,
        };

        if facts.htf_distance.abs() > self.overextension_limit {
            score += self.overextension;
        }

        match facts.macro_bias {
            Some(bias) if bias == direction => score += self.macro_aligned,
            Some(_) => score += self.macro_opposed,
            None => {}
        }

        score = apply_overrides(score, facts, profile);
        round1(score)
    }
}

fn apply_overrides(mut score: f64, facts: &StructuralFacts, profile: &InstrumentProfile) -> f64 {
    let o = &profile.scoring;
    score += o.alpha_bonus;

    if let Some(penalty) = o.misalignment_penalty.filter(|_| !facts.htf_aligned) {
        score += penalty;
    }
    if facts.asian_sweep && !facts.asian_quality {
        score += o.low_quality_asian_penalty;
    }

    match (facts.displaced, facts.in_gap) {
        (false, false) => score += o.trap_penalty,
        (true, false) | (false, true) => score += o.half_trap_penalty,
        (true, true) => {}
    }

    if o.premium_threshold.is_some_and(|threshold| score >= threshold) {
        score += o.premium_bonus;
    }
    score
}

/// Weighted average of the rule score and an external grade, when one is given.
pub fn blend(rule_score: f64, grade: Option<f64>, weight: f64) -> f64 {
    match grade {
        Some(g) if g.is_finite() => (1.0 - weight) * rule_score + weight * g,
        _ => rule_score,
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
