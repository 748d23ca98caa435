//! Strategies: independent analyzers behind one capability interface.
//!
//! A strategy inspects one instrument's [`MarketView`] and either proposes
//! a [`Setup`] or nothing. The shared [`finalize`] step turns a setup into
//! a [`CandidateSignal`]: external grade, confidence blending and
//! weighting, the acceptance threshold, levels, size and win probability.

pub mod breakout;
pub mod price_action;
pub mod smc;

use crate::domain::config::EngineConfig;
use crate::domain::facts::StructuralFacts;
use crate::domain::features::FeatureConfig;
use crate::domain::features::phase::Phase;
use crate::domain::features::session::Session;
use crate::domain::feedback::TuningParameters;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::levels::{LevelPlan, compute_levels};
use crate::domain::market::MarketView;
use crate::domain::scoring::blend;
use crate::domain::signal::{CandidateSignal, Direction, QualitySeal};
use crate::ports::classifier_port::{ClassifierFeatures, NEUTRAL_PROBABILITY, WinProbabilityPort};
use crate::ports::grader_port::{Grade, SetupGraderPort, SetupSummary};
use chrono::{DateTime, Utc};
use log::{debug, warn};

pub use breakout::BreakoutMaster;
pub use price_action::PriceActionSpecialist;
pub use smc::SmcInstitutional;

pub const STRATEGY_IDS: [&str; 3] = [
    SmcInstitutional::ID,
    BreakoutMaster::ID,
    PriceActionSpecialist::ID,
];

/// Everything a strategy may read besides the market itself. Shared
/// read-only across the parallel fan-out.
pub struct CycleContext<'a> {
    pub config: &'a EngineConfig,
    pub tuning: &'a TuningParameters,
    pub grader: &'a dyn SetupGraderPort,
    pub classifier: &'a dyn WinProbabilityPort,
}

pub trait Strategy: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn analyze(
        &self,
        profile: &InstrumentProfile,
        view: &MarketView,
        ctx: &CycleContext,
    ) -> Option<CandidateSignal>;
}

/// Strategies for the given ids, in order. Unknown ids are skipped.
pub fn build_strategies(ids: &[String]) -> Vec<Box<dyn Strategy>> {
    ids.iter()
        .filter_map(|id| -> Option<Box<dyn Strategy>> {
            match id.as_str() {
                SmcInstitutional::ID => Some(Box::new(SmcInstitutional)),
                BreakoutMaster::ID => Some(Box::new(BreakoutMaster::default())),
                PriceActionSpecialist::ID => Some(Box::new(PriceActionSpecialist::default())),
                other => {
                    warn!("unknown strategy '{}' skipped", other);
                    None
                }
            }
        })
        .collect()
}

/// A setup found by a strategy, before acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct Setup {
    pub strategy_id: &'static str,
    pub direction: Direction,
    pub rule_score: f64,
    pub threshold: f64,
    pub entry: f64,
    /// Structural price the stop is placed beyond.
    pub reference: f64,
    pub atr: f64,
    pub plan: LevelPlan,
    /// Decision time: close of the latest structure bar.
    pub at: DateTime<Utc>,
    pub phase: Phase,
    pub evidence: Vec<String>,
    pub features: ClassifierFeatures,
}

pub fn finalize(
    profile: &InstrumentProfile,
    setup: Setup,
    ctx: &CycleContext,
) -> Option<CandidateSignal> {
    let summary = SetupSummary {
        instrument: profile.symbol.clone(),
        strategy_id: setup.strategy_id.to_string(),
        direction: setup.direction,
        rule_score: setup.rule_score,
        evidence: setup.evidence.clone(),
    };
    let grade = ctx.grader.grade(&summary).unwrap_or_else(|e| {
        warn!("{} {}: grader unavailable, using neutral grade: {}", profile.symbol, setup.strategy_id, e);
        Grade::neutral()
    });
    if !grade.valid {
        debug!(
            "{} {} {}: rejected by grader: {}",
            profile.symbol, setup.strategy_id, setup.direction, grade.narrative
        );
        return None;
    }

    let blended = blend(setup.rule_score, grade.score, ctx.config.grading.blend_weight);
    let confidence = ctx.tuning.weigh(setup.strategy_id, blended);
    if confidence < setup.threshold {
        debug!(
            "{} {} {}: confidence {:.1} below threshold {:.1}",
            profile.symbol, setup.strategy_id, setup.direction, confidence, setup.threshold
        );
        return None;
    }

    let Some(levels) = compute_levels(setup.direction, setup.entry, setup.reference, setup.atr, &setup.plan)
    else {
        debug!("{} {}: no valid levels (atr {})", profile.symbol, setup.strategy_id, setup.atr);
        return None;
    };
    let size = ctx.config.sizing.size(&levels, profile);

    let win_probability = match ctx.classifier.predict(&setup.features) {
        Ok(p) if p.is_finite() => p.clamp(0.0, 1.0),
        Ok(p) => {
            warn!("{}: classifier returned {}, using {}", profile.symbol, p, NEUTRAL_PROBABILITY);
            NEUTRAL_PROBABILITY
        }
        Err(e) => {
            warn!("{}: classifier unavailable, using {}: {}", profile.symbol, NEUTRAL_PROBABILITY, e);
            NEUTRAL_PROBABILITY
        }
    };
    if win_probability < ctx.config.grading.min_win_probability {
        debug!(
            "{} {}: win probability {:.2} below gate",
            profile.symbol, setup.strategy_id, win_probability
        );
        return None;
    }

    Some(CandidateSignal {
        instrument: profile.symbol.clone(),
        strategy_id: setup.strategy_id.to_string(),
        direction: setup.direction,
        confidence,
        win_probability,
        quality: QualitySeal::from_score(confidence),
        levels,
        size,
        pip_size: profile.pip_size,
        atr: setup.atr,
        created_at: setup.at,
        session: Session::at(setup.at),
        phase: setup.phase,
        narrative: grade.narrative,
    })
}

/// Human-readable lines for the facts that fired.
pub fn evidence(facts: &StructuralFacts) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(origin) = facts.sweep_origin {
        lines.push(format!("liquidity sweep on {}", origin));
    }
    let flags = [
        (facts.htf_aligned, "higher timeframe aligned"),
        (facts.displaced, "displacement"),
        (facts.pullback, "pullback to fast EMA"),
        (facts.volatile, "volatility expanding"),
        (facts.in_gap, "price in imbalance"),
        (facts.asian_sweep, "Asian range swept"),
        (facts.adr_exhausted, "daily range exhausted"),
        (facts.at_value, "at value"),
        (facts.htf_sweep, "H4 level swept"),
    ];
    lines.extend(flags.iter().filter(|(on, _)| *on).map(|(_, label)| label.to_string()));
    lines.push(format!("phase {}", facts.phase));
    if let Some(bias) = facts.macro_bias {
        lines.push(format!("macro bias {}", bias));
    }
    lines
}

/// Classifier inputs from the entry timeframe.
pub fn classifier_features(
    view: &MarketView,
    cfg: &FeatureConfig,
    facts: &StructuralFacts,
    atr: f64,
) -> ClassifierFeatures {
    let last = view.m5.last();
    let close = last.map(|b| b.close).unwrap_or(0.0);
    ClassifierFeatures {
        rsi: cfg.momentum.latest_rsi(view.m5).unwrap_or(50.0),
        body_ratio: last.and_then(|b| b.body_ratio()).unwrap_or(0.0),
        normalized_atr: if close > 0.0 { atr / close } else { 0.0 },
        displaced: facts.displaced,
        trend_aligned: facts.htf_aligned,
    }
}
