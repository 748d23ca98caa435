//! Institutional liquidity-sweep strategy.
//!
//! Looks for a structure-timeframe sweep (delayed confirmation allowed),
//! preferring one that agrees with the narrative trend, then falls back to
//! the entry timeframe. Confidence comes from the full rule-fusion score.

use super::{CycleContext, Setup, Strategy, classifier_features, evidence, finalize};
use crate::domain::facts::{gather_facts, reference_price};
use crate::domain::features::sweep::SweepFact;
use crate::domain::features::trend::trend;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::market::MarketView;
use crate::domain::signal::CandidateSignal;
use crate::domain::timeframe::Timeframe;
use log::debug;

pub struct SmcInstitutional;

impl SmcInstitutional {
    pub const ID: &'static str = "smc_institutional";

    fn find_sweep(
        profile: &InstrumentProfile,
        view: &MarketView,
        ctx: &CycleContext,
    ) -> Option<SweepFact> {
        let cfg = &ctx.config.features;
        let pinned = profile.sweep_lookback;

        let structure = cfg
            .sweep
            .lookback_for(view.m15, pinned)
            .and_then(|l| cfg.sweep.detect_recent(view.m15, l, Timeframe::M15));
        let entry = cfg
            .sweep
            .lookback_for(view.m5, pinned)
            .and_then(|l| cfg.sweep.detect(view.m5, l, Timeframe::M5));

        let trend_direction = trend(view.h1, cfg.trend_ema).map(|t| t.direction);
        let candidates = [structure, entry];

        candidates
            .iter()
            .flatten()
            .find(|s| trend_direction.is_none_or(|d| d == s.direction))
            .or_else(|| candidates.iter().flatten().next())
            .copied()
    }
}

impl Strategy for SmcInstitutional {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "SMC Institutional"
    }

    fn analyze(
        &self,
        profile: &InstrumentProfile,
        view: &MarketView,
        ctx: &CycleContext,
    ) -> Option<CandidateSignal> {
        let cfg = &ctx.config.features;
        let at = view.decision_time()?;
        if !cfg.sessions.allows(at, profile.session_hours) {
            debug!("{} {}: outside trading window at {}", profile.symbol, Self::ID, at);
            return None;
        }

        let sweep = Self::find_sweep(profile, view, ctx)?;
        let direction = sweep.direction;
        let facts = gather_facts(view, profile, direction, Some(&sweep), cfg);
        let rule_score = ctx.config.scoring.score(&facts, profile, direction);

        let entry = reference_price(view)?;
        let atr = cfg
            .momentum
            .latest_atr(view.m5)
            .or_else(|| cfg.momentum.latest_atr(view.m15))?;
        let plan = ctx
            .config
            .levels
            .plan_for(profile, at, ctx.tuning.tp2_multiplier(&profile.symbol));

        debug!(
            "{} {} {}: sweep on {} at {:.5}, {} bars ago, score {:.1}",
            profile.symbol,
            Self::ID,
            direction,
            sweep.origin,
            sweep.level,
            sweep.bars_ago,
            rule_score
        );

        finalize(
            profile,
            Setup {
                strategy_id: Self::ID,
                direction,
                rule_score,
                threshold: profile.confidence_threshold,
                entry,
                reference: sweep.level,
                atr,
                plan,
                at,
                phase: facts.phase,
                evidence: evidence(&facts),
                features: classifier_features(view, cfg, &facts, atr),
            },
            ctx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::EngineConfig;
    use crate::domain::feedback::TuningParameters;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::signal::Direction;
    use crate::domain::strategy::test_support::{FixedClassifier, FixedGrader};
    use crate::ports::grader_port::Grade;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// Sixty flat M15 bars then one bar that wicks below the range and
    /// closes back inside it.
    fn swept_m15(start: DateTime<Utc>) -> Vec<OhlcvBar> {
        let mut bars: Vec<OhlcvBar> = (0..60)
            .map(|i| {
                let ts = start + Duration::minutes(15 * i);
                OhlcvBar::new(ts, 1.1000, 1.1010, 1.0990, 1.1000, 1.0)
            })
            .collect();
        bars.push(OhlcvBar::new(
            start + Duration::minutes(15 * 60),
            1.0995,
            1.1002,
            1.0970,
            1.1000,
            1.0,
        ));
        bars
    }

    fn with_ctx<R>(f: impl FnOnce(&CycleContext) -> R) -> R {
        let config = EngineConfig::default();
        let tuning = TuningParameters::default();
        let grader = FixedGrader(Ok(Grade::neutral()));
        let classifier = FixedClassifier(Ok(0.5));
        let ctx = CycleContext {
            config: &config,
            tuning: &tuning,
            grader: &grader,
            classifier: &classifier,
        };
        f(&ctx)
    }

    #[test]
    fn structure_sweep_is_found_without_trend() {
        let m15 = swept_m15(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        let view = MarketView {
            m15: &m15,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");

        let sweep = with_ctx(|ctx| SmcInstitutional::find_sweep(&profile, &view, ctx)).unwrap();
        assert_eq!(sweep.direction, Direction::Long);
        assert_eq!(sweep.origin, Timeframe::M15);
        assert_eq!(sweep.bars_ago, 0);
        assert!((sweep.level - 1.0990).abs() < 1e-12);
    }

    #[test]
    fn flat_market_has_no_sweep() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let m15: Vec<OhlcvBar> = swept_m15(start).into_iter().take(60).collect();
        let view = MarketView {
            m15: &m15,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");

        assert!(with_ctx(|ctx| SmcInstitutional::find_sweep(&profile, &view, ctx)).is_none());
        assert!(with_ctx(|ctx| SmcInstitutional.analyze(&profile, &view, ctx)).is_none());
    }

    #[test]
    fn sweep_outside_trading_window_is_ignored() {
        // last bar opens 01:45, decision at 02:00
        let m15 = swept_m15(Utc.with_ymd_and_hms(2024, 6, 2, 10, 45, 0).unwrap());
        let view = MarketView {
            m15: &m15,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");

        assert!(with_ctx(|ctx| SmcInstitutional.analyze(&profile, &view, ctx)).is_none());
    }

    #[test]
    fn empty_view_yields_nothing() {
        let profile = InstrumentProfile::generic("EURUSD");
        let view = MarketView::default();
        assert!(with_ctx(|ctx| SmcInstitutional.analyze(&profile, &view, ctx)).is_none());
    }

    #[test]
    fn identifies_itself() {
        assert_eq!(SmcInstitutional.id(), "smc_institutional");
        assert_eq!(SmcInstitutional.name(), "SMC Institutional");
    }
}
