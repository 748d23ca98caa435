//! Asian-range breakout strategy.
//!
//! Trades the first entry-timeframe close through the Asian session range
//! after it has formed, with RSI confirming momentum without being
//! stretched.

use super::{CycleContext, Setup, Strategy, classifier_features, evidence, finalize};
use crate::domain::facts::gather_facts;
use crate::domain::features::ranges::asian_range;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::levels::LevelPlan;
use crate::domain::market::MarketView;
use crate::domain::signal::{CandidateSignal, Direction};
use chrono::Timelike;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutMaster {
    pub min_bars: usize,
    pub rsi_long: (f64, f64),
    pub rsi_short: (f64, f64),
    pub plan: LevelPlan,
    pub confidence: f64,
    pub threshold: f64,
}

impl Default for BreakoutMaster {
    fn default() -> Self {
        Self {
            min_bars: 50,
            rsi_long: (50.0, 70.0),
            rsi_short: (30.0, 50.0),
            plan: LevelPlan {
                stop_atr: 1.5,
                partial_atr: 1.5,
                tp1_atr: 3.0,
                tp2_atr: 5.0,
                breakeven_atr: 2.0,
            },
            confidence: 7.5,
            threshold: 7.0,
        }
    }
}

impl BreakoutMaster {
    pub const ID: &'static str = "breakout_master";
}

impl Strategy for BreakoutMaster {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Breakout Master"
    }

    fn analyze(
        &self,
        profile: &InstrumentProfile,
        view: &MarketView,
        ctx: &CycleContext,
    ) -> Option<CandidateSignal> {
        let cfg = &ctx.config.features;
        let m5 = view.m5;
        if m5.len() < self.min_bars.max(2) {
            return None;
        }
        let at = view.decision_time()?;
        if !cfg.sessions.allows(at, profile.session_hours) {
            return None;
        }

        let range_source = if view.m15.is_empty() { m5 } else { view.m15 };
        let range = asian_range(range_source, cfg.asian_start_hour, cfg.asian_end_hour)?;
        if range.date != at.date_naive() || at.hour() < cfg.asian_end_hour {
            return None;
        }

        let last = m5[m5.len() - 1];
        let prev = m5[m5.len() - 2];
        let direction = if prev.close <= range.high && last.close > range.high {
            Direction::Long
        } else if prev.close >= range.low && last.close < range.low {
            Direction::Short
        } else {
            return None;
        };

        let rsi = cfg.momentum.latest_rsi(m5)?;
        let (lo, hi) = match direction {
            Direction::Long => self.rsi_long,
            Direction::Short => self.rsi_short,
        };
        if rsi < lo || rsi > hi {
            debug!("{} {} {}: RSI {:.1} outside band", profile.symbol, Self::ID, direction, rsi);
            return None;
        }

        let atr = cfg.momentum.latest_atr(m5)?;
        let facts = gather_facts(view, profile, direction, None, cfg);
        let mut lines = evidence(&facts);
        lines.insert(
            0,
            format!("close through Asian range {:.5}-{:.5}", range.low, range.high),
        );

        finalize(
            profile,
            Setup {
                strategy_id: Self::ID,
                direction,
                rule_score: self.confidence,
                threshold: self.threshold,
                entry: last.close,
                reference: last.close,
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
    use crate::domain::config::EngineConfig;
    use crate::domain::feedback::TuningParameters;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::strategy::test_support::{FixedClassifier, FixedGrader};
    use crate::ports::grader_port::Grade;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap()
    }

    fn flat(count: i64, minutes: i64) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                let ts = day() + Duration::minutes(minutes * i);
                OhlcvBar::new(ts, 1.1000, 1.1010, 1.0990, 1.1000, 1.0)
            })
            .collect()
    }

    fn analyze(view: &MarketView) -> Option<CandidateSignal> {
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
        BreakoutMaster::default().analyze(&InstrumentProfile::generic("EURUSD"), view, &ctx)
    }

    #[test]
    fn too_few_bars_yields_nothing() {
        let m5 = flat(49, 5);
        let m15 = flat(36, 15);
        let view = MarketView {
            m5: &m5,
            m15: &m15,
            ..MarketView::default()
        };
        assert!(analyze(&view).is_none());
    }

    #[test]
    fn close_inside_range_yields_nothing() {
        // 00:00-08:55 on M5, decision at 09:00
        let m5 = flat(108, 5);
        let m15 = flat(36, 15);
        let view = MarketView {
            m5: &m5,
            m15: &m15,
            ..MarketView::default()
        };
        assert_eq!(view.decision_time(), Some(day() + Duration::hours(9)));
        assert!(analyze(&view).is_none());
    }

    #[test]
    fn stretched_rsi_rejects_breakout() {
        let mut m5 = flat(107, 5);
        m5.push(OhlcvBar::new(
            day() + Duration::minutes(5 * 107),
            1.1000,
            1.1016,
            1.0999,
            1.1015,
            1.0,
        ));
        let m15 = flat(36, 15);
        let view = MarketView {
            m5: &m5,
            m15: &m15,
            ..MarketView::default()
        };
        // a single up-move after a flat tape reads RSI 100
        assert!(analyze(&view).is_none());
    }

    #[test]
    fn default_bands_split_at_fifty() {
        let b = BreakoutMaster::default();
        assert_eq!(b.min_bars, 50);
        assert_eq!(b.rsi_long, (50.0, 70.0));
        assert_eq!(b.rsi_short, (30.0, 50.0));
        assert!(b.confidence > b.threshold);
        assert_eq!(b.id(), "breakout_master");
    }
}
