//! The closed record of structural facts consumed by the scoring engine.

use crate::domain::features::FeatureConfig;
use crate::domain::features::displacement::displaced;
use crate::domain::features::imbalance::{detect_gaps, price_in_gap};
use crate::domain::features::phase::Phase;
use crate::domain::features::ranges::{asian_range, average_daily_range};
use crate::domain::features::sweep::SweepFact;
use crate::domain::features::trend::{htf_sweep, macro_bias, previous_h4_levels, trend};
use crate::domain::features::value_area::ValueAreaMethod;
use crate::domain::instrument::InstrumentProfile;
use crate::domain::market::MarketView;
use crate::domain::signal::Direction;
use crate::domain::timeframe::Timeframe;
use chrono::Timelike;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuralFacts {
    /// H1 trend agrees with the trade direction.
    pub htf_aligned: bool,
    pub sweep_origin: Option<Timeframe>,
    pub displaced: bool,
    pub pullback: bool,
    pub volatile: bool,
    pub in_gap: bool,
    /// The structure bar swept the Asian range on the trade side.
    pub asian_sweep: bool,
    /// The swept Asian range was wide enough for the instrument.
    pub asian_quality: bool,
    pub adr_exhausted: bool,
    pub at_value: bool,
    pub value_method: Option<ValueAreaMethod>,
    pub htf_sweep: bool,
    pub phase: Phase,
    /// Relative distance of the H1 close from its trend EMA.
    pub htf_distance: f64,
    pub macro_bias: Option<Direction>,
}

/// Price a new position would be opened at: the latest entry close, or the
/// latest structure close when no entry bars are loaded.
pub fn reference_price(view: &MarketView) -> Option<f64> {
    view.m5.last().or_else(|| view.m15.last()).map(|b| b.close)
}

pub fn gather_facts(
    view: &MarketView,
    profile: &InstrumentProfile,
    direction: Direction,
    sweep: Option<&SweepFact>,
    cfg: &FeatureConfig,
) -> StructuralFacts {
    let mut facts = StructuralFacts {
        sweep_origin: sweep.map(|s| s.origin),
        displaced: displaced(view.m5, direction, cfg.displacement_ratio),
        pullback: cfg.momentum.is_pullback(view.m5, direction),
        volatile: cfg.momentum.is_volatile(view.m5),
        ..StructuralFacts::default()
    };

    if let Some(t) = trend(view.h1, cfg.trend_ema) {
        facts.htf_aligned = t.direction == direction;
        facts.htf_distance = t.distance;
    }
    facts.macro_bias = macro_bias(view.d1, cfg.macro_ema);

    if let Some(price) = reference_price(view) {
        facts.in_gap = [view.m5, view.m15].iter().any(|bars| {
            let gaps = detect_gaps(bars, cfg.gap_window);
            price_in_gap(price, &gaps, direction, cfg.gap_tolerance)
        });

        let value_source = if view.m5.is_empty() { view.m15 } else { view.m5 };
        let atr = cfg.momentum.latest_atr(value_source).unwrap_or(0.0);
        if let Some(area) = cfg.value_area.estimate(value_source, atr) {
            facts.at_value = area.contains(price);
            facts.value_method = Some(area.method);
        }
    }

    let adr_source = if view.h1.is_empty() { view.m15 } else { view.h1 };
    facts.adr_exhausted = average_daily_range(adr_source, cfg.adr_days, cfg.adr_threshold)
        .is_some_and(|adr| adr.exhausted);

    if let Some(bar) = view.m15.last() {
        if let Some(range) = asian_range(view.m15, cfg.asian_start_hour, cfg.asian_end_hour) {
            let after_session = bar.timestamp.date_naive() == range.date
                && bar.timestamp.hour() >= cfg.asian_end_hour;
            if after_session && range.swept_by(bar, direction) {
                facts.asian_sweep = true;
                facts.asian_quality = profile.to_pips(range.width()) >= profile.asian_min_pips;
            }
        }

        if let Some(as_of) = view.decision_time() {
            facts.htf_sweep = previous_h4_levels(view.h4, as_of)
                .is_some_and(|levels| htf_sweep(bar, &levels, direction));
        }
    }

    if let Some(fact) = cfg.phase.classify(view.m15) {
        facts.phase = fact.phase;
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn bars(start: DateTime<Utc>, step: Duration, closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar::new(start + step * i as i32, c, c + 0.0005, c - 0.0005, c, 10.0))
            .collect()
    }

    #[test]
    fn empty_view_yields_neutral_facts() {
        let view = MarketView::default();
        let profile = InstrumentProfile::generic("EURUSD");
        let facts = gather_facts(&view, &profile, Direction::Long, None, &FeatureConfig::default());
        assert_eq!(facts, StructuralFacts::default());
    }

    #[test]
    fn rising_h1_aligns_long_only() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let closes: Vec<f64> = (0..120).map(|i| 1.0 + i as f64 * 0.001).collect();
        let h1 = bars(start, Duration::hours(1), &closes);
        let view = MarketView {
            h1: &h1,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");
        let cfg = FeatureConfig::default();

        let long = gather_facts(&view, &profile, Direction::Long, None, &cfg);
        let short = gather_facts(&view, &profile, Direction::Short, None, &cfg);
        assert!(long.htf_aligned);
        assert!(!short.htf_aligned);
        assert!(long.htf_distance > 0.0);
    }

    #[test]
    fn value_area_reads_entry_timeframe() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let zigzag = |mid: f64| -> Vec<f64> {
            let mut closes: Vec<f64> = (0..120)
                .map(|i| if i % 2 == 0 { mid - 0.0010 } else { mid + 0.0010 })
                .collect();
            closes.push(mid);
            closes
        };
        let m5 = bars(start, Duration::minutes(5), &zigzag(1.1000));
        let m15 = bars(start, Duration::minutes(15), &zigzag(1.2000));
        let view = MarketView {
            m5: &m5,
            m15: &m15,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");
        let mut cfg = FeatureConfig::default();
        cfg.value_area.method = ValueAreaMethod::RollingApprox;

        let facts = gather_facts(&view, &profile, Direction::Long, None, &cfg);
        assert!(facts.at_value);
        assert_eq!(facts.value_method, Some(ValueAreaMethod::RollingApprox));
    }

    #[test]
    fn asian_sweep_with_quality() {
        let day = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        // Asian session 1.1000-1.1030 (30 pips), then a London bar dips below it
        let mut m15: Vec<OhlcvBar> = (0..32)
            .map(|i| {
                OhlcvBar::new(
                    day + Duration::minutes(15 * i),
                    1.1015,
                    1.1030,
                    1.1000,
                    1.1015,
                    10.0,
                )
            })
            .collect();
        m15.push(OhlcvBar::new(
            day + Duration::hours(9),
            1.1010,
            1.1020,
            1.0990,
            1.1012,
            10.0,
        ));
        let view = MarketView {
            m15: &m15,
            ..MarketView::default()
        };
        let profile = InstrumentProfile::generic("EURUSD");
        let facts = gather_facts(&view, &profile, Direction::Long, None, &FeatureConfig::default());
        assert!(facts.asian_sweep);
        assert!(facts.asian_quality);

        let short = gather_facts(&view, &profile, Direction::Short, None, &FeatureConfig::default());
        assert!(!short.asian_sweep);
    }
}
