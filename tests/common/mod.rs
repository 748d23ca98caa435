#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use sweepscan::domain::error::SweepscanError;
use sweepscan::domain::features::phase::Phase;
use sweepscan::domain::features::session::Session;
use sweepscan::domain::instrument::InstrumentProfile;
use sweepscan::domain::levels::TradeLevels;
use sweepscan::domain::market::MarketView;
pub use sweepscan::domain::ohlcv::{BarSeries, OhlcvBar};
use sweepscan::domain::signal::{CandidateSignal, Direction, QualitySeal};
use sweepscan::domain::sizing::PositionSize;
use sweepscan::domain::strategy::{CycleContext, Strategy};
pub use sweepscan::domain::timeframe::Timeframe;
use sweepscan::ports::market_data_port::MarketDataPort;

/// Market data held in memory, keyed by instrument and timeframe.
pub struct MockMarketData {
    pub series: HashMap<(String, Timeframe), Vec<OhlcvBar>>,
    pub failing: HashSet<String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Self {
        self.series.insert((instrument.to_string(), timeframe), bars);
        self
    }

    /// Flat bars on M5, M15 and H1 covering `[from, to)`.
    pub fn with_flat_market(
        mut self,
        instrument: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        high: f64,
    ) -> Self {
        for tf in [Timeframe::M5, Timeframe::M15, Timeframe::H1] {
            self.series
                .insert((instrument.to_string(), tf), flat_bars(from, to, tf, high, 1.0995));
        }
        self
    }

    pub fn with_failure(mut self, instrument: &str) -> Self {
        self.failing.insert(instrument.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BarSeries>, SweepscanError> {
        if self.failing.contains(instrument) {
            return Err(SweepscanError::Collaborator {
                collaborator: "market data".into(),
                reason: format!("{} feed down", instrument),
            });
        }
        let Some(bars) = self.series.get(&(instrument.to_string(), timeframe)) else {
            return Ok(None);
        };
        let window: Vec<OhlcvBar> = bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .copied()
            .collect();
        if window.is_empty() {
            return Ok(None);
        }
        BarSeries::new(instrument, timeframe, window).map(Some)
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Bars opening every `tf` from `from` up to but excluding `to`, all
/// centred on 1.1000.
pub fn flat_bars(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tf: Timeframe,
    high: f64,
    low: f64,
) -> Vec<OhlcvBar> {
    let step = Duration::minutes(tf.minutes());
    let mut bars = Vec::new();
    let mut ts = from;
    while ts < to {
        bars.push(OhlcvBar::new(ts, 1.1000, high, low, 1.1000, 10.0));
        ts += step;
    }
    bars
}

/// M5 bars from (high, low) pairs, five minutes apart from `from`.
pub fn m5_bars(from: DateTime<Utc>, rows: &[(f64, f64)]) -> Vec<OhlcvBar> {
    rows.iter()
        .enumerate()
        .map(|(i, &(high, low))| {
            let mid = (high + low) / 2.0;
            OhlcvBar::new(from + Duration::minutes(5 * i as i64), mid, high, low, mid, 1.0)
        })
        .collect()
}

/// Levels around 1.1000: 30 pip stop, 36 pip final target.
pub fn levels(direction: Direction) -> TradeLevels {
    let s = direction.sign();
    TradeLevels {
        entry: 1.1000,
        stop: 1.1000 - s * 0.0030,
        partial_tp: 1.1000 + s * 0.0010,
        tp1: 1.1000 + s * 0.0020,
        tp2: 1.1000 + s * 0.0036,
        breakeven_trigger: 1.1000 + s * 0.0015,
    }
}

pub fn make_signal(
    instrument: &str,
    direction: Direction,
    win_probability: f64,
    created_at: DateTime<Utc>,
) -> CandidateSignal {
    CandidateSignal {
        instrument: instrument.to_string(),
        strategy_id: "smc_institutional".to_string(),
        direction,
        confidence: 8.5,
        win_probability,
        quality: QualitySeal::SolidA,
        levels: levels(direction),
        size: PositionSize {
            lots: 0.01,
            risk_amount: 3.0,
            risk_pct: 0.06,
            pips_at_risk: 30.0,
            warning: false,
        },
        pip_size: 0.0001,
        atr: 0.0020,
        created_at,
        session: Session::London,
        phase: Phase::Accumulation,
        narrative: String::new(),
    }
}

/// Proposes a fixed-direction signal at every decision time it is shown.
pub struct Always(pub Direction);

impl Strategy for Always {
    fn id(&self) -> &'static str {
        "always"
    }

    fn name(&self) -> &'static str {
        "Always"
    }

    fn analyze(
        &self,
        profile: &InstrumentProfile,
        view: &MarketView,
        _ctx: &CycleContext,
    ) -> Option<CandidateSignal> {
        Some(make_signal(&profile.symbol, self.0, 0.6, view.decision_time()?))
    }
}
