//! Historical replay.
//!
//! Steps through the structure-timeframe decision times in `[start, end)`.
//! At each step every instrument that is out of cooldown is evaluated by
//! every strategy on the bars closed by then, the batch is filtered for
//! correlated exposure, and each accepted signal is resolved at once
//! against the entry-timeframe bars that follow it.
//!
//! The replay uses the rolling value-area approximation by default; see
//! [`ValueAreaMethod::RollingApprox`].

use crate::domain::config::{EngineConfig, HistoryWindow, get_usize};
use crate::domain::config_validation::{parse_required_time, validate_backtest_config};
use crate::domain::correlation::filter_conflicts;
use crate::domain::error::SweepscanError;
use crate::domain::features::phase::Phase;
use crate::domain::features::session::Session;
use crate::domain::features::value_area::ValueAreaMethod;
use crate::domain::feedback::{ResolvedOutcome, TuningParameters};
use crate::domain::instrument::{InstrumentBook, InstrumentProfile};
use crate::domain::levels::TradeLevels;
use crate::domain::lifecycle::{Resolution, simulate};
use crate::domain::market::MarketData;
use crate::domain::pipeline::fetch_range;
use crate::domain::signal::{CandidateSignal, Direction};
use crate::domain::strategy::{CycleContext, Strategy};
use crate::domain::timeframe::Timeframe;
use crate::ports::classifier_port::WinProbabilityPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::grader_port::SetupGraderPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// No new signal for an instrument until this long after its last one.
    pub cooldown: Duration,
    /// Structure bars required before an instrument is evaluated.
    pub warmup_bars: usize,
    /// Bars per timeframe handed to the strategies at each step.
    pub max_history_bars: usize,
    /// Replays re-run with tuning learned from the previous replay.
    pub tuning_passes: usize,
    pub value_area: ValueAreaMethod,
}

impl BacktestConfig {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            cooldown: Duration::hours(8),
            warmup_bars: 100,
            max_history_bars: 600,
            tuning_passes: 0,
            value_area: ValueAreaMethod::RollingApprox,
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SweepscanError> {
        validate_backtest_config(config)?;
        let d = Self::new(
            parse_required_time(config, "start")?,
            parse_required_time(config, "end")?,
        );
        let cooldown_hours = config.get_double("backtest", "cooldown_hours", 8.0);
        Ok(Self {
            cooldown: Duration::minutes((cooldown_hours * 60.0).round() as i64),
            warmup_bars: get_usize(config, "backtest", "warmup_bars", d.warmup_bars),
            max_history_bars: get_usize(config, "backtest", "max_history_bars", d.max_history_bars),
            tuning_passes: get_usize(config, "backtest", "tuning_passes", d.tuning_passes),
            value_area: config
                .get_string("backtest", "value_area_method")
                .and_then(|raw| ValueAreaMethod::parse(&raw))
                .unwrap_or(d.value_area),
            ..d
        })
    }

    /// `engine` with the replay's value-area method.
    pub fn engine_for_replay(&self, engine: &EngineConfig) -> EngineConfig {
        let mut replay = engine.clone();
        replay.features.value_area.method = self.value_area;
        replay
    }
}

/// One accepted and resolved backtest signal.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub instrument: String,
    pub strategy_id: String,
    pub direction: Direction,
    pub confidence: f64,
    pub win_probability: f64,
    pub session: Session,
    pub phase: Phase,
    pub opened_at: DateTime<Utc>,
    pub levels: TradeLevels,
    pub lots: f64,
    pub resolution: Resolution,
}

impl TradeRecord {
    fn new(signal: CandidateSignal, opened_at: DateTime<Utc>, resolution: Resolution) -> Self {
        Self {
            instrument: signal.instrument,
            strategy_id: signal.strategy_id,
            direction: signal.direction,
            confidence: signal.confidence,
            win_probability: signal.win_probability,
            session: signal.session,
            phase: signal.phase,
            opened_at,
            levels: signal.levels,
            lots: signal.size.lots,
            resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Decision times replayed.
    pub steps: usize,
    /// Candidates before the correlation filter.
    pub candidates: usize,
    pub trades: Vec<TradeRecord>,
    /// Accepted signals whose forward bars ran out before they resolved.
    pub unresolved: usize,
    /// Tuning passes applied before this replay.
    pub passes: usize,
}

impl BacktestResult {
    /// Trades as feedback input, oldest first.
    pub fn resolved_outcomes(&self) -> Vec<ResolvedOutcome> {
        self.trades
            .iter()
            .map(|t| ResolvedOutcome {
                instrument: t.instrument.clone(),
                strategy_id: t.strategy_id.clone(),
                outcome: t.resolution.outcome,
                r_multiple: t.resolution.r_multiple,
            })
            .collect()
    }
}

/// Market data for the replay window: `history` before `start` for warmup,
/// and enough entry bars after `end` to resolve the last signals.
/// Instruments without their required timeframes are left out.
pub fn load_markets<'a>(
    book: &'a InstrumentBook,
    port: &dyn MarketDataPort,
    history: &HistoryWindow,
    bt: &BacktestConfig,
    forward: Duration,
) -> Result<Vec<(&'a InstrumentProfile, MarketData)>, SweepscanError> {
    let profiles: Vec<&InstrumentProfile> = book.profiles().collect();
    let markets: Vec<(&InstrumentProfile, MarketData)> = profiles
        .par_iter()
        .filter_map(|p| fetch_range(p, port, history, bt.start, bt.end + forward).map(|d| (*p, d)))
        .collect();

    if markets.is_empty() {
        return Err(SweepscanError::CycleFailed {
            reason: format!("no market data for any of {} instruments", profiles.len()),
        });
    }
    Ok(markets)
}

/// Close times of every structure bar in `[start, end)` across `markets`.
pub fn decision_timeline(
    markets: &[(&InstrumentProfile, MarketData)],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    let span = Timeframe::M15.duration();
    let times: BTreeSet<DateTime<Utc>> = markets
        .iter()
        .filter_map(|(_, data)| data.series(Timeframe::M15))
        .flat_map(|s| s.bars().iter().map(move |b| b.timestamp + span))
        .filter(|t| *t >= start && *t < end)
        .collect();
    times.into_iter().collect()
}

pub fn run_backtest(
    engine: &EngineConfig,
    bt: &BacktestConfig,
    tuning: &TuningParameters,
    strategies: &[Box<dyn Strategy>],
    markets: &[(&InstrumentProfile, MarketData)],
    grader: &dyn SetupGraderPort,
    classifier: &dyn WinProbabilityPort,
) -> BacktestResult {
    let engine = bt.engine_for_replay(engine);
    let ctx = CycleContext {
        config: &engine,
        tuning,
        grader,
        classifier,
    };
    let timeline = decision_timeline(markets, bt.start, bt.end);
    let mut cooldowns: HashMap<String, DateTime<Utc>> = HashMap::new();
    let mut result = BacktestResult {
        start: bt.start,
        end: bt.end,
        steps: timeline.len(),
        candidates: 0,
        trades: Vec::new(),
        unresolved: 0,
        passes: 0,
    };

    for &at in &timeline {
        let mut candidates = Vec::new();
        for (profile, data) in markets {
            if cooldowns.get(&profile.symbol).is_some_and(|until| at < *until) {
                continue;
            }
            let view = data.view_at(at).trailing(bt.max_history_bars);
            if view.m15.len() < bt.warmup_bars {
                continue;
            }
            candidates.extend(strategies.iter().filter_map(|s| s.analyze(profile, &view, &ctx)));
        }
        if candidates.is_empty() {
            continue;
        }
        result.candidates += candidates.len();

        // ranked best first: one position per instrument per step
        let mut opened: HashSet<String> = HashSet::new();
        for signal in filter_conflicts(candidates, &engine.instruments) {
            if !opened.insert(signal.instrument.clone()) {
                debug!(
                    "{} {} [{}]: instrument already opened this step, skipped",
                    at, signal.instrument, signal.strategy_id
                );
                continue;
            }
            cooldowns.insert(signal.instrument.clone(), at + bt.cooldown);

            let forward = markets
                .iter()
                .find(|(p, _)| p.symbol == signal.instrument)
                .and_then(|(_, data)| data.series(Timeframe::M5))
                .map(|s| s.starting_at(at))
                .unwrap_or(&[]);

            match simulate(
                signal.direction,
                signal.levels,
                signal.pip_size,
                at,
                forward,
                &engine.lifecycle,
            ) {
                Some(resolution) => {
                    debug!(
                        "{} {} {} [{}] -> {} ({:+.2}R)",
                        at,
                        signal.instrument,
                        signal.direction,
                        signal.strategy_id,
                        resolution.outcome,
                        resolution.r_multiple
                    );
                    result.trades.push(TradeRecord::new(signal, at, resolution));
                }
                None => {
                    debug!("{} {}: forward bars exhausted, unresolved", at, signal.instrument);
                    result.unresolved += 1;
                }
            }
        }
    }

    info!(
        "backtest {} .. {}: {} steps, {} candidates, {} trades, {} unresolved",
        bt.start,
        bt.end,
        result.steps,
        result.candidates,
        result.trades.len(),
        result.unresolved
    );
    result
}

/// Replays once with `seed` tuning, then `bt.tuning_passes` more times,
/// each tuned on the previous replay's outcomes. Returns the last replay
/// and the tuning it ran with.
pub fn run_backtest_with_feedback(
    engine: &EngineConfig,
    bt: &BacktestConfig,
    seed: TuningParameters,
    strategies: &[Box<dyn Strategy>],
    markets: &[(&InstrumentProfile, MarketData)],
    grader: &dyn SetupGraderPort,
    classifier: &dyn WinProbabilityPort,
) -> (BacktestResult, TuningParameters) {
    let mut tuning = seed;
    let mut result = run_backtest(engine, bt, &tuning, strategies, markets, grader, classifier);
    for pass in 1..=bt.tuning_passes {
        tuning = TuningParameters::from_outcomes(&result.resolved_outcomes(), &engine.feedback);
        info!(
            "tuning pass {}: {} learned TP2 multipliers, {} strategy weights",
            pass,
            tuning.atr_multipliers.len(),
            tuning.strategy_multipliers.len()
        );
        result = run_backtest(engine, bt, &tuning, strategies, markets, grader, classifier);
        result.passes = pass;
    }
    (result, tuning)
}
