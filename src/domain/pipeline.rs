//! The live evaluation cycle.
//!
//! Fan-out: market data is fetched per instrument in parallel, then every
//! (instrument, strategy) pair is analyzed in parallel. Fan-in: candidates
//! are gathered in a deterministic order and filtered for correlated
//! exposure on one thread. Accepted signals are journaled and alerted.

use crate::domain::config::{EngineConfig, HistoryWindow};
use crate::domain::correlation::{Theme, dominant_theme, filter_conflicts};
use crate::domain::error::SweepscanError;
use crate::domain::feedback::{FeedbackConfig, TuningParameters};
use crate::domain::instrument::InstrumentProfile;
use crate::domain::market::MarketData;
use crate::domain::signal::{CandidateSignal, format_alert};
use crate::domain::strategy::{CycleContext, Strategy};
use crate::domain::timeframe::Timeframe;
use crate::ports::alert_port::AlertPort;
use crate::ports::classifier_port::WinProbabilityPort;
use crate::ports::grader_port::SetupGraderPort;
use crate::ports::journal_port::SignalJournalPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Timeframes without which an instrument is skipped for the cycle.
pub const REQUIRED_TIMEFRAMES: [Timeframe; 3] = [Timeframe::M5, Timeframe::M15, Timeframe::H1];

/// The outside world, as seen by one cycle.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub market_data: &'a dyn MarketDataPort,
    pub journal: &'a dyn SignalJournalPort,
    pub alerts: &'a dyn AlertPort,
    pub grader: &'a dyn SetupGraderPort,
    pub classifier: &'a dyn WinProbabilityPort,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub at: DateTime<Utc>,
    /// Instruments that had data this cycle.
    pub evaluated: Vec<String>,
    /// Instruments skipped for missing or failed data.
    pub dropped: Vec<String>,
    /// Candidates before the correlation filter.
    pub candidates: usize,
    pub accepted: Vec<CandidateSignal>,
    /// Journal ids of the accepted signals that were logged.
    pub journal_ids: Vec<i64>,
    pub theme: Option<Theme>,
}

/// All timeframes for one instrument up to `now`. `None` when a required
/// timeframe is missing or failed.
pub fn fetch_market(
    profile: &InstrumentProfile,
    port: &dyn MarketDataPort,
    history: &HistoryWindow,
    now: DateTime<Utc>,
) -> Option<MarketData> {
    fetch_range(profile, port, history, now, now)
}

/// All timeframes from `history` before `from` through `to`.
pub fn fetch_range(
    profile: &InstrumentProfile,
    port: &dyn MarketDataPort,
    history: &HistoryWindow,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Option<MarketData> {
    let mut data = MarketData::new(profile.symbol.clone());
    for tf in Timeframe::ALL {
        let required = REQUIRED_TIMEFRAMES.contains(&tf);
        match port.fetch(&profile.symbol, tf, from - history.span(tf), to) {
            Ok(Some(series)) if !series.is_empty() => data.insert(series),
            Ok(_) if required => {
                warn!("{}: no {} data, skipping", profile.symbol, tf);
                return None;
            }
            Ok(_) => debug!("{}: no {} data", profile.symbol, tf),
            Err(e) if required => {
                warn!("{}: {} fetch failed, skipping: {}", profile.symbol, tf, e);
                return None;
            }
            Err(e) => debug!("{}: optional {} fetch failed: {}", profile.symbol, tf, e),
        }
    }
    Some(data)
}

/// Tuning snapshot from the journal's resolved outcomes. A journal failure
/// leaves the engine untuned.
pub fn load_tuning(journal: &dyn SignalJournalPort, cfg: &FeedbackConfig) -> TuningParameters {
    match journal.resolved_outcomes(cfg.history_limit) {
        Ok(outcomes) => TuningParameters::from_outcomes(&outcomes, cfg),
        Err(e) => {
            warn!("could not read resolved outcomes, running untuned: {}", e);
            TuningParameters::default()
        }
    }
}

/// Candidates for every (instrument, strategy) pair in `markets`, in
/// instrument-then-strategy order.
pub fn analyze_markets(
    markets: &[(&InstrumentProfile, MarketData)],
    strategies: &[Box<dyn Strategy>],
    ctx: &CycleContext,
    now: DateTime<Utc>,
) -> Vec<CandidateSignal> {
    let pairs: Vec<(&InstrumentProfile, &MarketData, &dyn Strategy)> = markets
        .iter()
        .flat_map(|(profile, data)| {
            strategies
                .iter()
                .map(move |s| (*profile, data, s.as_ref()))
        })
        .collect();

    pairs
        .par_iter()
        .filter_map(|(profile, data, strategy)| strategy.analyze(profile, &data.view_at(now), ctx))
        .collect()
}

pub fn run_cycle(
    config: &EngineConfig,
    tuning: &TuningParameters,
    strategies: &[Box<dyn Strategy>],
    collab: Collaborators,
    now: DateTime<Utc>,
) -> Result<CycleReport, SweepscanError> {
    let profiles: Vec<&InstrumentProfile> = config.instruments.profiles().collect();

    let fetched: Vec<(&InstrumentProfile, Option<MarketData>)> = profiles
        .par_iter()
        .map(|p| (*p, fetch_market(p, collab.market_data, &config.history, now)))
        .collect();

    let mut markets = Vec::with_capacity(fetched.len());
    let mut dropped = Vec::new();
    for (profile, data) in fetched {
        match data {
            Some(d) => markets.push((profile, d)),
            None => dropped.push(profile.symbol.clone()),
        }
    }
    if markets.is_empty() && !profiles.is_empty() {
        return Err(SweepscanError::CycleFailed {
            reason: format!("no market data for any of {} instruments", profiles.len()),
        });
    }

    let ctx = CycleContext {
        config,
        tuning,
        grader: collab.grader,
        classifier: collab.classifier,
    };
    let candidates = analyze_markets(&markets, strategies, &ctx, now);
    let candidate_count = candidates.len();

    let accepted = filter_conflicts(candidates, &config.instruments);
    let theme = dominant_theme(&accepted, &config.instruments);
    if let Some(t) = &theme {
        info!("dominant theme: {}", t);
    }

    let mut journal_ids = Vec::with_capacity(accepted.len());
    for signal in &accepted {
        match collab.journal.log_signal(signal) {
            Ok(id) => journal_ids.push(id),
            Err(e) => warn!("{} {}: journal write failed: {}", signal.instrument, signal.strategy_id, e),
        }
        if let Err(e) = collab.alerts.deliver(signal, &format_alert(signal)) {
            warn!("{} {}: alert delivery failed: {}", signal.instrument, signal.strategy_id, e);
        }
    }

    info!(
        "cycle {}: {} instruments, {} dropped, {} candidates, {} accepted",
        now,
        markets.len(),
        dropped.len(),
        candidate_count,
        accepted.len()
    );

    Ok(CycleReport {
        at: now,
        evaluated: markets.iter().map(|(p, _)| p.symbol.clone()).collect(),
        dropped,
        candidates: candidate_count,
        accepted,
        journal_ids,
        theme,
    })
}
