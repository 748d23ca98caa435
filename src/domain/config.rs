//! Engine configuration assembled from the INI sections.
//!
//! Every value has a default, so an empty file yields the stock engine.
//! Values are range-checked by [`validate_engine_config`] before they are
//! read.

use crate::domain::config_validation::validate_engine_config;
use crate::domain::error::SweepscanError;
use crate::domain::features::FeatureConfig;
use crate::domain::features::session::SessionWindows;
use crate::domain::features::value_area::ValueAreaMethod;
use crate::domain::feedback::FeedbackConfig;
use crate::domain::instrument::{InstrumentBook, InstrumentProfile};
use crate::domain::levels::LevelConfig;
use crate::domain::lifecycle::{LifecycleConfig, TieBreakPolicy};
use crate::domain::scoring::ScoringRules;
use crate::domain::sizing::SizingConfig;
use crate::domain::strategy::STRATEGY_IDS;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::Duration;

/// How the external grade and the classifier feed into acceptance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingConfig {
    /// Weight of the external grade in the blended confidence.
    pub blend_weight: f64,
    /// Candidates below this win probability are dropped. 0 disables the gate.
    pub min_win_probability: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            blend_weight: 0.3,
            min_win_probability: 0.0,
        }
    }
}

/// Days of history requested per timeframe in a live cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    pub m5_days: i64,
    pub m15_days: i64,
    pub h1_days: i64,
    pub h4_days: i64,
    pub d1_days: i64,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            m5_days: 3,
            m15_days: 10,
            h1_days: 30,
            h4_days: 60,
            d1_days: 200,
        }
    }
}

impl HistoryWindow {
    pub fn span(&self, timeframe: Timeframe) -> Duration {
        let days = match timeframe {
            Timeframe::M5 => self.m5_days,
            Timeframe::M15 => self.m15_days,
            Timeframe::H1 => self.h1_days,
            Timeframe::H4 => self.h4_days,
            Timeframe::D1 => self.d1_days,
        };
        Duration::days(days)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub instruments: InstrumentBook,
    /// Enabled strategy ids, in evaluation order.
    pub strategies: Vec<String>,
    pub features: FeatureConfig,
    pub scoring: ScoringRules,
    pub levels: LevelConfig,
    pub sizing: SizingConfig,
    pub lifecycle: LifecycleConfig,
    pub feedback: FeedbackConfig,
    pub grading: GradingConfig,
    pub history: HistoryWindow,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: InstrumentBook::standard(),
            strategies: STRATEGY_IDS.iter().map(|s| s.to_string()).collect(),
            features: FeatureConfig::default(),
            scoring: ScoringRules::default(),
            levels: LevelConfig::default(),
            sizing: SizingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            feedback: FeedbackConfig::default(),
            grading: GradingConfig::default(),
            history: HistoryWindow::default(),
        }
    }
}

pub(crate) fn get_usize(config: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    config.get_int(section, key, default as i64).max(0) as usize
}

pub(crate) fn get_opt_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Option<f64> {
    config
        .get_string(section, key)
        .and_then(|v| v.trim().parse::<f64>().ok())
}

/// Parses "8-22" into (8, 22).
pub(crate) fn parse_hours(value: &str) -> Option<(u32, u32)> {
    let (start, end) = value.trim().split_once('-')?;
    let start: u32 = start.trim().parse().ok()?;
    let end: u32 = end.trim().parse().ok()?;
    (start < end && end <= 24).then_some((start, end))
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SweepscanError> {
        validate_engine_config(config)?;
        let d = Self::default();

        let instruments = load_instruments(config);
        let strategies = config.get_list("engine", "strategies").unwrap_or(d.strategies);

        Ok(Self {
            instruments,
            strategies,
            features: load_features(config, &d.features),
            scoring: load_scoring(config, &d.scoring),
            levels: load_levels(config, &d.levels),
            sizing: SizingConfig {
                equity: config.get_double("sizing", "equity", d.sizing.equity),
                risk_pct: config.get_double("sizing", "risk_pct", d.sizing.risk_pct),
                max_risk_pct: config.get_double("sizing", "max_risk_pct", d.sizing.max_risk_pct),
            },
            lifecycle: load_lifecycle(config, &d.lifecycle),
            feedback: load_feedback(config, &d.feedback),
            grading: GradingConfig {
                blend_weight: config.get_double("grading", "blend_weight", d.grading.blend_weight),
                min_win_probability: config.get_double(
                    "grading",
                    "min_win_probability",
                    d.grading.min_win_probability,
                ),
            },
            history: HistoryWindow {
                m5_days: config.get_int("data", "m5_days", d.history.m5_days),
                m15_days: config.get_int("data", "m15_days", d.history.m15_days),
                h1_days: config.get_int("data", "h1_days", d.history.h1_days),
                h4_days: config.get_int("data", "h4_days", d.history.h4_days),
                d1_days: config.get_int("data", "d1_days", d.history.d1_days),
            },
        })
    }
}

fn load_instruments(config: &dyn ConfigPort) -> InstrumentBook {
    let standard = InstrumentBook::standard();
    let mut book = match config.get_list("instruments", "symbols") {
        Some(symbols) if !symbols.is_empty() => {
            let upper: Vec<String> = symbols.iter().map(|s| s.to_ascii_uppercase()).collect();
            standard.restricted_to(&upper)
        }
        _ => standard,
    };

    for symbol in book.symbols() {
        if let Some(profile) = book.get_mut(&symbol) {
            apply_profile_overrides(config, profile);
        }
    }
    book
}

fn apply_profile_overrides(config: &dyn ConfigPort, p: &mut InstrumentProfile) {
    let section = format!("instrument.{}", p.symbol);
    let s = section.as_str();

    if let Some(legs) = config.get_list(s, "legs").filter(|l| !l.is_empty()) {
        p.legs = legs.iter().map(|l| l.to_ascii_uppercase()).collect();
    }
    p.pip_size = config.get_double(s, "pip_size", p.pip_size);
    p.pip_value = config.get_double(s, "pip_value", p.pip_value);
    p.min_lot = config.get_double(s, "min_lot", p.min_lot);
    p.confidence_threshold = config.get_double(s, "confidence_threshold", p.confidence_threshold);
    p.asian_min_pips = config.get_double(s, "asian_min_pips", p.asian_min_pips);
    if let Some(v) = get_opt_f64(config, s, "sweep_lookback") {
        p.sweep_lookback = Some(v.max(1.0) as usize);
    }
    if let Some(v) = get_opt_f64(config, s, "partial_atr") {
        p.partial_atr = Some(v);
    }
    if let Some(v) = get_opt_f64(config, s, "breakeven_atr") {
        p.breakeven_atr = Some(v);
    }
    if let Some(hours) = config.get_string(s, "session_hours").as_deref().and_then(parse_hours) {
        p.session_hours = Some(hours);
    }

    let o = &mut p.scoring;
    o.alpha_bonus = config.get_double(s, "alpha_bonus", o.alpha_bonus);
    if let Some(v) = get_opt_f64(config, s, "misalignment_penalty") {
        o.misalignment_penalty = Some(v);
    }
    o.low_quality_asian_penalty =
        config.get_double(s, "low_quality_asian_penalty", o.low_quality_asian_penalty);
    o.trap_penalty = config.get_double(s, "trap_penalty", o.trap_penalty);
    o.half_trap_penalty = config.get_double(s, "half_trap_penalty", o.half_trap_penalty);
    if let Some(v) = get_opt_f64(config, s, "premium_threshold") {
        o.premium_threshold = Some(v);
    }
    o.premium_bonus = config.get_double(s, "premium_bonus", o.premium_bonus);
}

fn load_features(config: &dyn ConfigPort, d: &FeatureConfig) -> FeatureConfig {
    let mut f = d.clone();
    let s = "features";

    f.sweep.min_wick_ratio = config.get_double(s, "min_wick_ratio", f.sweep.min_wick_ratio);
    f.sweep.lookbacks.primary = get_usize(config, s, "lookback_primary", f.sweep.lookbacks.primary);
    f.sweep.lookbacks.secondary =
        get_usize(config, s, "lookback_secondary", f.sweep.lookbacks.secondary);
    f.sweep.lookbacks.off_hours =
        get_usize(config, s, "lookback_off_hours", f.sweep.lookbacks.off_hours);
    f.sweep.recent_window = get_usize(config, s, "recent_window", f.sweep.recent_window);
    f.displacement_ratio = config.get_double(s, "displacement_ratio", f.displacement_ratio);
    f.gap_window = get_usize(config, s, "gap_window", f.gap_window);
    f.gap_tolerance = config.get_double(s, "gap_tolerance", f.gap_tolerance);
    f.phase.range_bars = get_usize(config, s, "phase_range_bars", f.phase.range_bars);
    f.phase.recent_bars = get_usize(config, s, "phase_recent_bars", f.phase.recent_bars);
    if let Some(method) = config
        .get_string(s, "value_area_method")
        .as_deref()
        .and_then(ValueAreaMethod::parse)
    {
        f.value_area.method = method;
    }
    f.value_area.lookback = get_usize(config, s, "value_area_lookback", f.value_area.lookback);
    f.value_area.bins = get_usize(config, s, "value_area_bins", f.value_area.bins);
    f.value_area.band_atr = config.get_double(s, "value_area_band_atr", f.value_area.band_atr);
    f.adr_days = get_usize(config, s, "adr_days", f.adr_days);
    f.adr_threshold = config.get_double(s, "adr_threshold", f.adr_threshold);
    f.trend_ema = get_usize(config, s, "trend_ema", f.trend_ema);
    f.macro_ema = get_usize(config, s, "macro_ema", f.macro_ema);
    f.slow_ema = get_usize(config, s, "slow_ema", f.slow_ema);
    f.momentum.atr_period = get_usize(config, s, "atr_period", f.momentum.atr_period);
    f.momentum.rsi_period = get_usize(config, s, "rsi_period", f.momentum.rsi_period);
    f.momentum.fast_ema = get_usize(config, s, "fast_ema", f.momentum.fast_ema);

    if let Some(hours) = config.get_string("session", "asian").as_deref().and_then(parse_hours) {
        f.asian_start_hour = hours.0;
        f.asian_end_hour = hours.1;
    }
    if let Some(windows) = config
        .get_string("session", "windows")
        .as_deref()
        .and_then(SessionWindows::parse)
    {
        f.sessions = windows;
    }
    f
}

fn load_scoring(config: &dyn ConfigPort, d: &ScoringRules) -> ScoringRules {
    let s = "scoring";
    let g = |key: &str, default: f64| config.get_double(s, key, default);
    ScoringRules {
        base_aligned: g("base_aligned", d.base_aligned),
        base_misaligned: g("base_misaligned", d.base_misaligned),
        sweep_m5: g("sweep_m5", d.sweep_m5),
        sweep_m15: g("sweep_m15", d.sweep_m15),
        sweep_htf: g("sweep_htf", d.sweep_htf),
        displacement: g("displacement", d.displacement),
        no_displacement: g("no_displacement", d.no_displacement),
        pullback: g("pullback", d.pullback),
        volatility: g("volatility", d.volatility),
        gap: g("gap", d.gap),
        asian_quality: g("asian_quality", d.asian_quality),
        asian_low_quality: g("asian_low_quality", d.asian_low_quality),
        adr_exhausted: g("adr_exhausted", d.adr_exhausted),
        at_value: g("at_value", d.at_value),
        htf_sweep: g("htf_sweep", d.htf_sweep),
        phase_confirm: g("phase_confirm", d.phase_confirm),
        phase_manipulation: g("phase_manipulation", d.phase_manipulation),
        phase_oppose: g("phase_oppose", d.phase_oppose),
        overextension_limit: g("overextension_limit", d.overextension_limit),
        overextension: g("overextension", d.overextension),
        macro_aligned: g("macro_aligned", d.macro_aligned),
        macro_opposed: g("macro_opposed", d.macro_opposed),
    }
}

fn load_levels(config: &dyn ConfigPort, d: &LevelConfig) -> LevelConfig {
    let s = "levels";
    LevelConfig {
        stop_atr: config.get_double(s, "stop_atr", d.stop_atr),
        partial_atr: config.get_double(s, "partial_atr", d.partial_atr),
        tp1_atr: config.get_double(s, "tp1_atr", d.tp1_atr),
        breakeven_atr: config.get_double(s, "breakeven_atr", d.breakeven_atr),
        tp2_overlap: config.get_double(s, "tp2_overlap", d.tp2_overlap),
        tp2_active: config.get_double(s, "tp2_active", d.tp2_active),
        tp2_quiet: config.get_double(s, "tp2_quiet", d.tp2_quiet),
    }
}

fn load_lifecycle(config: &dyn ConfigPort, d: &LifecycleConfig) -> LifecycleConfig {
    let s = "lifecycle";
    let mut l = *d;
    l.max_forward_bars = get_usize(config, s, "max_forward_bars", l.max_forward_bars);
    if let Some(policy) = config
        .get_string(s, "tie_break")
        .as_deref()
        .and_then(TieBreakPolicy::parse)
    {
        l.tie_break = policy;
    }
    let r = &mut l.rewards;
    r.partial_fraction = config.get_double(s, "partial_fraction", r.partial_fraction);
    r.partial_r = config.get_double(s, "partial_r", r.partial_r);
    r.runner_r = config.get_double(s, "runner_r", r.runner_r);
    r.trail_r = config.get_double(s, "trail_r", r.trail_r);
    r.loss_r = config.get_double(s, "loss_r", r.loss_r);
    l
}

fn load_feedback(config: &dyn ConfigPort, d: &FeedbackConfig) -> FeedbackConfig {
    let s = "feedback";
    let mut f = *d;
    f.history_limit = get_usize(config, s, "history_limit", f.history_limit);
    let o = &mut f.optimizer;
    o.window = get_usize(config, s, "window", o.window);
    o.tighten_above = config.get_double(s, "tighten_above", o.tighten_above);
    o.widen_below = config.get_double(s, "widen_below", o.widen_below);
    o.min_samples = get_usize(config, s, "min_samples", o.min_samples);
    o.tighten_multiplier = config.get_double(s, "tighten_multiplier", o.tighten_multiplier);
    o.widen_multiplier = config.get_double(s, "widen_multiplier", o.widen_multiplier);
    o.default_multiplier = config.get_double(s, "default_multiplier", o.default_multiplier);
    let w = &mut f.weighter;
    w.strong_win_rate = config.get_double(s, "strong_win_rate", w.strong_win_rate);
    w.weak_win_rate = config.get_double(s, "weak_win_rate", w.weak_win_rate);
    w.max_multiplier = config.get_double(s, "max_multiplier", w.max_multiplier);
    w.weak_multiplier = config.get_double(s, "weak_multiplier", w.weak_multiplier);
    f
}
