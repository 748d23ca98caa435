//! Structural feature extractors.
//!
//! Every extractor is a pure function of bar slices and returns `None` or
//! `false` when history is too short or a denominator is zero.

pub mod displacement;
pub mod imbalance;
pub mod momentum;
pub mod phase;
pub mod ranges;
pub mod session;
pub mod sweep;
pub mod trend;
pub mod value_area;

use displacement::DEFAULT_MIN_BODY_RATIO;
use momentum::MomentumConfig;
use phase::PhaseClassifier;
use session::SessionWindows;
use sweep::SweepDetector;
use value_area::ValueAreaConfig;

/// Tunables for all extractors, loaded from the `[features]` and
/// `[session]` config sections.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureConfig {
    pub sweep: SweepDetector,
    pub displacement_ratio: f64,
    /// Three-bar sequences scanned for imbalances.
    pub gap_window: usize,
    /// Fractional widening of a gap band when testing price.
    pub gap_tolerance: f64,
    pub phase: PhaseClassifier,
    pub value_area: ValueAreaConfig,
    pub adr_days: usize,
    pub adr_threshold: f64,
    pub asian_start_hour: u32,
    pub asian_end_hour: u32,
    pub trend_ema: usize,
    pub macro_ema: usize,
    /// Slow EMA on the entry timeframe used by the price-action strategy.
    pub slow_ema: usize,
    pub momentum: MomentumConfig,
    pub sessions: SessionWindows,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sweep: SweepDetector::default(),
            displacement_ratio: DEFAULT_MIN_BODY_RATIO,
            gap_window: 10,
            gap_tolerance: 0.001,
            phase: PhaseClassifier::default(),
            value_area: ValueAreaConfig::default(),
            adr_days: 20,
            adr_threshold: 0.95,
            asian_start_hour: 0,
            asian_end_hour: 8,
            trend_ema: 100,
            macro_ema: 20,
            slow_ema: 50,
            momentum: MomentumConfig::default(),
            sessions: SessionWindows::default(),
        }
    }
}
