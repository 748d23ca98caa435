//! Instrument identity: exposure legs, pip arithmetic and per-instrument
//! overrides.
//!
//! Instrument-specific behavior is carried here as data. Shared logic reads
//! the profile and never branches on the symbol.

use crate::domain::error::SweepscanError;
use std::collections::BTreeMap;

/// Score adjustments that only some instruments carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringOverrides {
    /// Flat bonus for historically strong instruments.
    pub alpha_bonus: f64,
    /// Added when the higher timeframe disagrees with the trade direction.
    pub misalignment_penalty: Option<f64>,
    /// Extra penalty on top of the rule penalty for a low-quality Asian sweep.
    pub low_quality_asian_penalty: f64,
    /// Applied when displacement and gap confluence are both absent.
    pub trap_penalty: f64,
    /// Applied when exactly one of displacement and gap confluence is absent.
    pub half_trap_penalty: f64,
    /// Bonus granted once the score reaches `premium_threshold`.
    pub premium_threshold: Option<f64>,
    pub premium_bonus: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentProfile {
    pub symbol: String,
    /// Exposure legs. A pair has two (base, quote); a stand-alone asset one.
    pub legs: Vec<String>,
    /// Price distance of one pip.
    pub pip_size: f64,
    /// Monetary value of one pip for one minimum lot.
    pub pip_value: f64,
    pub min_lot: f64,
    pub confidence_threshold: f64,
    /// Pins the sweep lookback instead of the session-adaptive value.
    pub sweep_lookback: Option<usize>,
    pub partial_atr: Option<f64>,
    pub breakeven_atr: Option<f64>,
    /// Minimum Asian range, in pips, for the range to count as quality.
    pub asian_min_pips: f64,
    /// Trading window (start hour inclusive, end hour exclusive), replacing
    /// the default session windows.
    pub session_hours: Option<(u32, u32)>,
    pub scoring: ScoringOverrides,
}

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 8.0;
pub const DEFAULT_ASIAN_MIN_PIPS: f64 = 15.0;

impl InstrumentProfile {
    /// Profile inferred from a six-letter currency pair symbol, or a
    /// single-leg asset otherwise.
    pub fn generic(symbol: &str) -> Self {
        let symbol = symbol.to_ascii_uppercase();
        let is_pair = symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic());
        let legs = if is_pair {
            vec![symbol[..3].to_string(), symbol[3..].to_string()]
        } else {
            vec![symbol.clone()]
        };
        let pip_size = if symbol.ends_with("JPY") {
            0.01
        } else if is_pair {
            0.0001
        } else {
            1.0
        };
        Self {
            symbol,
            legs,
            pip_size,
            pip_value: 0.10,
            min_lot: 0.01,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            sweep_lookback: None,
            partial_atr: None,
            breakeven_atr: None,
            asian_min_pips: DEFAULT_ASIAN_MIN_PIPS,
            session_hours: None,
            scoring: ScoringOverrides::default(),
        }
    }

    /// Distance in price converted to pips.
    pub fn to_pips(&self, distance: f64) -> f64 {
        if self.pip_size > 0.0 {
            distance / self.pip_size
        } else {
            0.0
        }
    }
}

/// The configured instrument universe.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBook {
    profiles: BTreeMap<String, InstrumentProfile>,
    order: Vec<String>,
}

impl InstrumentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default universe: four majors, gold and the Nasdaq index.
    pub fn standard() -> Self {
        let mut book = Self::new();

        book.insert(InstrumentProfile::generic("EURUSD"));
        book.insert(InstrumentProfile::generic("GBPUSD"));
        book.insert(InstrumentProfile::generic("AUDUSD"));

        let mut usdjpy = InstrumentProfile::generic("USDJPY");
        usdjpy.pip_value = 0.065;
        usdjpy.scoring.alpha_bonus = 1.0;
        book.insert(usdjpy);

        book.insert(gold_profile());

        let mut nasdaq = InstrumentProfile::generic("NAS100");
        nasdaq.legs = vec!["NASDAQ".into()];
        nasdaq.pip_value = 0.01;
        nasdaq.scoring.alpha_bonus = 1.0;
        book.insert(nasdaq);

        book
    }

    /// Adds or replaces a profile. Insertion order is the evaluation order.
    pub fn insert(&mut self, profile: InstrumentProfile) {
        let key = profile.symbol.clone();
        if !self.profiles.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.profiles.insert(key, profile);
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentProfile> {
        self.profiles.get(&symbol.to_ascii_uppercase())
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut InstrumentProfile> {
        self.profiles.get_mut(&symbol.to_ascii_uppercase())
    }

    pub fn profile(&self, symbol: &str) -> Result<&InstrumentProfile, SweepscanError> {
        self.get(symbol)
            .ok_or_else(|| SweepscanError::UnknownInstrument(symbol.to_string()))
    }

    /// Keeps only `symbols`, in that order. Unknown symbols get a generic profile.
    pub fn restricted_to(&self, symbols: &[String]) -> Self {
        let mut book = Self::new();
        for symbol in symbols {
            let profile = self
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| InstrumentProfile::generic(symbol));
            book.insert(profile);
        }
        book
    }

    pub fn profiles(&self) -> impl Iterator<Item = &InstrumentProfile> {
        self.order.iter().filter_map(|s| self.profiles.get(s))
    }

    pub fn symbols(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Gold: high volatility, faster momentum decay, stricter scoring.
fn gold_profile() -> InstrumentProfile {
    InstrumentProfile {
        symbol: "XAUUSD".into(),
        legs: vec!["XAU".into(), "USD".into()],
        pip_size: 1.0,
        pip_value: 0.10,
        min_lot: 0.01,
        confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        sweep_lookback: Some(20),
        partial_atr: Some(0.3),
        breakeven_atr: Some(0.5),
        asian_min_pips: 20.0,
        session_hours: Some((8, 22)),
        scoring: ScoringOverrides {
            alpha_bonus: 0.0,
            misalignment_penalty: Some(-2.5),
            low_quality_asian_penalty: -3.0,
            trap_penalty: -3.0,
            half_trap_penalty: -1.0,
            premium_threshold: Some(9.0),
            premium_bonus: 1.0,
        },
    }
}
