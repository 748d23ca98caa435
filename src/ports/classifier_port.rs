//! Win-probability classifier port trait.

use crate::domain::error::SweepscanError;

/// Fallback probability when the classifier is absent or fails.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierFeatures {
    pub rsi: f64,
    pub body_ratio: f64,
    /// ATR divided by close.
    pub normalized_atr: f64,
    pub displaced: bool,
    pub trend_aligned: bool,
}

impl ClassifierFeatures {
    /// Fixed-order feature vector.
    pub fn to_vector(&self) -> [f64; 5] {
        [
            self.rsi,
            self.body_ratio,
            self.normalized_atr,
            if self.displaced { 1.0 } else { 0.0 },
            if self.trend_aligned { 1.0 } else { 0.0 },
        ]
    }
}

pub trait WinProbabilityPort: Send + Sync {
    /// Estimate in [0, 1].
    fn predict(&self, features: &ClassifierFeatures) -> Result<f64, SweepscanError>;
}
