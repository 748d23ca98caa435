//! Technical indicators over bar slices.
//!
//! - `IndicatorPoint`: one value in an indicator time series, with a warmup flag
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: aligned 1:1 with the input bars

pub mod atr;
pub mod ema;
pub mod rsi;
pub mod sma;
pub mod stddev;

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Stddev(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn empty(indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Value at `index` if it is past warmup.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    /// Value on the last bar if it is past warmup.
    pub fn last(&self) -> Option<f64> {
        self.values.last().filter(|p| p.valid).map(|p| p.value)
    }

    /// Value `back` bars before the last one.
    pub fn from_end(&self, back: usize) -> Option<f64> {
        let len = self.values.len();
        if back >= len {
            return None;
        }
        self.value_at(len - 1 - back)
    }

    /// Valid values only, in order.
    pub fn valid_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter(|p| p.valid)
            .map(|p| p.value)
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(valid: bool, value: f64) -> IndicatorPoint {
        IndicatorPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            valid,
            value,
        }
    }

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Ema(100).to_string(), "EMA(100)");
        assert_eq!(IndicatorType::Atr(14).to_string(), "ATR(14)");
    }

    #[test]
    fn accessors_skip_warmup() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(2),
            values: vec![point(false, 0.0), point(true, 1.5), point(true, 2.5)],
        };
        assert_eq!(series.value_at(0), None);
        assert_eq!(series.last(), Some(2.5));
        assert_eq!(series.from_end(1), Some(1.5));
        assert_eq!(series.from_end(2), None);
        assert_eq!(series.from_end(3), None);
        assert_eq!(series.valid_values(), vec![1.5, 2.5]);
    }
}
