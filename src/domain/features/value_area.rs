//! Value area estimation.
//!
//! Two methods with different accuracy, never interchangeable:
//! - `VolumeProfile`: volume binned by close over the last N bars; the point
//!   of control is the midpoint of the heaviest bin and the band is
//!   POC ± `band_atr` × ATR.
//! - `RollingApprox`: rolling mean ± 1 standard deviation of close. A cheap
//!   stand-in used for long historical replays; it ignores volume.

use crate::domain::indicator::stddev::mean_and_stddev;
use crate::domain::ohlcv::OhlcvBar;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueAreaMethod {
    VolumeProfile,
    RollingApprox,
}

impl ValueAreaMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volume_profile" => Some(ValueAreaMethod::VolumeProfile),
            "rolling_approx" => Some(ValueAreaMethod::RollingApprox),
            _ => None,
        }
    }
}

impl fmt::Display for ValueAreaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueAreaMethod::VolumeProfile => f.write_str("volume_profile"),
            ValueAreaMethod::RollingApprox => f.write_str("rolling_approx"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueArea {
    pub method: ValueAreaMethod,
    /// Point of control for the volume profile, rolling mean for the approximation.
    pub center: f64,
    pub low: f64,
    pub high: f64,
}

impl ValueArea {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAreaConfig {
    pub method: ValueAreaMethod,
    pub lookback: usize,
    pub bins: usize,
    pub band_atr: f64,
    pub approx_window: usize,
}

impl Default for ValueAreaConfig {
    fn default() -> Self {
        Self {
            method: ValueAreaMethod::VolumeProfile,
            lookback: 200,
            bins: 50,
            band_atr: 0.5,
            approx_window: 100,
        }
    }
}

impl ValueAreaConfig {
    /// Value area with the configured method. `atr` is only read by the
    /// volume profile.
    pub fn estimate(&self, bars: &[OhlcvBar], atr: f64) -> Option<ValueArea> {
        match self.method {
            ValueAreaMethod::VolumeProfile => {
                volume_profile(bars, self.lookback, self.bins, atr, self.band_atr)
            }
            ValueAreaMethod::RollingApprox => rolling_approx(bars, self.approx_window),
        }
    }
}

/// Point of control of the last `lookback` bars.
pub fn point_of_control(bars: &[OhlcvBar], lookback: usize, bins: usize) -> Option<f64> {
    if bars.is_empty() || bins == 0 || lookback == 0 {
        return None;
    }
    let window = &bars[bars.len().saturating_sub(lookback)..];
    let min = window.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    let max = window
        .iter()
        .map(|b| b.close)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= 0.0 {
        return Some(min);
    }

    let width = span / bins as f64;
    let mut volume = vec![0.0_f64; bins];
    for bar in window {
        let idx = (((bar.close - min) / width) as usize).min(bins - 1);
        volume[idx] += bar.volume;
    }

    // first heaviest bin
    let mut best = 0;
    for (i, &v) in volume.iter().enumerate() {
        if v > volume[best] {
            best = i;
        }
    }
    Some(min + (best as f64 + 0.5) * width)
}

pub fn volume_profile(
    bars: &[OhlcvBar],
    lookback: usize,
    bins: usize,
    atr: f64,
    band_atr: f64,
) -> Option<ValueArea> {
    if !atr.is_finite() || atr <= 0.0 {
        return None;
    }
    let poc = point_of_control(bars, lookback, bins)?;
    Some(ValueArea {
        method: ValueAreaMethod::VolumeProfile,
        center: poc,
        low: poc - band_atr * atr,
        high: poc + band_atr * atr,
    })
}

pub fn rolling_approx(bars: &[OhlcvBar], window: usize) -> Option<ValueArea> {
    if window == 0 || bars.len() < window {
        return None;
    }
    let (mean, sd) = mean_and_stddev(&bars[bars.len() - window..]);
    Some(ValueArea {
        method: ValueAreaMethod::RollingApprox,
        center: mean,
        low: mean - sd,
        high: mean + sd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(rows: &[(f64, f64)]) -> Vec<OhlcvBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(close, volume))| {
                OhlcvBar::new(start + Duration::minutes(5 * i as i64), close, close, close, close, volume)
            })
            .collect()
    }

    #[test]
    fn poc_is_midpoint_of_heaviest_bin() {
        // closes span 1.0..2.0 over 10 bins of width 0.1; heavy volume at 1.25
        let b = bars(&[(1.0, 10.0), (1.25, 500.0), (1.5, 20.0), (2.0, 10.0)]);
        let poc = point_of_control(&b, 200, 10).unwrap();
        assert!((poc - 1.25).abs() < 1e-9);
    }

    #[test]
    fn poc_of_constant_closes_is_that_close() {
        let b = bars(&[(1.2, 1.0), (1.2, 5.0)]);
        assert_eq!(point_of_control(&b, 200, 50), Some(1.2));
    }

    #[test]
    fn poc_empty_is_none() {
        assert!(point_of_control(&[], 200, 50).is_none());
    }

    #[test]
    fn volume_profile_band_uses_atr() {
        let b = bars(&[(1.0, 10.0), (1.25, 500.0), (2.0, 10.0)]);
        let va = volume_profile(&b, 200, 10, 0.2, 0.5).unwrap();
        assert_eq!(va.method, ValueAreaMethod::VolumeProfile);
        assert!((va.low - 1.15).abs() < 1e-9);
        assert!((va.high - 1.35).abs() < 1e-9);
        assert!(va.contains(1.3));
        assert!(!va.contains(1.4));
        assert!(volume_profile(&b, 200, 10, 0.0, 0.5).is_none());
    }

    #[test]
    fn rolling_approx_is_mean_plus_minus_stddev() {
        let b = bars(&[(2.0, 1.0), (4.0, 1.0), (4.0, 1.0), (4.0, 1.0), (5.0, 1.0), (5.0, 1.0), (7.0, 1.0), (9.0, 1.0)]);
        let va = rolling_approx(&b, 8).unwrap();
        assert_eq!(va.method, ValueAreaMethod::RollingApprox);
        assert!((va.center - 5.0).abs() < 1e-12);
        assert!((va.low - 3.0).abs() < 1e-12);
        assert!((va.high - 7.0).abs() < 1e-12);
        assert!(rolling_approx(&b, 9).is_none());
    }

    #[test]
    fn method_parse() {
        assert_eq!(ValueAreaMethod::parse("rolling_approx"), Some(ValueAreaMethod::RollingApprox));
        assert_eq!(ValueAreaMethod::parse("bogus"), None);
    }
}
