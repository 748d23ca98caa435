//! OHLCV bars and validated per-timeframe bar series.

use crate::domain::error::SweepscanError;
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Utc};

/// One price bar. `timestamp` is the bar's open time in UTC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// high >= max(open, close) >= min(open, close) >= low, volume >= 0, all finite.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.open.max(self.close)
            && self.open.min(self.close) >= self.low
            && self.volume >= 0.0
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// body / range, `None` on a zero-range bar.
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 {
            Some(self.body() / range)
        } else {
            None
        }
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Ordered bars for one (instrument, timeframe) pair.
///
/// Timestamps are strictly increasing and every bar is well formed. Gaps
/// between bars are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    instrument: String,
    timeframe: Timeframe,
    bars: Vec<OhlcvBar>,
}

impl BarSeries {
    pub fn new(
        instrument: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<OhlcvBar>,
    ) -> Result<Self, SweepscanError> {
        let instrument = instrument.into();
        let invalid = |reason: String| SweepscanError::InvalidSeries {
            instrument: instrument.clone(),
            timeframe: timeframe.to_string(),
            reason,
        };

        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_well_formed() {
                return Err(invalid(format!("malformed bar at {}", bar.timestamp)));
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(invalid(format!(
                    "timestamp {} is not after {}",
                    bar.timestamp,
                    bars[i - 1].timestamp
                )));
            }
        }

        Ok(Self {
            instrument,
            timeframe,
            bars,
        })
    }

    /// Sorts by timestamp before validating. Duplicates are still rejected.
    pub fn from_unsorted(
        instrument: impl Into<String>,
        timeframe: Timeframe,
        mut bars: Vec<OhlcvBar>,
    ) -> Result<Self, SweepscanError> {
        bars.sort_by_key(|b| b.timestamp);
        Self::new(instrument, timeframe, bars)
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// Bars that had fully closed by `cutoff`.
    pub fn closed_by(&self, cutoff: DateTime<Utc>) -> &[OhlcvBar] {
        let span = self.timeframe.duration();
        let end = self.bars.partition_point(|b| b.timestamp + span <= cutoff);
        &self.bars[..end]
    }

    /// Bars opening at or after `start`.
    pub fn starting_at(&self, start: DateTime<Utc>) -> &[OhlcvBar] {
        let begin = self.bars.partition_point(|b| b.timestamp < start);
        &self.bars[begin..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn sample_bar() -> OhlcvBar {
        OhlcvBar::new(ts(10, 0), 100.0, 110.0, 90.0, 105.0, 50_000.0)
    }

    #[test]
    fn wicks_and_body() {
        let bar = sample_bar();
        assert!((bar.range() - 20.0).abs() < f64::EPSILON);
        assert!((bar.body() - 5.0).abs() < f64::EPSILON);
        assert!((bar.upper_wick() - 5.0).abs() < f64::EPSILON);
        assert!((bar.lower_wick() - 10.0).abs() < f64::EPSILON);
        assert!((bar.body_ratio().unwrap() - 0.25).abs() < f64::EPSILON);
        assert!(bar.is_bullish());
    }

    #[test]
    fn zero_range_has_no_body_ratio() {
        let bar = OhlcvBar::new(ts(10, 0), 1.0, 1.0, 1.0, 1.0, 0.0);
        assert!(bar.body_ratio().is_none());
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_bar_detected() {
        let bar = OhlcvBar::new(ts(10, 0), 100.0, 99.0, 90.0, 95.0, 1.0);
        assert!(!bar.is_well_formed());
        let negative_volume = OhlcvBar::new(ts(10, 0), 100.0, 110.0, 90.0, 95.0, -1.0);
        assert!(!negative_volume.is_well_formed());
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        let bars = vec![sample_bar(), sample_bar()];
        let err = BarSeries::new("EURUSD", Timeframe::M5, bars).unwrap_err();
        assert!(matches!(err, SweepscanError::InvalidSeries { .. }));
    }

    #[test]
    fn from_unsorted_orders_bars() {
        let late = OhlcvBar::new(ts(10, 5), 1.0, 1.0, 1.0, 1.0, 0.0);
        let early = OhlcvBar::new(ts(10, 0), 1.0, 1.0, 1.0, 1.0, 0.0);
        let series = BarSeries::from_unsorted("EURUSD", Timeframe::M5, vec![late, early]).unwrap();
        assert_eq!(series.bars()[0].timestamp, ts(10, 0));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn closed_by_excludes_bars_still_open() {
        let bars: Vec<OhlcvBar> = (0..4)
            .map(|i| OhlcvBar::new(ts(10, i * 15), 1.0, 1.0, 1.0, 1.0, 0.0))
            .collect();
        let series = BarSeries::new("EURUSD", Timeframe::M15, bars).unwrap();
        // bars at 10:00 and 10:15 have closed by 10:30; 10:30 has not
        assert_eq!(series.closed_by(ts(10, 30)).len(), 2);
        assert_eq!(series.starting_at(ts(10, 30)).len(), 2);
        assert_eq!(series.starting_at(ts(11, 0)).len(), 0);
    }
}
