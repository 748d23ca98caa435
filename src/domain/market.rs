//! Multi-timeframe market data for one instrument.
//!
//! The series are parallel views over the same market and are never merged.
//! Extractors read a [`MarketView`], a borrowed slice per timeframe.

use crate::domain::ohlcv::{BarSeries, OhlcvBar};
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MarketData {
    instrument: String,
    series: BTreeMap<Timeframe, BarSeries>,
}

impl MarketData {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            series: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, series: BarSeries) {
        self.series.insert(series.timeframe(), series);
    }

    pub fn with_series(mut self, series: BarSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn series(&self, timeframe: Timeframe) -> Option<&BarSeries> {
        self.series.get(&timeframe)
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(|s| s.is_empty())
    }

    /// Everything loaded, as used by the live cycle.
    pub fn view(&self) -> MarketView<'_> {
        let bars = |tf: Timeframe| self.series(tf).map(|s| s.bars()).unwrap_or(&[]);
        MarketView {
            m5: bars(Timeframe::M5),
            m15: bars(Timeframe::M15),
            h1: bars(Timeframe::H1),
            h4: bars(Timeframe::H4),
            d1: bars(Timeframe::D1),
        }
    }

    /// Only bars that had closed by `cutoff`, as used by historical replay.
    pub fn view_at(&self, cutoff: DateTime<Utc>) -> MarketView<'_> {
        let bars = |tf: Timeframe| {
            self.series(tf)
                .map(|s| s.closed_by(cutoff))
                .unwrap_or(&[])
        };
        MarketView {
            m5: bars(Timeframe::M5),
            m15: bars(Timeframe::M15),
            h1: bars(Timeframe::H1),
            h4: bars(Timeframe::H4),
            d1: bars(Timeframe::D1),
        }
    }
}

/// Borrowed bars per timeframe.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketView<'a> {
    pub m5: &'a [OhlcvBar],
    pub m15: &'a [OhlcvBar],
    pub h1: &'a [OhlcvBar],
    pub h4: &'a [OhlcvBar],
    pub d1: &'a [OhlcvBar],
}

impl<'a> MarketView<'a> {
    pub fn bars(&self, timeframe: Timeframe) -> &'a [OhlcvBar] {
        match timeframe {
            Timeframe::M5 => self.m5,
            Timeframe::M15 => self.m15,
            Timeframe::H1 => self.h1,
            Timeframe::H4 => self.h4,
            Timeframe::D1 => self.d1,
        }
    }

    /// The same view cut to at most the last `limit` bars per timeframe.
    pub fn trailing(self, limit: usize) -> Self {
        fn tail(bars: &[OhlcvBar], limit: usize) -> &[OhlcvBar] {
            &bars[bars.len().saturating_sub(limit)..]
        }
        Self {
            m5: tail(self.m5, limit),
            m15: tail(self.m15, limit),
            h1: tail(self.h1, limit),
            h4: tail(self.h4, limit),
            d1: tail(self.d1, limit),
        }
    }

    /// Close time of the latest structure bar.
    pub fn decision_time(&self) -> Option<DateTime<Utc>> {
        self.m15
            .last()
            .map(|b| b.timestamp + Timeframe::M15.duration())
    }
}
