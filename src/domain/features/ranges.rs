//! Average daily range and the Asian session range.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;
use chrono::{NaiveDate, Timelike};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdrFact {
    pub adr: f64,
    pub today_range: f64,
    pub exhausted: bool,
}

/// Mean daily (high - low) over the trailing `days` UTC dates of `bars`,
/// today included. Exhausted once today's range reaches `adr * threshold`.
pub fn average_daily_range(bars: &[OhlcvBar], days: usize, threshold: f64) -> Option<AdrFact> {
    if bars.is_empty() || days == 0 {
        return None;
    }

    let mut daily: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for bar in bars {
        let entry = daily
            .entry(bar.timestamp.date_naive())
            .or_insert((f64::NEG_INFINITY, f64::INFINITY));
        entry.0 = entry.0.max(bar.high);
        entry.1 = entry.1.min(bar.low);
    }

    let ranges: Vec<f64> = daily.values().map(|(hi, lo)| hi - lo).collect();
    let today_range = *ranges.last()?;
    let tail = &ranges[ranges.len().saturating_sub(days)..];
    let adr = tail.iter().sum::<f64>() / tail.len() as f64;

    Some(AdrFact {
        adr,
        today_range,
        exhausted: adr > 0.0 && today_range >= adr * threshold,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsianRange {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
}

impl AsianRange {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// `bar` traded through the side of the range that a `direction` setup sweeps.
    pub fn swept_by(&self, bar: &OhlcvBar, direction: Direction) -> bool {
        match direction {
            Direction::Long => bar.low < self.low,
            Direction::Short => bar.high > self.high,
        }
    }
}

/// Range of the most recent date's bars inside [start_hour, end_hour) UTC.
pub fn asian_range(bars: &[OhlcvBar], start_hour: u32, end_hour: u32) -> Option<AsianRange> {
    let in_session = |b: &&OhlcvBar| {
        let h = b.timestamp.hour();
        h >= start_hour && h < end_hour
    };
    let date = bars.iter().rev().find(in_session)?.timestamp.date_naive();

    let (high, low) = bars
        .iter()
        .filter(in_session)
        .filter(|b| b.timestamp.date_naive() == date)
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), b| {
            (hi.max(b.high), lo.min(b.low))
        });

    Some(AsianRange { date, high, low })
}
