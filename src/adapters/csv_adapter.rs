//! CSV file market data adapter.
//!
//! One file per instrument and timeframe, `{dir}/{SYMBOL}_{tf}.csv`, e.g.
//! `EURUSD_5m.csv`, with the header `timestamp,open,high,low,close,volume`.
//! Timestamps are bar open times, RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC).
//! The volume column may be empty.

use crate::domain::error::SweepscanError;
use crate::domain::ohlcv::{BarSeries, OhlcvBar};
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

pub struct CsvMarketData {
    base_path: PathBuf,
}

impl CsvMarketData {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Reads `[data] dir`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SweepscanError> {
        let dir = config
            .get_string("data", "dir")
            .ok_or_else(|| SweepscanError::ConfigMissing {
                section: "data".into(),
                key: "dir".into(),
            })?;
        Ok(Self::new(PathBuf::from(dir)))
    }

    pub fn csv_path(&self, instrument: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", instrument.to_ascii_uppercase(), timeframe))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

impl MarketDataPort for CsvMarketData {
    fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BarSeries>, SweepscanError> {
        let path = self.csv_path(instrument, timeframe);
        if !path.exists() {
            return Ok(None);
        }

        let invalid = |reason: String| SweepscanError::InvalidSeries {
            instrument: instrument.to_string(),
            timeframe: timeframe.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| invalid(format!("failed to open {}: {}", path.display(), e)))?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<BarRow>().enumerate() {
            let row = result.map_err(|e| invalid(format!("CSV parse error: {}", e)))?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
                invalid(format!(
                    "row {}: invalid timestamp '{}'",
                    line + 1,
                    row.timestamp
                ))
            })?;
            if timestamp < start || timestamp > end {
                continue;
            }
            bars.push(OhlcvBar::new(
                timestamp,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume.unwrap_or(0.0),
            ));
        }

        if bars.is_empty() {
            return Ok(None);
        }
        BarSeries::from_unsorted(instrument.to_ascii_uppercase(), timeframe, bars).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "timestamp,open,high,low,close,volume\n\
            2024-01-15 09:05:00,1.1002,1.1010,1.1000,1.1008,120\n\
            2024-01-15T09:00:00Z,1.1000,1.1005,1.0995,1.1002,100\n\
            2024-01-15 09:10:00,1.1008,1.1012,1.1001,1.1004,\n";
        fs::write(path.join("EURUSD_5m.csv"), csv_content).unwrap();
        fs::write(path.join("GBPUSD_5m.csv"), "timestamp,open,high,low,close,volume\n").unwrap();
        fs::write(
            path.join("USDJPY_5m.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-15 09:00:00,150.0,149.0,150.5,150.1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn fetch_sorts_and_parses_both_timestamp_formats() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);
        let (start, end) = window();

        let series = adapter
            .fetch("eurusd", Timeframe::M5, start, end)
            .unwrap()
            .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.instrument(), "EURUSD");
        let bars = series.bars();
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        assert_eq!(bars[0].open, 1.1000);
        assert_eq!(bars[1].volume, 120.0);
        assert_eq!(bars[2].volume, 0.0);
    }

    #[test]
    fn fetch_filters_by_window() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();

        let series = adapter.fetch("EURUSD", Timeframe::M5, start, end).unwrap().unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn missing_file_and_empty_file_are_none() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);
        let (start, end) = window();

        assert!(adapter.fetch("XAUUSD", Timeframe::M5, start, end).unwrap().is_none());
        assert!(adapter.fetch("GBPUSD", Timeframe::M5, start, end).unwrap().is_none());
        assert!(adapter.fetch("EURUSD", Timeframe::H1, start, end).unwrap().is_none());
    }

    #[test]
    fn malformed_bar_is_an_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvMarketData::new(path);
        let (start, end) = window();

        assert!(matches!(
            adapter.fetch("USDJPY", Timeframe::M5, start, end),
            Err(SweepscanError::InvalidSeries { .. })
        ));
    }

    #[test]
    fn file_name_uses_timeframe_label() {
        let adapter = CsvMarketData::new(PathBuf::from("/data"));
        assert_eq!(
            adapter.csv_path("xauusd", Timeframe::H4),
            PathBuf::from("/data/XAUUSD_4h.csv")
        );
    }
}
