//! Retry decorator for any market data provider.
//!
//! Transient failures (collaborator and I/O errors) are retried with a
//! doubling delay capped at `max_delay`. `Ok(None)` and malformed series
//! are returned as-is: retrying cannot fix them.

use crate::domain::error::SweepscanError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Utc};
use log::warn;
use std::time::Duration;

pub struct RetryingMarketData<P> {
    inner: P,
    attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<P: MarketDataPort> RetryingMarketData<P> {
    pub fn new(inner: P, attempts: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            base_delay,
            max_delay: base_delay * 8,
        }
    }

    /// Reads `[data] fetch_attempts` (default 3) and `[data] retry_delay_ms`
    /// (default 200).
    pub fn from_config(inner: P, config: &dyn ConfigPort) -> Self {
        let attempts = config.get_int("data", "fetch_attempts", 3).max(1) as usize;
        let delay_ms = config.get_int("data", "retry_delay_ms", 200).max(0) as u64;
        Self::new(inner, attempts, Duration::from_millis(delay_ms))
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

fn is_transient(err: &SweepscanError) -> bool {
    matches!(
        err,
        SweepscanError::Collaborator { .. } | SweepscanError::Io(_)
    )
}

impl<P: MarketDataPort> MarketDataPort for RetryingMarketData<P> {
    fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BarSeries>, SweepscanError> {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match self.inner.fetch(instrument, timeframe, start, end) {
                Err(e) if is_transient(&e) && attempt < self.attempts => {
                    warn!(
                        "{} {}: fetch attempt {}/{} failed, retrying in {}ms: {}",
                        instrument,
                        timeframe,
                        attempt,
                        self.attempts,
                        delay.as_millis(),
                        e
                    );
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails `failures` times with `error`, then serves one bar.
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        error: fn() -> SweepscanError,
    }

    impl Flaky {
        fn new(failures: usize, error: fn() -> SweepscanError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                error,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MarketDataPort for Flaky {
        fn fetch(
            &self,
            instrument: &str,
            timeframe: Timeframe,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Option<BarSeries>, SweepscanError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err((self.error)());
            }
            let bar = OhlcvBar::new(start, 1.1, 1.2, 1.0, 1.1, 10.0);
            BarSeries::new(instrument.to_string(), timeframe, vec![bar]).map(Some)
        }
    }

    fn offline() -> SweepscanError {
        SweepscanError::collaborator("market_data", "timeout")
    }

    fn malformed() -> SweepscanError {
        SweepscanError::InvalidSeries {
            instrument: "EURUSD".into(),
            timeframe: "5m".into(),
            reason: "bad row".into(),
        }
    }

    fn fetch(port: &dyn MarketDataPort) -> Result<Option<BarSeries>, SweepscanError> {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        port.fetch("EURUSD", Timeframe::M5, t, t)
    }

    #[test]
    fn transient_failure_is_retried_until_success() {
        let port = RetryingMarketData::new(Flaky::new(2, offline), 3, Duration::ZERO);
        let series = fetch(&port).unwrap().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(port.inner().calls(), 3);
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let port = RetryingMarketData::new(Flaky::new(10, offline), 3, Duration::ZERO);
        assert!(matches!(
            fetch(&port),
            Err(SweepscanError::Collaborator { .. })
        ));
        assert_eq!(port.inner().calls(), 3);
    }

    #[test]
    fn malformed_series_is_not_retried() {
        let port = RetryingMarketData::new(Flaky::new(1, malformed), 5, Duration::ZERO);
        assert!(matches!(
            fetch(&port),
            Err(SweepscanError::InvalidSeries { .. })
        ));
        assert_eq!(port.inner().calls(), 1);
    }

    #[test]
    fn zero_attempts_still_fetches_once() {
        let port = RetryingMarketData::new(Flaky::new(0, offline), 0, Duration::ZERO);
        assert!(fetch(&port).unwrap().is_some());
        assert_eq!(port.inner().calls(), 1);
    }

    #[test]
    fn reads_attempts_and_delay_from_config() {
        let config =
            FileConfigAdapter::from_string("[data]\nfetch_attempts = 5\nretry_delay_ms = 50\n")
                .unwrap();
        let port = RetryingMarketData::from_config(Flaky::new(0, offline), &config);
        assert_eq!(port.attempts, 5);
        assert_eq!(port.base_delay, Duration::from_millis(50));
        assert_eq!(port.max_delay, Duration::from_millis(400));
    }
}
