//! Market data port trait.

use crate::domain::error::SweepscanError;
use crate::domain::ohlcv::BarSeries;
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Utc};

pub trait MarketDataPort: Send + Sync {
    /// Bars with timestamps in `[start, end]`. `Ok(None)` when the provider
    /// has nothing for the instrument; callers treat it like an error and
    /// skip the instrument for the cycle.
    fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BarSeries>, SweepscanError>;
}
