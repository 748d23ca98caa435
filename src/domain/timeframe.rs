//! Bar granularities and the role each one plays in the analysis.

use chrono::Duration;
use std::fmt;

/// Bar granularity. Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    /// Entry timeframe.
    M5,
    /// Structure timeframe.
    M15,
    /// Narrative timeframe.
    H1,
    /// Institutional timeframe.
    H4,
    /// Macro timeframe.
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Short label, also used in data file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn role(self) -> &'static str {
        match self {
            Timeframe::M5 => "entry",
            Timeframe::M15 => "structure",
            Timeframe::H1 => "narrative",
            Timeframe::H4 => "institutional",
            Timeframe::D1 => "macro",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
