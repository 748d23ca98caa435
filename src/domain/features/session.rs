//! Trading sessions by UTC hour.

use chrono::{DateTime, Timelike, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Session {
    Asian,
    London,
    NewYork,
    #[default]
    OffHours,
}

impl Session {
    /// Asian 00-08, London 08-13, New York 13-21, off-hours otherwise.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        match timestamp.hour() {
            0..=7 => Session::Asian,
            8..=12 => Session::London,
            13..=20 => Session::NewYork,
            _ => Session::OffHours,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Session::Asian => "ASIAN",
            Session::London => "LONDON",
            Session::NewYork => "NEW_YORK",
            Session::OffHours => "OFF_HOURS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ASIAN" => Some(Session::Asian),
            "LONDON" => Some(Session::London),
            "NEW_YORK" => Some(Session::NewYork),
            "OFF_HOURS" => Some(Session::OffHours),
            _ => None,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hours in which new setups may be taken. Each window is
/// (start hour inclusive, end hour exclusive).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindows {
    pub windows: Vec<(u32, u32)>,
}

impl Default for SessionWindows {
    /// London open 08-10 and the London/New York overlap 13-18.
    fn default() -> Self {
        Self {
            windows: vec![(8, 10), (13, 18)],
        }
    }
}

impl SessionWindows {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let hour = timestamp.hour();
        self.windows
            .iter()
            .any(|&(start, end)| hour >= start && hour < end)
    }

    /// Profile-specific window if one is set, otherwise these windows.
    pub fn allows(&self, timestamp: DateTime<Utc>, override_hours: Option<(u32, u32)>) -> bool {
        match override_hours {
            Some((start, end)) => {
                let hour = timestamp.hour();
                hour >= start && hour < end
            }
            None => self.contains(timestamp),
        }
    }

    /// Parses "8-10,13-18".
    pub fn parse(text: &str) -> Option<Self> {
        let mut windows = Vec::new();
        for part in text.split(',') {
            let (start, end) = part.trim().split_once('-')?;
            let start: u32 = start.trim().parse().ok()?;
            let end: u32 = end.trim().parse().ok()?;
            if start >= end || end > 24 {
                return None;
            }
            windows.push((start, end));
        }
        Some(Self { windows })
    }
}
