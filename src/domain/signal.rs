//! Trade direction, quality grading and the candidate signal record.

use crate::domain::features::phase::Phase;
use crate::domain::features::session::Session;
use crate::domain::levels::TradeLevels;
use crate::domain::sizing::PositionSize;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// +1 for long, -1 for short. Multiplies a price difference into a
    /// favorable-is-positive distance.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Some(Direction::Long),
            "SHORT" | "SELL" => Some(Direction::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-facing grade of a final confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitySeal {
    PremierAPlus,
    SolidA,
    StandardB,
    Low,
}

impl QualitySeal {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.5 {
            QualitySeal::PremierAPlus
        } else if score >= 8.0 {
            QualitySeal::SolidA
        } else if score >= 6.5 {
            QualitySeal::StandardB
        } else {
            QualitySeal::Low
        }
    }
}

impl fmt::Display for QualitySeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualitySeal::PremierAPlus => "PREMIER A+",
            QualitySeal::SolidA => "SOLID A",
            QualitySeal::StandardB => "STANDARD B",
            QualitySeal::Low => "LOW",
        };
        f.write_str(label)
    }
}

/// One accepted setup for one (instrument, strategy) in one cycle.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSignal {
    pub instrument: String,
    pub strategy_id: String,
    pub direction: Direction,
    pub confidence: f64,
    pub win_probability: f64,
    pub quality: QualitySeal,
    pub levels: TradeLevels,
    pub size: PositionSize,
    pub pip_size: f64,
    pub atr: f64,
    pub created_at: DateTime<Utc>,
    pub session: Session,
    pub phase: Phase,
    pub narrative: String,
}

/// Alert text for an accepted signal.
pub fn format_alert(signal: &CandidateSignal) -> String {
    let lv = &signal.levels;
    let mut msg = format!(
        "{} {} [{}] {} | conf {:.1} | win {:.0}%\n",
        signal.instrument,
        signal.direction,
        signal.strategy_id,
        signal.quality,
        signal.confidence,
        signal.win_probability * 100.0
    );
    msg.push_str(&format!(
        "entry {:.5}  stop {:.5}  partial {:.5}  tp1 {:.5}  tp2 {:.5}  be@ {:.5}\n",
        lv.entry, lv.stop, lv.partial_tp, lv.tp1, lv.tp2, lv.breakeven_trigger
    ));
    msg.push_str(&format!(
        "size {:.2} lots, risk {:.2} ({:.1}%)",
        signal.size.lots,
        signal.size.risk_amount,
        signal.size.risk_pct * 100.0
    ));
    if signal.size.warning {
        msg.push_str(" RISK WARNING");
    }
    msg.push_str(&format!(
        "\nsession {} | phase {} | {}",
        signal.session, signal.phase, signal.narrative
    ));
    msg
}
