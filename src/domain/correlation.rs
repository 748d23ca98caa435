//! Portfolio exposure filter over one cycle's accepted candidates.
//!
//! Each instrument decomposes into exposure legs: a pair is long its base
//! and short its quote, a stand-alone asset carries one leg. Candidates are
//! taken greedily by win probability; one that would take the opposite side
//! of a leg already held is dropped.

use crate::domain::instrument::InstrumentBook;
use crate::domain::signal::{CandidateSignal, Direction};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// (leg, side) pairs a signal would add to the book. Empty for instruments
/// the book does not know.
pub fn leg_exposure(signal: &CandidateSignal, book: &InstrumentBook) -> Vec<(String, Direction)> {
    let Some(profile) = book.get(&signal.instrument) else {
        return Vec::new();
    };
    profile
        .legs
        .iter()
        .enumerate()
        .map(|(i, leg)| {
            let side = if i == 0 {
                signal.direction
            } else {
                signal.direction.opposite()
            };
            (leg.clone(), side)
        })
        .collect()
}

pub fn filter_conflicts(
    mut candidates: Vec<CandidateSignal>,
    book: &InstrumentBook,
) -> Vec<CandidateSignal> {
    // stable: equal probabilities keep arrival order
    candidates.sort_by(|a, b| b.win_probability.total_cmp(&a.win_probability));

    let mut exposure: HashMap<String, Direction> = HashMap::new();
    let mut accepted = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let legs = leg_exposure(&candidate, book);
        let conflict = legs
            .iter()
            .find(|(leg, side)| exposure.get(leg).is_some_and(|held| held != side));

        if let Some((leg, side)) = conflict {
            warn!(
                "correlation conflict: {} {} [{}] takes {} {} against open exposure, dropped",
                candidate.instrument, candidate.direction, candidate.strategy_id, leg, side
            );
            continue;
        }

        for (leg, side) in legs {
            exposure.entry(leg).or_insert(side);
        }
        debug!(
            "accepted {} {} [{}]",
            candidate.instrument, candidate.direction, candidate.strategy_id
        );
        accepted.push(candidate);
    }

    accepted
}

/// A leg carried on the same side by several accepted signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub leg: String,
    pub side: Direction,
    pub count: usize,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} x{}", self.leg, self.side, self.count)
    }
}

/// The most shared (leg, side), if at least two signals share one.
pub fn dominant_theme(accepted: &[CandidateSignal], book: &InstrumentBook) -> Option<Theme> {
    let mut counts: BTreeMap<(String, &'static str), (Direction, usize)> = BTreeMap::new();
    for signal in accepted {
        for (leg, side) in leg_exposure(signal, book) {
            counts.entry((leg, side.as_str())).or_insert((side, 0)).1 += 1;
        }
    }

    let mut best: Option<Theme> = None;
    for ((leg, _), (side, count)) in counts {
        if count >= 2 && best.as_ref().is_none_or(|b| count > b.count) {
            best = Some(Theme { leg, side, count });
        }
    }
    best
}
