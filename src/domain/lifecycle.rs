//! Trade-lifecycle simulation.
//!
//! A position moves Armed -> PartialTaken -> BreakevenArmed and closes on
//! the stop, the final target, or the forward-bar limit. The effective stop
//! is the original stop until breakeven arms, then entry, then the partial
//! level once TP1 has been touched.
//!
//! The same state machine runs exhaustively for the backtest
//! ([`simulate`]) and incrementally for the live audit
//! ([`OpenPosition::advance`]).

use crate::domain::levels::TradeLevels;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{CandidateSignal, Direction};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Loss,
    PartialLoss,
    Breakeven,
    Tp1Trail,
    Tp2,
    Timeout,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::Loss,
        Outcome::PartialLoss,
        Outcome::Breakeven,
        Outcome::Tp1Trail,
        Outcome::Tp2,
        Outcome::Timeout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Loss => "LOSS",
            Outcome::PartialLoss => "PARTIAL_LOSS",
            Outcome::Breakeven => "BREAKEVEN",
            Outcome::Tp1Trail => "TP1_TRAIL",
            Outcome::Tp2 => "TP2",
            Outcome::Timeout => "TIMEOUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.as_str() == s)
    }

    /// Closed at entry or at a loss after banking the partial.
    pub fn is_breakeven_like(self) -> bool {
        matches!(self, Outcome::Breakeven | Outcome::PartialLoss)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Armed,
    PartialTaken,
    BreakevenArmed,
    Closed(Outcome),
}

/// Which check wins when one bar touches both the stop and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreakPolicy {
    #[default]
    StopFirst,
    TargetFirst,
}

impl TieBreakPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "stop_first" => Some(TieBreakPolicy::StopFirst),
            "target_first" => Some(TieBreakPolicy::TargetFirst),
            _ => None,
        }
    }
}

/// Fixed R accounting per outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardModel {
    /// Fraction of the position closed at the partial target.
    pub partial_fraction: f64,
    pub partial_r: f64,
    /// Runner reward at TP2.
    pub runner_r: f64,
    /// Runner reward when trailed out at the partial level.
    pub trail_r: f64,
    pub loss_r: f64,
}

impl Default for RewardModel {
    fn default() -> Self {
        Self {
            partial_fraction: 0.5,
            partial_r: 1.0,
            runner_r: 3.0,
            trail_r: 1.0,
            loss_r: -1.0,
        }
    }
}

impl RewardModel {
    fn banked(&self) -> f64 {
        self.partial_fraction * self.partial_r
    }

    fn runner(&self) -> f64 {
        1.0 - self.partial_fraction
    }

    /// R of a closed outcome. `None` for a timeout, which is marked to market.
    pub fn r_for(&self, outcome: Outcome) -> Option<f64> {
        match outcome {
            Outcome::Loss => Some(self.loss_r),
            Outcome::PartialLoss => Some(self.banked() + self.runner() * self.loss_r),
            Outcome::Breakeven => Some(self.banked()),
            Outcome::Tp1Trail => Some(self.banked() + self.runner() * self.trail_r),
            Outcome::Tp2 => Some(self.full_win_r()),
            Outcome::Timeout => None,
        }
    }

    pub fn full_win_r(&self) -> f64 {
        self.banked() + self.runner() * self.runner_r
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleConfig {
    /// Forward bars after which an open position times out (24h of 5m bars).
    pub max_forward_bars: usize,
    pub tie_break: TieBreakPolicy,
    pub rewards: RewardModel,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_forward_bars: 288,
            tie_break: TieBreakPolicy::StopFirst,
            rewards: RewardModel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub r_multiple: f64,
    pub realized_pips: f64,
    pub bars_held: usize,
    pub exit_price: f64,
    pub closed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    pub levels: TradeLevels,
    pub pip_size: f64,
    pub opened_at: DateTime<Utc>,
    pub state: PositionState,
    pub tp1_touched: bool,
    pub bars_seen: usize,
    pub last_seen: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
}

impl OpenPosition {
    pub fn new(
        direction: Direction,
        levels: TradeLevels,
        pip_size: f64,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            levels,
            pip_size,
            opened_at,
            state: PositionState::Armed,
            tp1_touched: false,
            bars_seen: 0,
            last_seen: None,
            resolution: None,
        }
    }

    pub fn for_signal(signal: &CandidateSignal, opened_at: DateTime<Utc>) -> Self {
        Self::new(signal.direction, signal.levels, signal.pip_size, opened_at)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, PositionState::Closed(_))
    }

    /// Feeds forward bars. Bars before `opened_at` or at or before the last
    /// bar already seen are ignored, so replaying the same bars is a no-op.
    pub fn advance(&mut self, bars: &[OhlcvBar], cfg: &LifecycleConfig) -> Option<Resolution> {
        for bar in bars {
            if self.is_closed() {
                break;
            }
            if bar.timestamp < self.opened_at
                || self.last_seen.is_some_and(|seen| bar.timestamp <= seen)
            {
                continue;
            }
            self.bars_seen += 1;
            self.last_seen = Some(bar.timestamp);
            self.step(bar, cfg);

            if !self.is_closed() && self.bars_seen >= cfg.max_forward_bars {
                self.close(Outcome::Timeout, bar.close, bar.timestamp, &cfg.rewards);
            }
        }
        self.resolution
    }

    fn step(&mut self, bar: &OhlcvBar, cfg: &LifecycleConfig) {
        match cfg.tie_break {
            TieBreakPolicy::StopFirst => {
                if self.check_stop(bar, &cfg.rewards) {
                    return;
                }
                self.progress(bar);
                self.check_final_target(bar, &cfg.rewards);
            }
            TieBreakPolicy::TargetFirst => {
                self.progress(bar);
                if self.check_final_target(bar, &cfg.rewards) {
                    return;
                }
                self.check_stop(bar, &cfg.rewards);
            }
        }
    }

    /// Stop implied by the current state.
    pub fn effective_stop(&self) -> f64 {
        match self.state {
            PositionState::BreakevenArmed if self.tp1_touched => self.levels.partial_tp,
            PositionState::BreakevenArmed => self.levels.entry,
            _ => self.levels.stop,
        }
    }

    fn reached(&self, bar: &OhlcvBar, level: f64) -> bool {
        match self.direction {
            Direction::Long => bar.high >= level,
            Direction::Short => bar.low <= level,
        }
    }

    fn check_stop(&mut self, bar: &OhlcvBar, rewards: &RewardModel) -> bool {
        let stop = self.effective_stop();
        let hit = match self.direction {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
        };
        if !hit {
            return false;
        }
        let outcome = match self.state {
            PositionState::Armed => Outcome::Loss,
            PositionState::PartialTaken => Outcome::PartialLoss,
            PositionState::BreakevenArmed if self.tp1_touched => Outcome::Tp1Trail,
            PositionState::BreakevenArmed => Outcome::Breakeven,
            PositionState::Closed(_) => return true,
        };
        self.close(outcome, stop, bar.timestamp, rewards);
        true
    }

    fn progress(&mut self, bar: &OhlcvBar) {
        if self.state == PositionState::Armed && self.reached(bar, self.levels.partial_tp) {
            self.state = PositionState::PartialTaken;
        }
        if self.state == PositionState::PartialTaken
            && self.reached(bar, self.levels.breakeven_trigger)
        {
            self.state = PositionState::BreakevenArmed;
        }
        if self.state == PositionState::BreakevenArmed && self.reached(bar, self.levels.tp1) {
            self.tp1_touched = true;
        }
    }

    fn check_final_target(&mut self, bar: &OhlcvBar, rewards: &RewardModel) -> bool {
        if self.is_closed() || !self.reached(bar, self.levels.tp2) {
            return false;
        }
        self.close(Outcome::Tp2, self.levels.tp2, bar.timestamp, rewards);
        true
    }

    fn partial_taken(&self) -> bool {
        matches!(
            self.state,
            PositionState::PartialTaken | PositionState::BreakevenArmed
        )
    }

    fn close(
        &mut self,
        outcome: Outcome,
        exit_price: f64,
        at: DateTime<Utc>,
        rewards: &RewardModel,
    ) {
        let s = self.direction.sign();
        let to_pips = |price: f64| {
            if self.pip_size > 0.0 {
                (price - self.levels.entry) * s / self.pip_size
            } else {
                0.0
            }
        };

        let partial_leg = outcome != Outcome::Loss
            && (self.partial_taken() || outcome == Outcome::Tp2);
        let realized_pips = if partial_leg {
            rewards.partial_fraction * to_pips(self.levels.partial_tp)
                + rewards.runner() * to_pips(exit_price)
        } else {
            to_pips(exit_price)
        };

        let r_multiple = match rewards.r_for(outcome) {
            Some(r) => r,
            None => {
                let risk = self.levels.risk();
                let open_r = if risk > 0.0 {
                    (exit_price - self.levels.entry) * s / risk
                } else {
                    0.0
                };
                if self.partial_taken() {
                    rewards.banked() + rewards.runner() * open_r
                } else {
                    open_r
                }
            }
        };

        self.state = PositionState::Closed(outcome);
        self.resolution = Some(Resolution {
            outcome,
            r_multiple,
            realized_pips,
            bars_held: self.bars_seen,
            exit_price,
            closed_at: at,
        });
    }
}

/// Runs a position to resolution over `forward`. `None` when the bars run
/// out before the position closes.
pub fn simulate(
    direction: Direction,
    levels: TradeLevels,
    pip_size: f64,
    opened_at: DateTime<Utc>,
    forward: &[OhlcvBar],
    cfg: &LifecycleConfig,
) -> Option<Resolution> {
    OpenPosition::new(direction, levels, pip_size, opened_at).advance(forward, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap()
    }

    fn long_levels() -> TradeLevels {
        TradeLevels {
            entry: 1.1000,
            stop: 1.0970,
            partial_tp: 1.1010,
            tp1: 1.1020,
            tp2: 1.1036,
            breakeven_trigger: 1.1015,
        }
    }

    /// Bars from (high, low) pairs, five minutes apart from `start()`.
    fn bars(rows: &[(f64, f64)]) -> Vec<OhlcvBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                OhlcvBar::new(start() + Duration::minutes(5 * i as i64), mid, high, low, mid, 1.0)
            })
            .collect()
    }

    fn run(rows: &[(f64, f64)], cfg: &LifecycleConfig) -> Option<Resolution> {
        simulate(Direction::Long, long_levels(), 0.0001, start(), &bars(rows), cfg)
    }

    #[test]
    fn reward_model_outcome_r() {
        let r = RewardModel::default();
        assert_relative_eq!(r.r_for(Outcome::Loss).unwrap(), -1.0);
        assert_relative_eq!(r.r_for(Outcome::PartialLoss).unwrap(), 0.0);
        assert_relative_eq!(r.r_for(Outcome::Breakeven).unwrap(), 0.5);
        assert_relative_eq!(r.r_for(Outcome::Tp1Trail).unwrap(), 1.0);
        assert_relative_eq!(r.r_for(Outcome::Tp2).unwrap(), 2.0);
        assert!(r.r_for(Outcome::Timeout).is_none());
    }

    #[test]
    fn straight_to_stop_is_loss() {
        let res = run(&[(1.1005, 1.0960)], &LifecycleConfig::default()).unwrap();
        assert_eq!(res.outcome, Outcome::Loss);
        assert_relative_eq!(res.r_multiple, -1.0);
        assert_relative_eq!(res.realized_pips, -30.0, epsilon = 1e-6);
        assert_eq!(res.bars_held, 1);
    }

    #[test]
    fn partial_then_original_stop_is_partial_loss() {
        let res = run(
            &[(1.1012, 1.0995), (1.1000, 1.0960)],
            &LifecycleConfig::default(),
        )
        .unwrap();
        assert_eq!(res.outcome, Outcome::PartialLoss);
        assert_relative_eq!(res.r_multiple, 0.0);
        assert_relative_eq!(res.realized_pips, -10.0, epsilon = 1e-6);
    }

    #[test]
    fn breakeven_armed_then_back_to_entry() {
        let res = run(
            &[(1.1016, 1.1001), (1.1005, 1.0999)],
            &LifecycleConfig::default(),
        )
        .unwrap();
        assert_eq!(res.outcome, Outcome::Breakeven);
        assert_relative_eq!(res.r_multiple, 0.5);
        assert_relative_eq!(res.exit_price, 1.1000);
        assert_relative_eq!(res.realized_pips, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn tp1_touched_trails_to_partial_level() {
        let res = run(
            &[(1.1022, 1.1001), (1.1015, 1.1005)],
            &LifecycleConfig::default(),
        )
        .unwrap();
        assert_eq!(res.outcome, Outcome::Tp1Trail);
        assert_relative_eq!(res.r_multiple, 1.0);
        assert_relative_eq!(res.realized_pips, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn full_target_in_one_bar() {
        let res = run(&[(1.1040, 1.0999)], &LifecycleConfig::default()).unwrap();
        assert_eq!(res.outcome, Outcome::Tp2);
        assert_relative_eq!(res.r_multiple, 2.0);
        assert_relative_eq!(res.realized_pips, 0.5 * 10.0 + 0.5 * 36.0, epsilon = 1e-6);
    }

    #[test]
    fn computed_levels_reach_full_target() {
        use crate::domain::instrument::InstrumentProfile;
        use crate::domain::levels::{LevelConfig, compute_levels};

        let cfg = LifecycleConfig::default();
        let profile = InstrumentProfile::generic("EURUSD");
        let plan = LevelConfig::default().plan_for(&profile, start(), None);

        for direction in [Direction::Long, Direction::Short] {
            let s = direction.sign();
            let reference = 1.1000 - s * 0.0010;
            let levels = compute_levels(direction, 1.1000, reference, 0.0020, &plan).unwrap();

            // past TP2, never back to the stop
            let (high, low) = match direction {
                Direction::Long => (levels.tp2 + 0.0002, levels.entry - 0.0001),
                Direction::Short => (levels.entry + 0.0001, levels.tp2 - 0.0002),
            };
            match direction {
                Direction::Long => assert!(low > levels.stop),
                Direction::Short => assert!(high < levels.stop),
            }
            let bar = [OhlcvBar::new(start(), 1.1000, high, low, 1.1000, 1.0)];

            let res = simulate(direction, levels, 0.0001, start(), &bar, &cfg).unwrap();
            assert_eq!(res.outcome, Outcome::Tp2, "{direction}");
            assert_relative_eq!(res.r_multiple, cfg.rewards.full_win_r());
            assert_eq!(res.bars_held, 1);
        }
    }

    #[test]
    fn tie_break_policy_decides_ambiguous_bar() {
        let wide = [(1.1040, 1.0960)];
        let stop_first = run(&wide, &LifecycleConfig::default()).unwrap();
        assert_eq!(stop_first.outcome, Outcome::Loss);

        let cfg = LifecycleConfig {
            tie_break: TieBreakPolicy::TargetFirst,
            ..LifecycleConfig::default()
        };
        let target_first = run(&wide, &cfg).unwrap();
        assert_eq!(target_first.outcome, Outcome::Tp2);
    }

    #[test]
    fn times_out_after_forward_limit() {
        let cfg = LifecycleConfig {
            max_forward_bars: 3,
            ..LifecycleConfig::default()
        };
        let res = run(&[(1.1006, 1.1004); 5], &cfg).unwrap();
        assert_eq!(res.outcome, Outcome::Timeout);
        assert_eq!(res.bars_held, 3);
        // close 1.1005, risk 0.0030
        assert_relative_eq!(res.r_multiple, 0.0005 / 0.0030, epsilon = 1e-6);
    }

    #[test]
    fn unresolved_when_bars_run_out() {
        assert!(run(&[(1.1006, 1.1004); 5], &LifecycleConfig::default()).is_none());
    }

    #[test]
    fn advance_is_idempotent_and_incremental() {
        let cfg = LifecycleConfig::default();
        let all = bars(&[(1.1012, 1.0995), (1.1008, 1.1001), (1.1000, 1.0960)]);
        let mut pos = OpenPosition::new(Direction::Long, long_levels(), 0.0001, start());

        assert!(pos.advance(&all[..2], &cfg).is_none());
        assert!(pos.advance(&all[..2], &cfg).is_none());
        assert_eq!(pos.bars_seen, 2);
        assert_eq!(pos.state, PositionState::PartialTaken);

        let res = pos.advance(&all, &cfg).unwrap();
        assert_eq!(res.outcome, Outcome::PartialLoss);
        assert_eq!(pos.bars_seen, 3);
    }

    #[test]
    fn bars_before_open_are_ignored() {
        let cfg = LifecycleConfig::default();
        let early = bars(&[(1.1005, 1.0960)]);
        let mut pos = OpenPosition::new(
            Direction::Long,
            long_levels(),
            0.0001,
            start() + Duration::hours(1),
        );
        assert!(pos.advance(&early, &cfg).is_none());
        assert_eq!(pos.bars_seen, 0);
    }

    #[test]
    fn short_position_mirrors() {
        let levels = TradeLevels {
            entry: 1.1000,
            stop: 1.1030,
            partial_tp: 1.0990,
            tp1: 1.0980,
            tp2: 1.0964,
            breakeven_trigger: 1.0985,
        };
        let res = simulate(
            Direction::Short,
            levels,
            0.0001,
            start(),
            &bars(&[(1.1001, 1.0960)]),
            &LifecycleConfig::default(),
        )
        .unwrap();
        assert_eq!(res.outcome, Outcome::Tp2);
    }

    #[test]
    fn outcome_labels_round_trip() {
        for outcome in Outcome::ALL {
            assert_eq!(Outcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(Outcome::parse("WIN"), None);
    }
}
