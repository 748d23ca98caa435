//! Fixed-fractional position sizing in minimum-lot increments.

use crate::domain::instrument::InstrumentProfile;
use crate::domain::levels::TradeLevels;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingConfig {
    pub equity: f64,
    /// Fraction of equity risked per trade.
    pub risk_pct: f64,
    /// Actual risk above this fraction of equity raises the warning flag.
    pub max_risk_pct: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            equity: 50.0,
            risk_pct: 0.02,
            max_risk_pct: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    pub lots: f64,
    /// Money lost if the stop is hit at this size.
    pub risk_amount: f64,
    /// `risk_amount` as a fraction of equity.
    pub risk_pct: f64,
    pub pips_at_risk: f64,
    pub warning: bool,
}

impl SizingConfig {
    pub fn size(&self, levels: &TradeLevels, profile: &InstrumentProfile) -> PositionSize {
        let pips = profile.to_pips(levels.risk());
        let per_unit = profile.pip_value * pips;

        if pips <= 0.0 || per_unit <= 0.0 {
            return PositionSize {
                lots: profile.min_lot,
                risk_amount: 0.0,
                risk_pct: 0.0,
                pips_at_risk: 0.0,
                warning: false,
            };
        }

        let budget = self.equity * self.risk_pct;
        // small epsilon so 2.9999999 minimum lots floors to 3
        let units = ((budget / per_unit) + 1e-9).floor().max(1.0);
        let risk_amount = units * per_unit;
        let risk_pct = if self.equity > 0.0 {
            risk_amount / self.equity
        } else {
            0.0
        };

        PositionSize {
            lots: units * profile.min_lot,
            risk_amount,
            risk_pct,
            pips_at_risk: pips,
            warning: risk_pct > self.max_risk_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn levels(entry: f64, stop: f64) -> TradeLevels {
        TradeLevels {
            entry,
            stop,
            partial_tp: entry,
            tp1: entry,
            tp2: entry,
            breakeven_trigger: entry,
        }
    }

    #[test]
    fn floors_to_minimum_lot_increment() {
        let profile = InstrumentProfile::generic("EURUSD");
        let cfg = SizingConfig {
            equity: 1000.0,
            ..SizingConfig::default()
        };
        // budget 20, 10 pips * 0.10 = 1.0 per min lot, 20 min lots
        let size = cfg.size(&levels(1.1000, 1.0990), &profile);
        assert_relative_eq!(size.lots, 0.20, epsilon = 1e-9);
        assert_relative_eq!(size.risk_amount, 20.0, epsilon = 1e-6);
        assert!(!size.warning);
    }

    #[test]
    fn small_account_gets_minimum_lot_and_warning() {
        let profile = InstrumentProfile::generic("EURUSD");
        // 60 pips at 0.10 = 6.0 risk on 50.0 equity = 12%
        let size = SizingConfig::default().size(&levels(1.1000, 1.0940), &profile);
        assert_relative_eq!(size.lots, 0.01);
        assert_relative_eq!(size.risk_amount, 6.0, epsilon = 1e-6);
        assert_relative_eq!(size.pips_at_risk, 60.0, epsilon = 1e-6);
        assert!(size.warning);
    }

    #[test]
    fn minimum_lot_below_warning_threshold() {
        let profile = InstrumentProfile::generic("EURUSD");
        let size = SizingConfig::default().size(&levels(1.1000, 1.0970), &profile);
        assert_relative_eq!(size.lots, 0.01);
        assert_relative_eq!(size.risk_pct, 0.06, epsilon = 1e-6);
        assert!(!size.warning);
    }

    #[test]
    fn zero_distance_is_minimum_lot_without_risk() {
        let profile = InstrumentProfile::generic("EURUSD");
        let size = SizingConfig::default().size(&levels(1.1, 1.1), &profile);
        assert_relative_eq!(size.lots, 0.01);
        assert_relative_eq!(size.risk_amount, 0.0);
        assert!(!size.warning);
    }
}
