//! Dispatch policy: when the battery may discharge and when it may charge
//! from the grid.

use serde::{Deserialize, Serialize};

use crate::devices::battery::EfficiencyModel;
use crate::error::{EngineError, Result};
use crate::tariff::RatePlan;

/// When stored energy may serve the household.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DischargeRule {
    /// Whenever a residual grid draw exists.
    Always,
    /// Only while the retail price is strictly above `threshold` ($/kWh).
    AbovePrice { threshold: f64 },
    /// Whenever a residual draw exists, except during grid-charge steps.
    #[default]
    OutsideChargeWindow,
}

/// When the battery may buy energy from the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridChargeRule {
    Never,
    /// Charge during the plan's cheapest period, provided the spread between
    /// the peak price (after round-trip losses) and the cheapest price
    /// exceeds `min_spread` $/kWh.
    CheapPeriod {
        #[serde(default)]
        min_spread: f64,
        /// Fraction of usable capacity to fill up to.
        #[serde(default = "full_target")]
        target_soc: f64,
    },
}

impl Default for GridChargeRule {
    fn default() -> Self {
        GridChargeRule::CheapPeriod {
            min_spread: 0.0,
            target_soc: full_target(),
        }
    }
}

fn full_target() -> f64 {
    1.0
}

/// Tunable dispatch behaviour shared by every battery in a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchPolicy {
    pub discharge: DischargeRule,
    pub grid_charge: GridChargeRule,
    pub efficiency: EfficiencyModel,
}

impl DispatchPolicy {
    /// Self-consumption only: no grid charging, discharge whenever needed.
    pub fn self_consumption() -> Self {
        Self {
            discharge: DischargeRule::Always,
            grid_charge: GridChargeRule::Never,
            efficiency: EfficiencyModel::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidSettings` for a negative or non-finite threshold or
    /// spread, or a target state of charge outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if let DischargeRule::AbovePrice { threshold } = self.discharge {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(EngineError::InvalidSettings(format!(
                    "discharge threshold must be finite and >= 0, got {threshold}"
                )));
            }
        }
        if let GridChargeRule::CheapPeriod {
            min_spread,
            target_soc,
        } = self.grid_charge
        {
            if !min_spread.is_finite() {
                return Err(EngineError::InvalidSettings(format!(
                    "grid charge min_spread must be finite, got {min_spread}"
                )));
            }
            if !(0.0..=1.0).contains(&target_soc) {
                return Err(EngineError::InvalidSettings(format!(
                    "grid charge target_soc must be within [0, 1], got {target_soc}"
                )));
            }
        }
        Ok(())
    }

    /// Resolves the grid-charge rule against a plan and a battery.
    ///
    /// # Returns
    ///
    /// The target state of charge as a fraction of usable capacity, or `None`
    /// if grid charging is off or not worth it under this plan.
    pub fn grid_charge_target(&self, plan: &RatePlan, round_trip_efficiency: f64) -> Option<f64> {
        match self.grid_charge {
            GridChargeRule::Never => None,
            GridChargeRule::CheapPeriod {
                min_spread,
                target_soc,
            } => {
                let spread = plan.peak_price() * round_trip_efficiency - plan.cheapest_price();
                (spread > min_spread && target_soc > 0.0).then_some(target_soc)
            }
        }
    }

    /// Whether the battery may discharge at `price`.
    ///
    /// `in_charge_window` is true for steps in which grid charging is active
    /// under this plan.
    pub fn may_discharge(&self, price: f64, in_charge_window: bool) -> bool {
        match self.discharge {
            DischargeRule::Always => true,
            DischargeRule::AbovePrice { threshold } => price > threshold,
            DischargeRule::OutsideChargeWindow => !in_charge_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::presets;

    #[test]
    fn defaults() {
        let policy = DispatchPolicy::default();
        assert_eq!(policy.discharge, DischargeRule::OutsideChargeWindow);
        assert_eq!(
            policy.grid_charge,
            GridChargeRule::CheapPeriod {
                min_spread: 0.0,
                target_soc: 1.0
            }
        );
        assert_eq!(policy.efficiency, EfficiencyModel::Symmetric);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn grid_charging_needs_a_spread() {
        let policy = DispatchPolicy::default();
        assert_eq!(
            policy.grid_charge_target(&presets::ultra_low_overnight(), 0.9),
            Some(1.0)
        );
        assert_eq!(policy.grid_charge_target(&presets::flat(0.12), 0.9), None);

        let picky = DispatchPolicy {
            grid_charge: GridChargeRule::CheapPeriod {
                min_spread: 0.5,
                target_soc: 1.0,
            },
            ..DispatchPolicy::default()
        };
        assert_eq!(
            picky.grid_charge_target(&presets::ultra_low_overnight(), 0.9),
            None
        );
        assert_eq!(
            DispatchPolicy::self_consumption()
                .grid_charge_target(&presets::ultra_low_overnight(), 0.9),
            None
        );
    }

    #[test]
    fn discharge_rules() {
        let default = DispatchPolicy::default();
        assert!(default.may_discharge(0.1, false));
        assert!(!default.may_discharge(0.1, true));

        let above = DispatchPolicy {
            discharge: DischargeRule::AbovePrice { threshold: 0.15 },
            ..DispatchPolicy::default()
        };
        assert!(above.may_discharge(0.2, false));
        assert!(!above.may_discharge(0.15, false));

        assert!(DispatchPolicy::self_consumption().may_discharge(0.0, true));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let bad_target = DispatchPolicy {
            grid_charge: GridChargeRule::CheapPeriod {
                min_spread: 0.0,
                target_soc: 1.5,
            },
            ..DispatchPolicy::default()
        };
        assert!(bad_target.validate().is_err());

        let bad_threshold = DispatchPolicy {
            discharge: DischargeRule::AbovePrice { threshold: -1.0 },
            ..DispatchPolicy::default()
        };
        assert!(matches!(
            bad_threshold.validate(),
            Err(EngineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn deserializes_partial_toml() {
        let policy: DispatchPolicy = toml::from_str(
            r#"
efficiency = "on_discharge"
[grid_charge]
kind = "cheap_period"
min_spread = 0.05
"#,
        )
        .unwrap();
        assert_eq!(policy.efficiency, EfficiencyModel::OnDischarge);
        assert_eq!(
            policy.grid_charge,
            GridChargeRule::CheapPeriod {
                min_spread: 0.05,
                target_soc: 1.0
            }
        );
        assert_eq!(policy.discharge, DischargeRule::OutsideChargeWindow);
    }
}
