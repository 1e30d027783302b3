use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Tolerance used when clamping state of charge to its bounds.
const SOC_EPSILON: f64 = 1e-9;

/// Catalog entry for a candidate home battery.
///
/// Immutable reference data: the engine reads it, never changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatterySpec {
    pub id: String,
    pub brand: String,
    pub model: String,
    /// Energy the battery can store and return, in kWh.
    pub usable_kwh: f64,
    /// Nameplate capacity in kWh.
    pub nominal_kwh: f64,
    /// Continuous inverter power in kW, shared by charge and discharge.
    pub inverter_kw: f64,
    /// Fraction of stored energy returned over a full charge/discharge round.
    pub round_trip_efficiency: f64,
    /// Fraction of usable capacity that may be cycled.
    pub depth_of_discharge: f64,
    /// Installed price in dollars.
    pub price: f64,
}

impl BatterySpec {
    /// Checks physical and commercial bounds.
    ///
    /// A zero-capacity battery is valid: it never stores anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBattery` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| EngineError::InvalidBattery {
            id: self.id.clone(),
            reason: reason.to_owned(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if !self.usable_kwh.is_finite() || self.usable_kwh < 0.0 {
            return Err(invalid("usable_kwh must be finite and >= 0"));
        }
        if !self.nominal_kwh.is_finite() || self.nominal_kwh < 0.0 {
            return Err(invalid("nominal_kwh must be finite and >= 0"));
        }
        if !self.inverter_kw.is_finite() || self.inverter_kw < 0.0 {
            return Err(invalid("inverter_kw must be finite and >= 0"));
        }
        if !(self.round_trip_efficiency > 0.0 && self.round_trip_efficiency <= 1.0) {
            return Err(invalid("round_trip_efficiency must be within (0, 1]"));
        }
        if !(self.depth_of_discharge > 0.0 && self.depth_of_discharge <= 1.0) {
            return Err(invalid("depth_of_discharge must be within (0, 1]"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid("price must be finite and >= 0"));
        }
        Ok(())
    }

    /// Lowest state of charge allowed by the depth of discharge, in kWh.
    pub fn floor_kwh(&self) -> f64 {
        self.usable_kwh * (1.0 - self.depth_of_discharge)
    }
}

/// Where round-trip losses are booked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyModel {
    /// √RTE on the way in and √RTE on the way out.
    #[default]
    Symmetric,
    /// Lossless charge; the full RTE applies on discharge.
    OnDischarge,
}

impl EfficiencyModel {
    /// Splits a round-trip efficiency into `(charge, discharge)` factors.
    pub fn split(self, round_trip_efficiency: f64) -> (f64, f64) {
        match self {
            EfficiencyModel::Symmetric => {
                let one_way = round_trip_efficiency.sqrt();
                (one_way, one_way)
            }
            EfficiencyModel::OnDischarge => (1.0, round_trip_efficiency),
        }
    }
}

/// Mutable state of one battery during a dispatch run.
///
/// All quantities are energies per step. Charge inputs and discharge outputs
/// are measured on the AC side; the state of charge is the energy stored.
/// The state of charge never leaves `[floor_kwh, usable_kwh]`.
#[derive(Debug, Clone)]
pub struct Battery {
    usable_kwh: f64,
    floor_kwh: f64,
    soc_kwh: f64,
    eta_c: f64,
    eta_d: f64,
    /// Inverter energy limit for one step in kWh.
    max_step_kwh: f64,
}

impl Battery {
    /// Creates a battery at its floor state of charge.
    ///
    /// # Arguments
    ///
    /// * `spec` - Validated battery spec
    /// * `efficiency` - How round-trip losses are split
    /// * `step_hours` - Duration of one step in hours
    pub fn new(spec: &BatterySpec, efficiency: EfficiencyModel, step_hours: f64) -> Self {
        let (eta_c, eta_d) = efficiency.split(spec.round_trip_efficiency);
        let floor_kwh = spec.floor_kwh();
        Self {
            usable_kwh: spec.usable_kwh,
            floor_kwh,
            soc_kwh: floor_kwh,
            eta_c,
            eta_d,
            max_step_kwh: spec.inverter_kw * step_hours,
        }
    }

    pub fn soc_kwh(&self) -> f64 {
        self.soc_kwh
    }

    pub fn floor_kwh(&self) -> f64 {
        self.floor_kwh
    }

    pub fn usable_kwh(&self) -> f64 {
        self.usable_kwh
    }

    /// Inverter limit for one step in kWh.
    pub fn max_step_kwh(&self) -> f64 {
        self.max_step_kwh
    }

    /// AC energy the battery can still accept before reaching `target_kwh`.
    pub fn headroom_to(&self, target_kwh: f64) -> f64 {
        let target = target_kwh.min(self.usable_kwh);
        ((target - self.soc_kwh) / self.eta_c).max(0.0)
    }

    /// AC energy the battery can still accept before it is full.
    pub fn headroom_kwh(&self) -> f64 {
        self.headroom_to(self.usable_kwh)
    }

    /// AC energy the battery can deliver before reaching its floor.
    pub fn deliverable_kwh(&self) -> f64 {
        ((self.soc_kwh - self.floor_kwh) * self.eta_d).max(0.0)
    }

    /// Stores up to `input_kwh` of AC energy, limited by headroom.
    ///
    /// # Returns
    ///
    /// The AC energy actually accepted.
    pub fn charge(&mut self, input_kwh: f64) -> f64 {
        let accepted = input_kwh.clamp(0.0, self.headroom_kwh());
        self.soc_kwh = (self.soc_kwh + accepted * self.eta_c).min(self.usable_kwh);
        accepted
    }

    /// Delivers up to `output_kwh` of AC energy, limited by stored energy.
    ///
    /// # Returns
    ///
    /// `(delivered, withdrawn)`: AC energy delivered and energy removed from
    /// storage.
    pub fn discharge(&mut self, output_kwh: f64) -> (f64, f64) {
        let delivered = output_kwh.clamp(0.0, self.deliverable_kwh());
        if delivered <= 0.0 {
            return (0.0, 0.0);
        }
        let withdrawn = delivered / self.eta_d;
        self.soc_kwh = (self.soc_kwh - withdrawn).max(self.floor_kwh);
        if self.soc_kwh - self.floor_kwh < SOC_EPSILON {
            self.soc_kwh = self.floor_kwh;
        }
        (delivered, withdrawn)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn spec(usable_kwh: f64, inverter_kw: f64, rte: f64, dod: f64) -> BatterySpec {
        BatterySpec {
            id: "test".into(),
            brand: "Acme".into(),
            model: "Cell".into(),
            usable_kwh,
            nominal_kwh: usable_kwh,
            inverter_kw,
            round_trip_efficiency: rte,
            depth_of_discharge: dod,
            price: 10_000.0,
        }
    }

    #[test]
    fn validate_accepts_zero_capacity() {
        assert!(spec(0.0, 0.0, 0.9, 1.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        assert!(spec(-1.0, 5.0, 0.9, 1.0).validate().is_err());
        assert!(spec(10.0, 5.0, 0.0, 1.0).validate().is_err());
        assert!(spec(10.0, 5.0, 1.1, 1.0).validate().is_err());
        assert!(spec(10.0, 5.0, 0.9, 0.0).validate().is_err());
        assert!(spec(10.0, f64::INFINITY, 0.9, 1.0).validate().is_err());
        let mut s = spec(10.0, 5.0, 0.9, 1.0);
        s.id = " ".into();
        assert!(matches!(
            s.validate(),
            Err(EngineError::InvalidBattery { .. })
        ));
    }

    #[test]
    fn efficiency_split() {
        let (c, d) = EfficiencyModel::Symmetric.split(0.81);
        assert_relative_eq!(c, 0.9, epsilon = 1e-9);
        assert_relative_eq!(d, 0.9, epsilon = 1e-9);
        assert_eq!(EfficiencyModel::OnDischarge.split(0.81), (1.0, 0.81));
    }

    #[test]
    fn starts_at_floor() {
        let battery = Battery::new(&spec(10.0, 5.0, 0.9, 0.8), EfficiencyModel::Symmetric, 1.0);
        assert_relative_eq!(battery.soc_kwh(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(battery.floor_kwh(), 2.0, epsilon = 1e-9);
        assert_eq!(battery.deliverable_kwh(), 0.0);
    }

    #[test]
    fn charge_limited_by_headroom() {
        let mut battery =
            Battery::new(&spec(10.0, 20.0, 1.0, 1.0), EfficiencyModel::Symmetric, 1.0);
        assert_eq!(battery.charge(4.0), 4.0);
        assert_eq!(battery.charge(100.0), 6.0);
        assert_eq!(battery.soc_kwh(), 10.0);
        assert_eq!(battery.charge(1.0), 0.0);
    }

    #[test]
    fn round_trip_loses_energy() {
        let mut battery =
            Battery::new(&spec(10.0, 20.0, 0.81, 1.0), EfficiencyModel::Symmetric, 1.0);
        let accepted = battery.charge(5.0);
        assert_relative_eq!(accepted, 5.0, epsilon = 1e-9);
        assert_relative_eq!(battery.soc_kwh(), 4.5, epsilon = 1e-9);
        let (delivered, withdrawn) = battery.discharge(100.0);
        assert_relative_eq!(delivered, 4.05, epsilon = 1e-9);
        assert_relative_eq!(withdrawn, 4.5, epsilon = 1e-9);
        assert_relative_eq!(battery.soc_kwh(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn discharge_stops_at_floor() {
        let mut battery =
            Battery::new(&spec(10.0, 20.0, 1.0, 0.5), EfficiencyModel::OnDischarge, 1.0);
        battery.charge(10.0);
        let (delivered, _) = battery.discharge(100.0);
        assert_relative_eq!(delivered, 5.0, epsilon = 1e-9);
        assert_relative_eq!(battery.soc_kwh(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn headroom_to_target() {
        let battery = Battery::new(&spec(10.0, 5.0, 1.0, 1.0), EfficiencyModel::Symmetric, 0.5);
        assert_relative_eq!(battery.headroom_to(6.0), 6.0, epsilon = 1e-9);
        assert_relative_eq!(battery.headroom_to(20.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(battery.max_step_kwh(), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn zero_capacity_battery_is_inert() {
        let mut battery = Battery::new(&spec(0.0, 0.0, 0.9, 1.0), EfficiencyModel::Symmetric, 1.0);
        assert_eq!(battery.charge(3.0), 0.0);
        assert_eq!(battery.discharge(3.0), (0.0, 0.0));
        assert_eq!(battery.soc_kwh(), 0.0);
    }
}
