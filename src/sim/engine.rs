//! Battery dispatch simulator: walks a usage profile step by step and decides
//! how solar, storage and the grid serve the household.

use tracing::debug;

use crate::devices::{Battery, BatterySpec};
use crate::error::Result;
use crate::profile::{UsageDataPoint, UsageProfile};
use crate::tariff::RatePlan;

use super::allocation::allocate_solar;
use super::policy::DispatchPolicy;
use super::types::{DispatchRun, DispatchStep};

/// Runs one battery against one rate plan.
///
/// Each step follows the same order:
/// 1. solar serves the load, then charges the battery, then exports;
/// 2. during the plan's cheap period, if the policy allows it, the battery
///    tops up from the grid with whatever inverter capacity is left;
/// 3. otherwise, if a residual load remains and the policy allows it, the
///    battery discharges into it.
///
/// A battery never charges and discharges in the same step. It starts the
/// year at its depth-of-discharge floor.
///
/// # Examples
///
/// ```
/// use battery_roi::devices::BatterySpec;
/// use battery_roi::profile::{LoadShape, UsageProfileGenerator};
/// use battery_roi::sim::{BatteryDispatchSimulator, DispatchPolicy};
/// use battery_roi::tariff::presets;
///
/// let plan = presets::ultra_low_overnight();
/// let profile = UsageProfileGenerator::new(LoadShape::flat())
///     .unwrap()
///     .generate(12_000.0, &plan, 2025, false)
///     .unwrap();
/// let battery = BatterySpec {
///     id: "b15".into(),
///     brand: "Acme".into(),
///     model: "15".into(),
///     usable_kwh: 15.0,
///     nominal_kwh: 16.0,
///     inverter_kw: 5.0,
///     round_trip_efficiency: 0.9,
///     depth_of_discharge: 1.0,
///     price: 14_000.0,
/// };
///
/// let policy = DispatchPolicy::default();
/// let run = BatteryDispatchSimulator::new(&plan, &policy)
///     .run(&profile, &battery)
///     .unwrap();
/// assert_eq!(run.steps.len(), 8760);
/// assert!(run.cycles > 300.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BatteryDispatchSimulator<'a> {
    plan: &'a RatePlan,
    policy: &'a DispatchPolicy,
}

impl<'a> BatteryDispatchSimulator<'a> {
    pub fn new(plan: &'a RatePlan, policy: &'a DispatchPolicy) -> Self {
        Self { plan, policy }
    }

    /// Simulates a full profile.
    ///
    /// # Arguments
    ///
    /// * `profile` - Validated usage profile (consumption and solar)
    /// * `spec` - Validated battery spec
    ///
    /// # Returns
    ///
    /// The complete [`DispatchRun`], one [`DispatchStep`] per profile point.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedPeriod` if a timestamp has no rate period.
    pub fn run(&self, profile: &UsageProfile, spec: &BatterySpec) -> Result<DispatchRun> {
        let mut battery = Battery::new(spec, self.policy.efficiency, profile.step_hours());
        let charge_target = self
            .policy
            .grid_charge_target(self.plan, spec.round_trip_efficiency);

        let mut steps = Vec::with_capacity(profile.len());
        let mut shifted = 0.0;
        let mut withdrawn = 0.0;

        for point in profile.points() {
            let (step, step_withdrawn) = self.step(point, &mut battery, charge_target)?;
            shifted += step.battery_to_load;
            withdrawn += step_withdrawn;
            steps.push(step);
        }

        let cycles = if spec.usable_kwh > 0.0 {
            withdrawn / spec.usable_kwh
        } else {
            0.0
        };
        debug!(
            battery = %spec.id,
            plan = %self.plan.id,
            shifted_kwh = shifted,
            cycles,
            "dispatch run complete"
        );

        Ok(DispatchRun {
            battery_id: spec.id.clone(),
            plan_id: self.plan.id.clone(),
            usable_kwh: spec.usable_kwh,
            step_hours: profile.step_hours(),
            steps,
            total_kwh_shifted: shifted,
            total_withdrawn_kwh: withdrawn,
            cycles,
        })
    }

    /// Executes one step.
    ///
    /// # Returns
    ///
    /// The step record and the energy withdrawn from storage.
    fn step(
        &self,
        point: &UsageDataPoint,
        battery: &mut Battery,
        charge_target: Option<f64>,
    ) -> Result<(DispatchStep, f64)> {
        let period = self.plan.period_at(point.timestamp)?;
        let price = period.price_per_kwh;
        let export_rate = self.plan.export_rate(price);
        let inverter_kwh = battery.max_step_kwh();

        // 1. Solar: load, battery, export
        let room = battery.headroom_kwh().min(inverter_kwh);
        let solar = allocate_solar(point.consumption_kwh, point.solar_kwh, room);
        let solar_to_battery = battery.charge(solar.to_battery);
        let solar_exported = solar.exported + (solar.to_battery - solar_to_battery);

        let residual = (point.consumption_kwh - solar.to_load).max(0.0);

        // 2. Grid charging in the cheap window
        let in_charge_window = charge_target.is_some() && self.plan.is_cheap_price(price);
        let grid_to_battery = match charge_target {
            Some(target_soc) if in_charge_window => {
                let inverter_left = (inverter_kwh - solar_to_battery).max(0.0);
                let room = battery
                    .headroom_to(target_soc * battery.usable_kwh())
                    .min(inverter_left);
                battery.charge(room)
            }
            _ => 0.0,
        };

        // 3. Discharge into the residual load
        let charging = solar_to_battery > 0.0 || grid_to_battery > 0.0;
        let (battery_to_load, withdrawn) =
            if !charging && residual > 0.0 && self.policy.may_discharge(price, in_charge_window) {
                battery.discharge(residual.min(inverter_kwh))
            } else {
                (0.0, 0.0)
            };

        let grid_to_load = (residual - battery_to_load).max(0.0);
        let cost = (grid_to_load + grid_to_battery) * price - solar_exported * export_rate;

        let step = DispatchStep {
            timestamp: point.timestamp,
            period: period.label.clone(),
            price,
            export_rate,
            consumption_kwh: point.consumption_kwh,
            solar_kwh: point.solar_kwh,
            solar_to_load: solar.to_load,
            solar_to_battery,
            solar_exported,
            battery_to_load,
            grid_to_load,
            grid_to_battery,
            soc_kwh: battery.soc_kwh(),
            cost,
        };
        Ok((step, withdrawn))
    }
}

/// Convenience wrapper around [`BatteryDispatchSimulator::run`].
///
/// # Errors
///
/// Returns `UnresolvedPeriod` if a timestamp has no rate period.
pub fn simulate(
    profile: &UsageProfile,
    plan: &RatePlan,
    spec: &BatterySpec,
    policy: &DispatchPolicy,
) -> Result<DispatchRun> {
    BatteryDispatchSimulator::new(plan, policy).run(profile, spec)
}
