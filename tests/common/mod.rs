//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use battery_roi::devices::{BatterySpec, SolarProductionModel};
use battery_roi::profile::{LoadShape, UsageProfile, UsageProfileGenerator};
use battery_roi::tariff::RatePlan;

/// Simulated calendar year used across integration tests.
pub const YEAR: i32 = 2025;

/// Battery with full depth of discharge and 90% round-trip efficiency.
pub fn battery(id: &str, usable_kwh: f64, inverter_kw: f64, price: f64) -> BatterySpec {
    BatterySpec {
        id: id.into(),
        brand: "Acme".into(),
        model: format!("{usable_kwh} kWh"),
        usable_kwh,
        nominal_kwh: usable_kwh,
        inverter_kw,
        round_trip_efficiency: 0.9,
        depth_of_discharge: 1.0,
        price,
    }
}

/// Flat-load hourly profile with no solar.
pub fn flat_profile(annual_kwh: f64, plan: &RatePlan) -> UsageProfile {
    UsageProfileGenerator::new(LoadShape::flat())
        .and_then(|g| g.generate(annual_kwh, plan, YEAR, false))
        .unwrap()
}

/// Seasonal residential profile with a clear-sky solar array of `solar_kw`.
pub fn solar_profile(annual_kwh: f64, solar_kw: f64, plan: &RatePlan) -> UsageProfile {
    let solar = SolarProductionModel::from_system(solar_kw, 1_150.0)
        .and_then(|m| m.generate(YEAR, 24))
        .unwrap();
    UsageProfileGenerator::default()
        .generate(annual_kwh, plan, YEAR, true)
        .and_then(|p| p.with_solar(&solar))
        .unwrap()
}
