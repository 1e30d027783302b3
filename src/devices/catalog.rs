//! Sample battery catalog used when a scenario lists no batteries.
//!
//! Prices are typical installed prices in CAD before incentives.

use super::battery::BatterySpec;

#[expect(clippy::too_many_arguments)]
fn spec(
    id: &str,
    brand: &str,
    model: &str,
    usable_kwh: f64,
    nominal_kwh: f64,
    inverter_kw: f64,
    round_trip_efficiency: f64,
    price: f64,
) -> BatterySpec {
    BatterySpec {
        id: id.into(),
        brand: brand.into(),
        model: model.into(),
        usable_kwh,
        nominal_kwh,
        inverter_kw,
        round_trip_efficiency,
        depth_of_discharge: 1.0,
        price,
    }
}

/// Five common residential batteries, smallest first.
pub fn sample_catalog() -> Vec<BatterySpec> {
    vec![
        spec("iq-5p", "Enphase", "IQ Battery 5P", 5.0, 5.0, 3.84, 0.90, 7_500.0),
        spec("pwrcell-9", "Generac", "PWRcell M3", 9.0, 9.0, 4.5, 0.895, 12_000.0),
        spec("powerwall-3", "Tesla", "Powerwall 3", 13.5, 13.5, 11.5, 0.90, 16_500.0),
        spec("apower-2", "FranklinWH", "aPower 2", 15.0, 15.0, 10.0, 0.89, 18_000.0),
        spec("resu-prime-16", "LG", "RESU Prime 16H", 16.0, 17.3, 7.0, 0.90, 19_500.0),
    ]
}
