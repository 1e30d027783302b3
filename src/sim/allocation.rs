//! Per-step split of solar production.

/// Where one step's solar energy went.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolarAllocation {
    /// Solar consumed directly by the household (kWh).
    pub to_load: f64,
    /// Solar offered to the battery (kWh, AC side).
    pub to_battery: f64,
    /// Solar sent to the grid (kWh).
    pub exported: f64,
}

/// Splits solar production in fixed priority: load, then battery, then grid.
///
/// Self-consumption always wins over storage and storage always wins over
/// export. The three outputs always sum to `solar_kwh`.
///
/// # Arguments
///
/// * `consumption_kwh` - Household consumption for the step
/// * `solar_kwh` - Solar production for the step
/// * `charge_room_kwh` - AC energy the battery can take this step, already
///   limited by both headroom and inverter power
///
/// # Returns
///
/// The [`SolarAllocation`] for the step.
pub fn allocate_solar(
    consumption_kwh: f64,
    solar_kwh: f64,
    charge_room_kwh: f64,
) -> SolarAllocation {
    let solar = solar_kwh.max(0.0);
    let to_load = solar.min(consumption_kwh.max(0.0));
    let surplus = solar - to_load;
    let to_battery = surplus.min(charge_room_kwh.max(0.0));
    SolarAllocation {
        to_load,
        to_battery,
        exported: surplus - to_battery,
    }
}
