//! Core simulation types: per-step dispatch records and the run they form.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Complete record of one dispatch step.
///
/// Energies are kWh for the step. Per step:
/// `solar_to_load + solar_to_battery + solar_exported = solar_kwh` and
/// `battery_to_load + grid_to_load = consumption_kwh - solar_to_load`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchStep {
    /// Start of the step.
    pub timestamp: NaiveDateTime,
    /// Label of the rate period in force.
    pub period: String,
    /// Retail price ($/kWh).
    pub price: f64,
    /// Export credit ($/kWh).
    pub export_rate: f64,
    /// Household consumption.
    pub consumption_kwh: f64,
    /// Solar production.
    pub solar_kwh: f64,
    pub solar_to_load: f64,
    pub solar_to_battery: f64,
    pub solar_exported: f64,
    pub battery_to_load: f64,
    pub grid_to_load: f64,
    /// Grid energy drawn into the battery.
    pub grid_to_battery: f64,
    /// Stored energy at the end of the step.
    pub soc_kwh: f64,
    /// Net grid cost of the step ($); negative when export credit dominates.
    pub cost: f64,
}

impl DispatchStep {
    /// Energy imported from the grid during the step.
    pub fn grid_import_kwh(&self) -> f64 {
        self.grid_to_load + self.grid_to_battery
    }

    /// Cost of the step without battery or solar.
    pub fn baseline_cost(&self) -> f64 {
        self.consumption_kwh * self.price
    }

    /// Cost of the step with solar but no battery.
    pub fn solar_only_cost(&self) -> f64 {
        let self_consumed = self.solar_kwh.min(self.consumption_kwh);
        let import = self.consumption_kwh - self_consumed;
        let export = self.solar_kwh - self_consumed;
        import * self.price - export * self.export_rate
    }
}

/// A full year of dispatch for one battery under one rate plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRun {
    pub battery_id: String,
    pub plan_id: String,
    pub usable_kwh: f64,
    /// Duration of one step in hours.
    pub step_hours: f64,
    pub steps: Vec<DispatchStep>,
    /// Energy delivered from the battery to the household (kWh).
    pub total_kwh_shifted: f64,
    /// Energy withdrawn from storage, before discharge losses (kWh).
    pub total_withdrawn_kwh: f64,
    /// Full-equivalent cycles: withdrawn energy over usable capacity.
    pub cycles: f64,
}

impl DispatchRun {
    /// Net grid cost of the whole run.
    pub fn total_cost(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).sum()
    }

    /// Steps whose timestamp falls in `[from, to)`; open ends are unbounded.
    pub fn window(
        &self,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> impl Iterator<Item = &DispatchStep> {
        self.steps.iter().filter(move |s| {
            from.is_none_or(|f| s.timestamp >= f) && to.is_none_or(|t| s.timestamp < t)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn step(h: u32, consumption_kwh: f64, solar_kwh: f64) -> DispatchStep {
        DispatchStep {
            timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(h, 0, 0))
                .unwrap(),
            period: "flat".into(),
            price: 0.2,
            export_rate: 0.05,
            consumption_kwh,
            solar_kwh,
            solar_to_load: 0.0,
            solar_to_battery: 0.0,
            solar_exported: 0.0,
            battery_to_load: 0.0,
            grid_to_load: consumption_kwh,
            grid_to_battery: 0.0,
            soc_kwh: 0.0,
            cost: consumption_kwh * 0.2,
        }
    }

    #[test]
    fn baseline_and_solar_only_costs() {
        let s = step(12, 2.0, 3.0);
        assert!((s.baseline_cost() - 0.4).abs() < 1e-12);
        // 2 kWh self-consumed, 1 kWh exported at 0.05.
        assert!((s.solar_only_cost() + 0.05).abs() < 1e-12);
    }

    #[test]
    fn window_filters_half_open() {
        let run = DispatchRun {
            battery_id: "b".into(),
            plan_id: "flat".into(),
            usable_kwh: 0.0,
            step_hours: 1.0,
            steps: (0..6).map(|h| step(h, 1.0, 0.0)).collect(),
            total_kwh_shifted: 0.0,
            total_withdrawn_kwh: 0.0,
            cycles: 0.0,
        };
        let from = run.steps[2].timestamp;
        let to = run.steps[4].timestamp;
        assert_eq!(run.window(Some(from), Some(to)).count(), 2);
        assert_eq!(run.window(None, Some(to)).count(), 4);
        assert_eq!(run.window(None, None).count(), 6);
        assert!((run.total_cost() - 1.2).abs() < 1e-12);
    }
}
