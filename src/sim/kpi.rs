//! Post-hoc KPI computation from dispatch runs.

use std::fmt;

use serde::Serialize;

use super::types::DispatchRun;

/// Aggregate indicators derived from a complete dispatch run.
///
/// Computed post-hoc from the step records so reported figures always agree
/// with the steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub battery_id: String,
    pub plan_id: String,
    /// Energy into the battery, solar and grid combined (kWh, AC side).
    pub charged_kwh: f64,
    /// Energy from the battery to the household (kWh).
    pub discharged_kwh: f64,
    /// Charge plus discharge energy (kWh).
    pub throughput_kwh: f64,
    /// Full-equivalent cycles.
    pub equivalent_cycles: f64,
    /// Highest grid import power (kW).
    pub peak_import_kw: f64,
    /// Total grid import (kWh).
    pub grid_import_kwh: f64,
    /// Grid energy drawn into the battery (kWh).
    pub grid_charged_kwh: f64,
    /// Solar sent to the grid (kWh).
    pub exported_kwh: f64,
    /// Share of solar used on site, directly or through the battery.
    pub self_consumption_ratio: f64,
    /// Net grid cost over the run ($).
    pub net_cost: f64,
}

impl DispatchSummary {
    /// Computes all KPIs from a dispatch run.
    ///
    /// # Arguments
    ///
    /// * `run` - Complete dispatch run
    ///
    /// # Returns
    ///
    /// A `DispatchSummary` with all fields populated; an empty run gives
    /// zeros.
    pub fn from_run(run: &DispatchRun) -> Self {
        let mut charged = 0.0_f64;
        let mut discharged = 0.0_f64;
        let mut peak_import_kw = 0.0_f64;
        let mut grid_import = 0.0_f64;
        let mut grid_charged = 0.0_f64;
        let mut exported = 0.0_f64;
        let mut solar_total = 0.0_f64;
        let mut solar_used = 0.0_f64;
        let mut net_cost = 0.0_f64;

        for s in &run.steps {
            charged += s.solar_to_battery + s.grid_to_battery;
            discharged += s.battery_to_load;
            let import = s.grid_import_kwh();
            grid_import += import;
            if run.step_hours > 0.0 {
                peak_import_kw = peak_import_kw.max(import / run.step_hours);
            }
            grid_charged += s.grid_to_battery;
            exported += s.solar_exported;
            solar_total += s.solar_kwh;
            solar_used += s.solar_to_load + s.solar_to_battery;
            net_cost += s.cost;
        }

        let self_consumption_ratio = if solar_total > 0.0 {
            solar_used / solar_total
        } else {
            0.0
        };

        Self {
            battery_id: run.battery_id.clone(),
            plan_id: run.plan_id.clone(),
            charged_kwh: charged,
            discharged_kwh: discharged,
            throughput_kwh: charged + discharged,
            equivalent_cycles: run.cycles,
            peak_import_kw,
            grid_import_kwh: grid_import,
            grid_charged_kwh: grid_charged,
            exported_kwh: exported,
            self_consumption_ratio,
            net_cost,
        }
    }
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Dispatch: {} on {} ---",
            self.battery_id, self.plan_id
        )?;
        writeln!(
            f,
            "Battery throughput:    {:.1} kWh ({:.1} equiv. cycles)",
            self.throughput_kwh, self.equivalent_cycles
        )?;
        writeln!(f, "Discharged to load:    {:.1} kWh", self.discharged_kwh)?;
        writeln!(f, "Grid import:           {:.1} kWh", self.grid_import_kwh)?;
        writeln!(f, "  of which to battery: {:.1} kWh", self.grid_charged_kwh)?;
        writeln!(f, "Peak import:           {:.2} kW", self.peak_import_kw)?;
        writeln!(f, "Solar exported:        {:.1} kWh", self.exported_kwh)?;
        writeln!(
            f,
            "Solar self-consumed:   {:.1}%",
            self.self_consumption_ratio * 100.0
        )?;
        write!(f, "Net grid cost:         ${:.2}", self.net_cost)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;
    use crate::sim::types::DispatchStep;

    fn step(
        i: i64,
        solar_to_load: f64,
        solar_to_battery: f64,
        exported: f64,
        grid: f64,
    ) -> DispatchStep {
        DispatchStep {
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap()
                + TimeDelta::minutes(30 * i),
            period: "flat".into(),
            price: 0.1,
            export_rate: 0.1,
            consumption_kwh: solar_to_load + grid,
            solar_kwh: solar_to_load + solar_to_battery + exported,
            solar_to_load,
            solar_to_battery,
            solar_exported: exported,
            battery_to_load: 0.0,
            grid_to_load: grid,
            grid_to_battery: 0.0,
            soc_kwh: 0.0,
            cost: grid * 0.1 - exported * 0.1,
        }
    }

    fn run(steps: Vec<DispatchStep>) -> DispatchRun {
        DispatchRun {
            battery_id: "b".into(),
            plan_id: "flat".into(),
            usable_kwh: 10.0,
            step_hours: 0.5,
            steps,
            total_kwh_shifted: 0.0,
            total_withdrawn_kwh: 0.0,
            cycles: 0.0,
        }
    }

    #[test]
    fn empty_run_is_all_zero() {
        let summary = DispatchSummary::from_run(&run(Vec::new()));
        assert_eq!(summary.throughput_kwh, 0.0);
        assert_eq!(summary.peak_import_kw, 0.0);
        assert_eq!(summary.self_consumption_ratio, 0.0);
    }

    #[test]
    fn peak_import_uses_step_length() {
        let summary = DispatchSummary::from_run(&run(vec![
            step(0, 0.0, 0.0, 0.0, 1.5),
            step(1, 0.0, 0.0, 0.0, 0.5),
        ]));
        assert!((summary.peak_import_kw - 3.0).abs() < 1e-12);
        assert!((summary.grid_import_kwh - 2.0).abs() < 1e-12);
    }

    #[test]
    fn self_consumption_ratio() {
        // solar 4 kWh: 1 to load, 2 to battery, 1 exported
        let summary = DispatchSummary::from_run(&run(vec![step(0, 1.0, 2.0, 1.0, 0.0)]));
        assert!((summary.self_consumption_ratio - 0.75).abs() < 1e-12);
        assert!((summary.charged_kwh - 2.0).abs() < 1e-12);
        assert!((summary.exported_kwh - 1.0).abs() < 1e-12);
    }

    #[test]
    fn display_mentions_ids() {
        let text = DispatchSummary::from_run(&run(Vec::new())).to_string();
        assert!(text.contains("b on flat"));
        assert!(text.contains("Net grid cost"));
    }
}
