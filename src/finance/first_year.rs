use std::fmt;

use serde::Serialize;

use crate::sim::types::DispatchRun;

/// First-year costs and savings for one battery under one rate plan.
///
/// Three annual bills are compared:
/// - `original`: no solar, no battery;
/// - `solar_only`: solar, no battery;
/// - `optimized`: solar and battery, including grid energy bought to charge
///   the battery.
///
/// Built only by [`FinancialProjector`](super::FinancialProjector).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstYearAnalysis {
    original_annual_cost: f64,
    solar_only_annual_cost: f64,
    optimized_annual_cost: f64,
    total_savings: f64,
    storage_savings: f64,
    cycles_per_year: f64,
    total_kwh_shifted: f64,
}

impl FirstYearAnalysis {
    pub(crate) fn from_run(run: &DispatchRun) -> Self {
        let mut original = 0.0;
        let mut solar_only = 0.0;
        let mut optimized = 0.0;
        for step in &run.steps {
            original += step.baseline_cost();
            solar_only += step.solar_only_cost();
            optimized += step.cost;
        }

        Self {
            original_annual_cost: original,
            solar_only_annual_cost: solar_only,
            optimized_annual_cost: optimized,
            total_savings: original - optimized,
            storage_savings: solar_only - optimized,
            cycles_per_year: run.cycles,
            total_kwh_shifted: run.total_kwh_shifted,
        }
    }

    /// Annual bill with no solar and no battery ($).
    pub fn original_annual_cost(&self) -> f64 {
        self.original_annual_cost
    }

    /// Annual bill with solar but no battery ($).
    pub fn solar_only_annual_cost(&self) -> f64 {
        self.solar_only_annual_cost
    }

    /// Annual bill with solar and battery ($).
    pub fn optimized_annual_cost(&self) -> f64 {
        self.optimized_annual_cost
    }

    /// Original minus optimized: solar and battery together ($).
    pub fn total_savings(&self) -> f64 {
        self.total_savings
    }

    /// Solar-only minus optimized: the battery's own contribution ($).
    pub fn storage_savings(&self) -> f64 {
        self.storage_savings
    }

    pub fn cycles_per_year(&self) -> f64 {
        self.cycles_per_year
    }

    /// Energy delivered from the battery to the household (kWh).
    pub fn total_kwh_shifted(&self) -> f64 {
        self.total_kwh_shifted
    }
}

impl fmt::Display for FirstYearAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Original annual cost:  ${:.2}", self.original_annual_cost)?;
        writeln!(f, "Solar-only cost:       ${:.2}", self.solar_only_annual_cost)?;
        writeln!(f, "Optimized cost:        ${:.2}", self.optimized_annual_cost)?;
        writeln!(f, "Total savings:         ${:.2}", self.total_savings)?;
        writeln!(f, "Storage savings:       ${:.2}", self.storage_savings)?;
        write!(
            f,
            "Cycles / shifted:      {:.1} / {:.0} kWh",
            self.cycles_per_year, self.total_kwh_shifted
        )
    }
}
