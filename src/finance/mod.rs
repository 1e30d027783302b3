//! First-year savings, multi-year projection and investment metrics.

pub mod first_year;
pub mod projection;
pub mod rebate;

pub use first_year::FirstYearAnalysis;
pub use projection::{
    FinanceSettings, InvestmentMetrics, MultiYearProjection, PAYBACK_HORIZON_YEARS, SavingsBasis,
    YearlySavings,
};
pub use rebate::{RebateRule, RebateTier};

use crate::devices::BatterySpec;
use crate::error::Result;
use crate::sim::types::DispatchRun;

/// Turns dispatch runs into financial results.
///
/// # Examples
///
/// ```
/// use battery_roi::finance::{FinanceSettings, FinancialProjector};
///
/// let projector = FinancialProjector::new(FinanceSettings::default()).unwrap();
/// assert_eq!(projector.settings().years, 25);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FinancialProjector {
    settings: FinanceSettings,
}

impl FinancialProjector {
    /// # Errors
    ///
    /// Returns `InvalidSettings` if the settings are out of range.
    pub fn new(settings: FinanceSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &FinanceSettings {
        &self.settings
    }

    /// Aggregates a dispatch run into first-year costs and savings.
    pub fn first_year(&self, run: &DispatchRun) -> FirstYearAnalysis {
        FirstYearAnalysis::from_run(run)
    }

    /// Projects first-year savings over the configured horizon.
    pub fn project(
        &self,
        first_year: &FirstYearAnalysis,
        spec: &BatterySpec,
    ) -> MultiYearProjection {
        MultiYearProjection::new(first_year, spec, &self.settings)
    }

    /// Payback, ROI and savings per dollar for a projection.
    pub fn metrics(&self, projection: &MultiYearProjection) -> InvestmentMetrics {
        InvestmentMetrics::from_projection(projection)
    }
}

/// Formats an optional figure, using `N/A` for the sentinel.
pub fn fmt_or_na(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "N/A".to_owned(),
    }
}
