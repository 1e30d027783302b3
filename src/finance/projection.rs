use std::fmt;

use serde::{Deserialize, Serialize};

use super::first_year::FirstYearAnalysis;
use super::fmt_or_na;
use super::rebate::RebateRule;
use crate::devices::BatterySpec;
use crate::error::{EngineError, Result};

/// Horizon beyond which payback is reported as not reached.
pub const PAYBACK_HORIZON_YEARS: u32 = 100;

/// Which first-year savings figure drives the projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsBasis {
    /// Savings the battery adds on top of solar alone.
    #[default]
    StorageOnly,
    /// Savings of solar and battery together against no system.
    Combined,
}

/// Financial assumptions for the multi-year projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinanceSettings {
    /// Annual electricity price escalation, compounding.
    pub escalation_rate: f64,
    /// Projection horizon in years.
    pub years: u32,
    /// Annual loss of battery savings from capacity fade.
    pub degradation_rate: f64,
    pub savings_basis: SavingsBasis,
    pub rebate: RebateRule,
}

impl Default for FinanceSettings {
    fn default() -> Self {
        Self {
            escalation_rate: 0.05,
            years: 25,
            degradation_rate: 0.0,
            savings_basis: SavingsBasis::default(),
            rebate: RebateRule::default(),
        }
    }
}

impl FinanceSettings {
    /// # Errors
    ///
    /// Returns `InvalidSettings` for an escalation rate at or below -100%, a
    /// horizon outside 1–100 years, or a degradation rate outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !self.escalation_rate.is_finite() || self.escalation_rate <= -1.0 {
            return Err(EngineError::InvalidSettings(format!(
                "escalation_rate must be finite and > -1, got {}",
                self.escalation_rate
            )));
        }
        if !(1..=PAYBACK_HORIZON_YEARS).contains(&self.years) {
            return Err(EngineError::InvalidSettings(format!(
                "years must be within 1..={PAYBACK_HORIZON_YEARS}, got {}",
                self.years
            )));
        }
        if !(0.0..1.0).contains(&self.degradation_rate) {
            return Err(EngineError::InvalidSettings(format!(
                "degradation_rate must be within [0, 1), got {}",
                self.degradation_rate
            )));
        }
        self.rebate.validate()
    }

    /// Savings in projection year `year` (1-based) given first-year savings.
    pub fn savings_in_year(&self, first_year_savings: f64, year: u32) -> f64 {
        let n = year.saturating_sub(1) as i32;
        first_year_savings
            * (1.0 + self.escalation_rate).powi(n)
            * (1.0 - self.degradation_rate).powi(n)
    }
}

/// One row of the projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlySavings {
    pub year: u32,
    pub savings: f64,
    pub cumulative_savings: f64,
}

/// Escalated savings over the projection horizon, net of the battery's cost.
///
/// Built only by [`FinancialProjector`](super::FinancialProjector).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiYearProjection {
    price: f64,
    rebate: f64,
    net_cost: f64,
    annual_savings: f64,
    years: u32,
    total_savings: f64,
    net_profit: f64,
    payback_years: Option<f64>,
    yearly: Vec<YearlySavings>,
}

impl MultiYearProjection {
    pub(crate) fn new(
        first_year: &FirstYearAnalysis,
        spec: &BatterySpec,
        settings: &FinanceSettings,
    ) -> Self {
        let annual_savings = match settings.savings_basis {
            SavingsBasis::StorageOnly => first_year.storage_savings(),
            SavingsBasis::Combined => first_year.total_savings(),
        };
        let rebate = settings.rebate.rebate_for(spec.usable_kwh).min(spec.price);
        let net_cost = (spec.price - rebate).max(0.0);

        let mut cumulative = 0.0;
        let yearly: Vec<YearlySavings> = (1..=settings.years)
            .map(|year| {
                let savings = settings.savings_in_year(annual_savings, year);
                cumulative += savings;
                YearlySavings {
                    year,
                    savings,
                    cumulative_savings: cumulative,
                }
            })
            .collect();

        let total_savings = cumulative;
        Self {
            price: spec.price,
            rebate,
            net_cost,
            annual_savings,
            years: settings.years,
            total_savings,
            net_profit: total_savings - net_cost,
            payback_years: payback_years(annual_savings, net_cost, settings),
            yearly,
        }
    }

    /// Installed price before rebate ($).
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn rebate(&self) -> f64 {
        self.rebate
    }

    /// Price minus rebate, never negative ($).
    pub fn net_cost(&self) -> f64 {
        self.net_cost
    }

    /// First-year savings on the configured basis ($).
    pub fn annual_savings(&self) -> f64 {
        self.annual_savings
    }

    /// Projection horizon in years.
    pub fn years(&self) -> u32 {
        self.years
    }

    /// Cumulative escalated savings over the horizon ($).
    pub fn total_savings(&self) -> f64 {
        self.total_savings
    }

    /// Cumulative savings minus net cost ($).
    pub fn net_profit(&self) -> f64 {
        self.net_profit
    }

    /// Fractional years until cumulative savings cover the net cost; `None`
    /// when not reached within [`PAYBACK_HORIZON_YEARS`].
    pub fn payback_years(&self) -> Option<f64> {
        self.payback_years
    }

    pub fn yearly(&self) -> &[YearlySavings] {
        &self.yearly
    }
}

impl fmt::Display for MultiYearProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Net cost:              ${:.2} (price ${:.2}, rebate ${:.2})",
            self.net_cost, self.price, self.rebate
        )?;
        writeln!(
            f,
            "{}-year savings:       ${:.2}",
            self.years, self.total_savings
        )?;
        writeln!(f, "{}-year net profit:    ${:.2}", self.years, self.net_profit)?;
        write!(
            f,
            "Payback:               {} years",
            fmt_or_na(self.payback_years, 1)
        )
    }
}

/// Smallest fractional year at which cumulative savings reach `net_cost`.
///
/// Interpolates inside the crossing year: `n - 1 + remaining / savings_n`.
fn payback_years(annual_savings: f64, net_cost: f64, settings: &FinanceSettings) -> Option<f64> {
    if !annual_savings.is_finite() || annual_savings <= 0.0 || net_cost <= 0.0 {
        return None;
    }
    let mut cumulative = 0.0;
    for year in 1..=PAYBACK_HORIZON_YEARS {
        let savings = settings.savings_in_year(annual_savings, year);
        if savings <= 0.0 {
            return None;
        }
        if cumulative + savings >= net_cost {
            let remaining = net_cost - cumulative;
            return Some((year - 1) as f64 + remaining / savings);
        }
        cumulative += savings;
    }
    None
}

/// Per-dollar investment metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvestmentMetrics {
    /// Fractional payback in years, `None` for "N/A".
    pub payback_years: Option<f64>,
    /// First-year savings over net cost, in percent.
    pub annual_roi: Option<f64>,
    /// Horizon savings per dollar of net cost.
    pub savings_per_dollar_invested: Option<f64>,
}

impl InvestmentMetrics {
    pub(crate) fn from_projection(projection: &MultiYearProjection) -> Self {
        let per_dollar = |value: f64| {
            let ratio = value / projection.net_cost;
            (projection.net_cost > 0.0 && ratio.is_finite()).then_some(ratio)
        };
        Self {
            payback_years: projection.payback_years,
            annual_roi: per_dollar(projection.annual_savings).map(|r| r * 100.0),
            savings_per_dollar_invested: per_dollar(projection.total_savings),
        }
    }
}

impl fmt::Display for InvestmentMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payback {} yrs, ROI {}%, ${} saved per $",
            fmt_or_na(self.payback_years, 1),
            fmt_or_na(self.annual_roi, 1),
            fmt_or_na(self.savings_per_dollar_invested, 2)
        )
    }
}
