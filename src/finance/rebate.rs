use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One band of a tiered per-kWh incentive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebateTier {
    /// Upper bound of the band in usable kWh (cumulative).
    pub up_to_kwh: f64,
    /// Incentive per kWh inside the band ($).
    pub per_kwh: f64,
}

/// Diminishing per-kWh battery incentive, capped per installation.
///
/// Tiers are ordered by `up_to_kwh`; each pays `per_kwh` for the capacity
/// between the previous bound and its own. Capacity past the last tier earns
/// nothing.
///
/// # Examples
///
/// ```
/// use battery_roi::finance::{RebateRule, RebateTier};
///
/// let rule = RebateRule {
///     tiers: vec![
///         RebateTier { up_to_kwh: 10.0, per_kwh: 300.0 },
///         RebateTier { up_to_kwh: 20.0, per_kwh: 150.0 },
///     ],
///     cap: Some(4_000.0),
/// };
/// assert_eq!(rule.rebate_for(5.0), 1_500.0);
/// assert_eq!(rule.rebate_for(15.0), 3_750.0);
/// assert_eq!(rule.rebate_for(30.0), 4_000.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RebateRule {
    pub tiers: Vec<RebateTier>,
    /// Maximum rebate per installation ($).
    pub cap: Option<f64>,
}

impl RebateRule {
    /// Rebate earned by a battery with `usable_kwh` of capacity.
    pub fn rebate_for(&self, usable_kwh: f64) -> f64 {
        let mut lower = 0.0_f64;
        let mut total = 0.0_f64;
        for tier in &self.tiers {
            let band = (usable_kwh.min(tier.up_to_kwh) - lower).max(0.0);
            total += band * tier.per_kwh;
            lower = lower.max(tier.up_to_kwh);
        }
        match self.cap {
            Some(cap) => total.min(cap),
            None => total,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidSettings` for unordered bounds, negative amounts or a
    /// negative cap.
    pub fn validate(&self) -> Result<()> {
        let mut previous = 0.0_f64;
        for tier in &self.tiers {
            if !tier.up_to_kwh.is_finite() || tier.up_to_kwh <= previous {
                return Err(EngineError::InvalidSettings(
                    "rebate tiers must have strictly increasing, finite up_to_kwh".into(),
                ));
            }
            if !tier.per_kwh.is_finite() || tier.per_kwh < 0.0 {
                return Err(EngineError::InvalidSettings(
                    "rebate per_kwh must be finite and >= 0".into(),
                ));
            }
            previous = tier.up_to_kwh;
        }
        if let Some(cap) = self.cap {
            if !cap.is_finite() || cap < 0.0 {
                return Err(EngineError::InvalidSettings(
                    "rebate cap must be finite and >= 0".into(),
                ));
            }
        }
        Ok(())
    }
}
