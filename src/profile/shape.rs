use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Seasonal and daily shaping applied when synthesizing a usage profile.
///
/// Weights are relative; only their ratios matter. The default describes a
/// household with electric heating and air conditioning: winter and summer
/// humps, a morning peak and a larger evening peak, and flatter weekends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadShape {
    /// Relative energy per day for each month, January first.
    pub monthly_weights: [f64; 12],
    /// Relative energy for each hour of a weekday.
    pub weekday_hourly: [f64; 24],
    /// Relative energy for each hour of a weekend day or holiday.
    pub weekend_hourly: [f64; 24],
    /// Energy of a weekend day relative to a weekday.
    pub weekend_day_weight: f64,
}

impl Default for LoadShape {
    fn default() -> Self {
        Self {
            monthly_weights: [
                1.25, 1.15, 1.00, 0.85, 0.80, 0.95, 1.15, 1.15, 0.90, 0.85, 1.00, 1.20,
            ],
            weekday_hourly: [
                0.55, 0.45, 0.42, 0.40, 0.40, 0.48, 0.75, 1.10, 1.15, 0.90, 0.80, 0.78, //
                0.80, 0.78, 0.78, 0.85, 1.05, 1.40, 1.65, 1.60, 1.45, 1.25, 0.95, 0.70,
            ],
            weekend_hourly: [
                0.60, 0.50, 0.45, 0.42, 0.42, 0.45, 0.55, 0.75, 1.00, 1.15, 1.15, 1.10, //
                1.05, 1.00, 0.98, 1.00, 1.15, 1.40, 1.55, 1.50, 1.35, 1.20, 0.95, 0.72,
            ],
            weekend_day_weight: 1.08,
        }
    }
}

impl LoadShape {
    /// Constant consumption: every month, day and hour weighs the same.
    pub fn flat() -> Self {
        Self {
            monthly_weights: [1.0; 12],
            weekday_hourly: [1.0; 24],
            weekend_hourly: [1.0; 24],
            weekend_day_weight: 1.0,
        }
    }

    /// Hour-of-day weights for the given day type.
    pub fn hourly(&self, is_weekend: bool) -> &[f64; 24] {
        if is_weekend {
            &self.weekend_hourly
        } else {
            &self.weekday_hourly
        }
    }

    /// Relative weight of a whole day.
    pub fn day_weight(&self, is_weekend: bool) -> f64 {
        if is_weekend {
            self.weekend_day_weight
        } else {
            1.0
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidUsage` if a weight is negative or non-finite, or a
    /// weight set sums to zero.
    pub fn validate(&self) -> Result<()> {
        check_weights("monthly_weights", &self.monthly_weights)?;
        check_weights("weekday_hourly", &self.weekday_hourly)?;
        check_weights("weekend_hourly", &self.weekend_hourly)?;
        check_weights("weekend_day_weight", &[self.weekend_day_weight])
    }
}

fn check_weights(name: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(EngineError::InvalidUsage(format!(
            "load shape {name} must be finite and >= 0"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(EngineError::InvalidUsage(format!(
            "load shape {name} must not sum to zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_flat_are_valid() {
        assert!(LoadShape::default().validate().is_ok());
        assert!(LoadShape::flat().validate().is_ok());
    }

    #[test]
    fn evening_peak_exceeds_night() {
        let shape = LoadShape::default();
        assert!(shape.weekday_hourly[18] > 3.0 * shape.weekday_hourly[3]);
        assert!(shape.weekday_hourly[8] > shape.weekday_hourly[3]);
    }

    #[test]
    fn rejects_zero_weights() {
        let mut shape = LoadShape::flat();
        shape.weekday_hourly = [0.0; 24];
        assert!(shape.validate().is_err());
    }

    #[test]
    fn rejects_negative_weight() {
        let mut shape = LoadShape::flat();
        shape.monthly_weights[3] = -1.0;
        assert!(shape.validate().is_err());
    }
}
