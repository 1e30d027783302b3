use chrono::{Datelike, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::devices::types::{daylight_frac, gaussian_noise};
use crate::error::{EngineError, Result};
use crate::sim::clock::YearClock;

/// Share of annual solar production per month, January first.
const MONTHLY_SOLAR_WEIGHTS: [f64; 12] = [
    0.045, 0.060, 0.085, 0.095, 0.110, 0.115, 0.120, 0.110, 0.090, 0.070, 0.050, 0.040,
];

/// Solar noon in local clock time.
const SOLAR_NOON: f64 = 12.5;
/// Mean day length in hours.
const MEAN_DAY_HOURS: f64 = 12.0;
/// Half the swing between the longest and shortest day, in hours.
const DAY_LENGTH_SWING: f64 = 3.2;

/// Minimum cloud multiplier (heavy overcast).
const MULTIPLIER_MIN: f64 = 0.2;
/// Maximum cloud multiplier (enhanced irradiance from cloud edges).
const MULTIPLIER_MAX: f64 = 1.2;

/// Step-to-step variability applied to clear-sky production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloudModel {
    /// Smooth clear-sky shape, fully deterministic.
    #[default]
    Clear,
    /// Temporally correlated cloud fronts.
    ///
    /// The multiplier evolves as
    /// ```text
    /// m(t) = alpha * m(t-1) + (1 - alpha) * (1 + epsilon(t))
    /// ```
    /// and is clamped to \[0.2, 1.2\].
    Ar1 { alpha: f64, noise_std: f64 },
}

/// Synthetic solar production for one calendar year.
///
/// Spreads an annual kWh figure across months with a fixed northern-latitude
/// curve, and across each day with a half-sine between sunrise and sunset
/// whose length follows the season. Each month is rescaled afterwards, so the
/// monthly totals (and therefore the annual total) are exact even with cloud
/// noise switched on.
///
/// # Examples
///
/// ```
/// use battery_roi::devices::solar::SolarProductionModel;
///
/// let model = SolarProductionModel::from_system(8.0, 1150.0).unwrap();
/// let series = model.generate(2025, 24).unwrap();
/// let total: f64 = series.iter().sum();
/// assert!((total - 9200.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SolarProductionModel {
    annual_kwh: f64,
    cloud: CloudModel,
    seed: u64,
}

impl SolarProductionModel {
    /// Creates a model producing `annual_kwh` over the year.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if `annual_kwh` is negative or non-finite.
    pub fn new(annual_kwh: f64) -> Result<Self> {
        if !annual_kwh.is_finite() || annual_kwh < 0.0 {
            return Err(EngineError::InvalidUsage(format!(
                "annual solar production must be finite and >= 0, got {annual_kwh}"
            )));
        }
        Ok(Self {
            annual_kwh,
            cloud: CloudModel::Clear,
            seed: 0,
        })
    }

    /// Creates a model from a system size and a specific yield.
    ///
    /// # Arguments
    ///
    /// * `system_kw` - DC nameplate capacity in kW
    /// * `specific_yield` - Annual kWh produced per installed kW
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if either input is negative or non-finite.
    pub fn from_system(system_kw: f64, specific_yield: f64) -> Result<Self> {
        if !system_kw.is_finite() || system_kw < 0.0 {
            return Err(EngineError::InvalidUsage(format!(
                "solar system size must be finite and >= 0, got {system_kw}"
            )));
        }
        Self::new(system_kw * specific_yield)
    }

    /// Adds cloud variability driven by a seeded generator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if `alpha` is outside `[0, 1]` or the noise
    /// standard deviation is negative.
    pub fn with_cloud(mut self, cloud: CloudModel, seed: u64) -> Result<Self> {
        if let CloudModel::Ar1 { alpha, noise_std } = cloud {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(EngineError::InvalidUsage(format!(
                    "cloud alpha must be within [0, 1], got {alpha}"
                )));
            }
            if !noise_std.is_finite() || noise_std < 0.0 {
                return Err(EngineError::InvalidUsage(format!(
                    "cloud noise_std must be finite and >= 0, got {noise_std}"
                )));
            }
        }
        self.cloud = cloud;
        self.seed = seed;
        Ok(self)
    }

    pub fn annual_kwh(&self) -> f64 {
        self.annual_kwh
    }

    /// Generates one kWh value per step of `year`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for an unsupported resolution or year.
    pub fn generate(&self, year: i32, steps_per_day: usize) -> Result<Vec<f64>> {
        let clock = YearClock::new(year, steps_per_day)?;
        let step_hours = clock.step_hours();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut multiplier = 1.0;

        let mut month_of_step = Vec::with_capacity(clock.total_steps());
        let mut series = Vec::with_capacity(clock.total_steps());
        let mut month_raw = [0.0_f64; 12];

        for timestamp in clock {
            // The cloud state advances every step to keep its correlation
            // structure independent of daylight.
            if let CloudModel::Ar1 { alpha, noise_std } = self.cloud {
                let epsilon = gaussian_noise(&mut rng, noise_std);
                multiplier = alpha * multiplier + (1.0 - alpha) * (1.0 + epsilon);
                multiplier = multiplier.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
            }

            let (sunrise, sunset) = daylight_window(timestamp.ordinal());
            let hour = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;
            let raw = daylight_frac(hour + step_hours / 2.0, sunrise, sunset) * multiplier;

            let month = timestamp.month0() as usize;
            month_raw[month] += raw;
            month_of_step.push(month);
            series.push(raw);
        }

        let weight_total: f64 = MONTHLY_SOLAR_WEIGHTS.iter().sum();
        let scale: Vec<f64> = month_raw
            .iter()
            .zip(MONTHLY_SOLAR_WEIGHTS)
            .map(|(&raw, w)| {
                if raw > 0.0 {
                    self.annual_kwh * w / weight_total / raw
                } else {
                    0.0
                }
            })
            .collect();

        for (value, month) in series.iter_mut().zip(month_of_step) {
            *value *= scale[month];
        }
        Ok(series)
    }
}

/// Sunrise and sunset hours for a day of the year.
fn daylight_window(day_of_year: u32) -> (f64, f64) {
    let angle = 2.0 * std::f64::consts::PI * (day_of_year as f64 - 80.0) / 365.0;
    let length = MEAN_DAY_HOURS + DAY_LENGTH_SWING * angle.sin();
    (SOLAR_NOON - length / 2.0, SOLAR_NOON + length / 2.0)
}
