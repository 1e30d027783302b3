//! Household usage profiles: the time series every simulation runs over.

pub mod generator;
pub mod interval;
pub mod shape;

use chrono::{Datelike, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::sim::clock::SUPPORTED_STEPS_PER_DAY;

pub use generator::UsageProfileGenerator;
pub use interval::IntervalReading;
pub use shape::LoadShape;

/// Energy flows for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageDataPoint {
    /// Start of the step (local wall-clock time).
    pub timestamp: NaiveDateTime,
    /// Household consumption during the step (kWh).
    pub consumption_kwh: f64,
    /// Solar production during the step (kWh).
    pub solar_kwh: f64,
}

/// An ordered, evenly spaced series of [`UsageDataPoint`]s.
///
/// Construction validates the series once so the simulation loop never has
/// to: timestamps strictly increase by exactly one step and every energy
/// value is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageProfile {
    step_hours: f64,
    points: Vec<UsageDataPoint>,
}

impl UsageProfile {
    /// Builds a profile from points spaced `24 / steps_per_day` hours apart.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for an empty series, an unsupported resolution,
    /// irregular spacing, or negative/non-finite energy.
    pub fn new(steps_per_day: usize, points: Vec<UsageDataPoint>) -> Result<Self> {
        if !SUPPORTED_STEPS_PER_DAY.contains(&steps_per_day) {
            return Err(EngineError::InvalidUsage(format!(
                "steps_per_day must be one of {SUPPORTED_STEPS_PER_DAY:?}, got {steps_per_day}"
            )));
        }
        if points.is_empty() {
            return Err(EngineError::InvalidUsage("usage profile is empty".into()));
        }

        let step = TimeDelta::minutes((24 * 60 / steps_per_day) as i64);
        for (i, p) in points.iter().enumerate() {
            check_energy(i, "consumption", p.consumption_kwh)?;
            check_energy(i, "solar", p.solar_kwh)?;
            if i > 0 && p.timestamp - points[i - 1].timestamp != step {
                return Err(EngineError::InvalidUsage(format!(
                    "point {i} at {} is not one step after the previous point",
                    p.timestamp
                )));
            }
        }

        Ok(Self {
            step_hours: 24.0 / steps_per_day as f64,
            points,
        })
    }

    pub fn points(&self) -> &[UsageDataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Duration of one step in hours.
    pub fn step_hours(&self) -> f64 {
        self.step_hours
    }

    /// Calendar year of the first step.
    pub fn year(&self) -> i32 {
        self.points.first().map_or(0, |p| p.timestamp.year())
    }

    pub fn total_consumption_kwh(&self) -> f64 {
        self.points.iter().map(|p| p.consumption_kwh).sum()
    }

    pub fn total_solar_kwh(&self) -> f64 {
        self.points.iter().map(|p| p.solar_kwh).sum()
    }

    /// Replaces the solar column with `solar_kwh`, one value per step.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if the length differs from the profile or a
    /// value is negative or non-finite.
    pub fn with_solar(mut self, solar_kwh: &[f64]) -> Result<Self> {
        if solar_kwh.len() != self.points.len() {
            return Err(EngineError::InvalidUsage(format!(
                "solar series has {} steps, usage profile has {}",
                solar_kwh.len(),
                self.points.len()
            )));
        }
        for (i, (point, &solar)) in self.points.iter_mut().zip(solar_kwh).enumerate() {
            check_energy(i, "solar", solar)?;
            point.solar_kwh = solar;
        }
        Ok(self)
    }
}

fn check_energy(index: usize, what: &str, kwh: f64) -> Result<()> {
    if kwh.is_finite() && kwh >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidUsage(format!(
            "{what} at point {index} must be finite and >= 0, got {kwh}"
        )))
    }
}
