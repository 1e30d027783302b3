use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::sim::clock::SUPPORTED_STEPS_PER_DAY;

/// One metered consumption reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalReading {
    /// Start of the metering interval.
    pub timestamp: NaiveDateTime,
    /// Energy consumed during the interval (kWh).
    pub kwh: f64,
}

impl IntervalReading {
    pub fn new(timestamp: NaiveDateTime, kwh: f64) -> Self {
        Self { timestamp, kwh }
    }
}

/// Infers the resolution of a series of readings from their spacing.
///
/// A single reading is taken as hourly.
///
/// # Errors
///
/// Returns `InvalidUsage` if the series is empty or the first gap is not a
/// supported step length. Uneven spacing further along is caught when the
/// profile is built.
pub fn steps_per_day_of(readings: &[IntervalReading]) -> Result<usize> {
    match readings {
        [] => Err(EngineError::InvalidUsage("no interval readings".into())),
        [_] => Ok(24),
        [first, second, ..] => {
            let minutes = (second.timestamp - first.timestamp).num_minutes();
            SUPPORTED_STEPS_PER_DAY
                .iter()
                .copied()
                .find(|steps| minutes == (24 * 60 / *steps) as i64)
                .ok_or_else(|| {
                    EngineError::InvalidUsage(format!(
                        "interval spacing of {minutes} minutes is not supported"
                    ))
                })
        }
    }
}
