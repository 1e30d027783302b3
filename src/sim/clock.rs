use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{EngineError, Result};

/// Step resolutions the engine accepts (hourly, half-hourly, quarter-hourly).
pub const SUPPORTED_STEPS_PER_DAY: [usize; 3] = [24, 48, 96];

/// A simulation clock that walks every step of one calendar year.
///
/// Timestamps are naive local wall-clock times; there is no DST shift, so a
/// year always has `days × steps_per_day` steps (8760 or 8784 hourly).
///
/// # Examples
///
/// ```
/// use battery_roi::sim::clock::YearClock;
///
/// let clock = YearClock::new(2025, 24).unwrap();
/// assert_eq!(clock.total_steps(), 8760);
///
/// let last = clock.last().unwrap();
/// assert_eq!(last.to_string(), "2025-12-31 23:00:00");
/// ```
#[derive(Debug, Clone)]
pub struct YearClock {
    /// Current step of the simulation
    current: usize,
    /// Total steps in the year
    total: usize,
    start: NaiveDateTime,
    step: TimeDelta,
    steps_per_day: usize,
}

impl YearClock {
    /// Creates a clock for `year` at the given resolution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if the year is out of range or the resolution
    /// is not one of [`SUPPORTED_STEPS_PER_DAY`].
    pub fn new(year: i32, steps_per_day: usize) -> Result<Self> {
        if !SUPPORTED_STEPS_PER_DAY.contains(&steps_per_day) {
            return Err(EngineError::InvalidUsage(format!(
                "steps_per_day must be one of {SUPPORTED_STEPS_PER_DAY:?}, got {steps_per_day}"
            )));
        }
        let days = days_in_year(year)
            .ok_or_else(|| EngineError::InvalidUsage(format!("year {year} is out of range")))?;
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| EngineError::InvalidUsage(format!("year {year} is out of range")))?;

        Ok(Self {
            current: 0,
            total: days * steps_per_day,
            start,
            step: TimeDelta::minutes((24 * 60 / steps_per_day) as i64),
            steps_per_day,
        })
    }

    /// Total number of steps in the year.
    pub fn total_steps(&self) -> usize {
        self.total
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    /// Duration of one step in hours.
    pub fn step_hours(&self) -> f64 {
        24.0 / self.steps_per_day as f64
    }

    /// Timestamp of step `index` (not bounded by the year).
    pub fn timestamp_at(&self, index: usize) -> NaiveDateTime {
        self.start + self.step * index as i32
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some((index, timestamp))` - The step before advancing
    /// * `None` - If the year is exhausted
    pub fn tick(&mut self) -> Option<(usize, NaiveDateTime)> {
        if self.current < self.total {
            let index = self.current;
            self.current += 1;
            Some((index, self.timestamp_at(index)))
        } else {
            None
        }
    }
}

impl Iterator for YearClock {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        self.tick().map(|(_, timestamp)| timestamp)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for YearClock {}

/// Number of days in `year`, or `None` if chrono cannot represent it.
pub fn days_in_year(year: i32) -> Option<usize> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    usize::try_from((end - start).num_days()).ok()
}
