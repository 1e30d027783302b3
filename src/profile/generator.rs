use chrono::{Datelike, NaiveDate, Timelike};

use crate::error::{EngineError, Result};
use crate::profile::interval::{IntervalReading, steps_per_day_of};
use crate::profile::shape::LoadShape;
use crate::profile::{UsageDataPoint, UsageProfile};
use crate::sim::clock::YearClock;
use crate::tariff::RatePlan;

/// Synthesizes household consumption profiles from coarse usage figures.
///
/// `UsageProfileGenerator` turns an annual (or monthly) kWh figure into a
/// step-by-step consumption series. Energy is spread across months by the
/// seasonal curve, across days by the weekday/weekend weight, and across the
/// hours of each day by the daily load shape. There is no randomness: the
/// same inputs always give the same profile.
///
/// The rate plan is consulted for two things only: which dates bill as
/// weekends (holidays included), and a fail-fast check that every generated
/// timestamp resolves to a pricing period.
///
/// # Examples
///
/// ```
/// use battery_roi::profile::UsageProfileGenerator;
/// use battery_roi::tariff::presets;
///
/// let generator = UsageProfileGenerator::default();
/// let profile = generator
///     .generate(12_000.0, &presets::ultra_low_overnight(), 2025, true)
///     .unwrap();
/// assert_eq!(profile.len(), 8760);
/// assert!((profile.total_consumption_kwh() - 12_000.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UsageProfileGenerator {
    shape: LoadShape,
    steps_per_day: Option<usize>,
}

impl UsageProfileGenerator {
    /// Creates a generator with a custom load shape at hourly resolution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if the shape has negative or all-zero weights.
    pub fn new(shape: LoadShape) -> Result<Self> {
        shape.validate()?;
        Ok(Self {
            shape,
            steps_per_day: None,
        })
    }

    /// Sets the output resolution (24, 48 or 96 steps per day).
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for any other resolution.
    pub fn with_steps_per_day(mut self, steps_per_day: usize) -> Result<Self> {
        // Check the resolution against a known-good year.
        YearClock::new(2000, steps_per_day)?;
        self.steps_per_day = Some(steps_per_day);
        Ok(self)
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day.unwrap_or(24)
    }

    /// Generates a profile from an annual consumption figure.
    ///
    /// # Arguments
    ///
    /// * `annual_kwh` - Total consumption for the year, must be > 0
    /// * `plan` - Rate plan the profile will be billed under
    /// * `year` - Calendar year to cover (8760 or 8784 hourly steps)
    /// * `seasonal` - Apply the seasonal month curve; otherwise every month
    ///   has the same energy per day
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if `annual_kwh` is not a positive finite
    /// number, and `UnresolvedPeriod` if the plan leaves a step unpriced.
    pub fn generate(
        &self,
        annual_kwh: f64,
        plan: &RatePlan,
        year: i32,
        seasonal: bool,
    ) -> Result<UsageProfile> {
        if !annual_kwh.is_finite() || annual_kwh <= 0.0 {
            return Err(EngineError::InvalidUsage(format!(
                "annual usage must be > 0 kWh, got {annual_kwh}"
            )));
        }

        let days = days_per_month(year)?;
        let weights: [f64; 12] = if seasonal {
            self.shape.monthly_weights
        } else {
            [1.0; 12]
        };
        let weighted_days: Vec<f64> = weights.iter().zip(days).map(|(w, d)| w * d as f64).collect();
        let total: f64 = weighted_days.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::InvalidUsage(
                "seasonal weights leave no energy to distribute".into(),
            ));
        }

        let mut monthly_kwh = [0.0; 12];
        for (month, wd) in monthly_kwh.iter_mut().zip(&weighted_days) {
            *month = annual_kwh * wd / total;
        }
        self.build(&monthly_kwh, plan, year)
    }

    /// Generates a profile from twelve monthly consumption figures.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if a figure is negative or non-finite or they
    /// sum to zero, and `UnresolvedPeriod` if the plan leaves a step unpriced.
    pub fn from_monthly(
        &self,
        monthly_kwh: &[f64; 12],
        plan: &RatePlan,
        year: i32,
    ) -> Result<UsageProfile> {
        if monthly_kwh.iter().any(|kwh| !kwh.is_finite() || *kwh < 0.0) {
            return Err(EngineError::InvalidUsage(
                "monthly usage must be finite and >= 0".into(),
            ));
        }
        if monthly_kwh.iter().sum::<f64>() <= 0.0 {
            return Err(EngineError::InvalidUsage(
                "monthly usage must not sum to zero".into(),
            ));
        }
        self.build(monthly_kwh, plan, year)
    }

    /// Generates a profile from a typical monthly bill.
    ///
    /// Annual usage is `bill × 12 / blended_rate`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if the bill or rate is not positive, plus any
    /// error from [`UsageProfileGenerator::generate`].
    pub fn from_monthly_bill(
        &self,
        monthly_bill: f64,
        blended_rate: f64,
        plan: &RatePlan,
        year: i32,
        seasonal: bool,
    ) -> Result<UsageProfile> {
        let annual_kwh = annual_kwh_from_bill(monthly_bill, blended_rate)?;
        self.generate(annual_kwh, plan, year, seasonal)
    }

    /// Builds a profile from measured interval readings.
    ///
    /// The resolution is inferred from the reading spacing; the load shape
    /// is not used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for empty, unordered, unevenly spaced or
    /// negative readings, and `UnresolvedPeriod` if the plan leaves a
    /// reading unpriced.
    pub fn from_intervals(
        &self,
        readings: &[IntervalReading],
        plan: &RatePlan,
    ) -> Result<UsageProfile> {
        let steps_per_day = steps_per_day_of(readings)?;
        let points = readings
            .iter()
            .map(|r| {
                plan.period_at(r.timestamp)?;
                Ok(UsageDataPoint {
                    timestamp: r.timestamp,
                    consumption_kwh: r.kwh,
                    solar_kwh: 0.0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        UsageProfile::new(steps_per_day, points)
    }

    fn build(&self, monthly_kwh: &[f64; 12], plan: &RatePlan, year: i32) -> Result<UsageProfile> {
        let clock = YearClock::new(year, self.steps_per_day())?;
        let steps_per_hour = (self.steps_per_day() / 24) as f64;

        let mut day_weight_per_month = [0.0_f64; 12];
        for date in year_dates(year)? {
            day_weight_per_month[date.month0() as usize] +=
                self.shape.day_weight(plan.is_weekend(date));
        }
        let weekday_sum: f64 = self.shape.hourly(false).iter().sum();
        let weekend_sum: f64 = self.shape.hourly(true).iter().sum();

        let mut points = Vec::with_capacity(clock.total_steps());
        for timestamp in clock {
            plan.period_at(timestamp)?;

            let is_weekend = plan.is_weekend(timestamp.date());
            let month = timestamp.month0() as usize;
            let month_weight = day_weight_per_month[month];
            let day_kwh = if month_weight > 0.0 {
                monthly_kwh[month] * self.shape.day_weight(is_weekend) / month_weight
            } else {
                0.0
            };
            let hour_sum = if is_weekend { weekend_sum } else { weekday_sum };
            let hour_weight = self.shape.hourly(is_weekend)[timestamp.hour() as usize];

            points.push(UsageDataPoint {
                timestamp,
                consumption_kwh: day_kwh * hour_weight / hour_sum / steps_per_hour,
                solar_kwh: 0.0,
            });
        }
        UsageProfile::new(self.steps_per_day(), points)
    }
}

/// Converts a monthly bill into annual kWh at a blended rate.
///
/// # Errors
///
/// Returns `InvalidUsage` if either input is not a positive finite number.
pub fn annual_kwh_from_bill(monthly_bill: f64, blended_rate: f64) -> Result<f64> {
    if !monthly_bill.is_finite() || monthly_bill <= 0.0 {
        return Err(EngineError::InvalidUsage(format!(
            "monthly bill must be > 0, got {monthly_bill}"
        )));
    }
    if !blended_rate.is_finite() || blended_rate <= 0.0 {
        return Err(EngineError::InvalidUsage(format!(
            "blended rate must be > 0 $/kWh, got {blended_rate}"
        )));
    }
    Ok(monthly_bill * 12.0 / blended_rate)
}

fn year_dates(year: i32) -> Result<impl Iterator<Item = NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| EngineError::InvalidUsage(format!("year {year} is out of range")))?;
    Ok(first.iter_days().take_while(move |d| d.year() == year))
}

fn days_per_month(year: i32) -> Result<[u32; 12]> {
    let mut days = [0; 12];
    for date in year_dates(year)? {
        days[date.month0() as usize] += 1;
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDateTime;

    use super::*;
    use crate::tariff::presets;

    fn at(m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn energy_between(profile: &UsageProfile, from: NaiveDateTime, to: NaiveDateTime) -> f64 {
        profile
            .points()
            .iter()
            .filter(|p| p.timestamp >= from && p.timestamp < to)
            .map(|p| p.consumption_kwh)
            .sum()
    }

    #[test]
    fn annual_total_is_preserved() {
        let generator = UsageProfileGenerator::default();
        let plan = presets::time_of_use();
        for (year, steps) in [(2025, 8760), (2024, 8784)] {
            let profile = generator.generate(9_500.0, &plan, year, true).unwrap();
            assert_eq!(profile.len(), steps);
            assert_relative_eq!(profile.total_consumption_kwh(), 9_500.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn rejects_non_positive_usage() {
        let generator = UsageProfileGenerator::default();
        let plan = presets::flat(0.1);
        assert!(matches!(
            generator.generate(0.0, &plan, 2025, true),
            Err(EngineError::InvalidUsage(_))
        ));
        assert!(generator.generate(-5.0, &plan, 2025, true).is_err());
        assert!(generator.generate(f64::NAN, &plan, 2025, true).is_err());
    }

    #[test]
    fn is_deterministic() {
        let generator = UsageProfileGenerator::default();
        let plan = presets::ultra_low_overnight();
        let a = generator.generate(12_000.0, &plan, 2025, true).unwrap();
        let b = generator.generate(12_000.0, &plan, 2025, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seasonal_curve_shifts_energy_to_winter() {
        let generator = UsageProfileGenerator::default();
        let plan = presets::flat(0.1);
        let seasonal = generator.generate(12_000.0, &plan, 2025, true).unwrap();
        let flat = generator.generate(12_000.0, &plan, 2025, false).unwrap();

        let jan = energy_between(&seasonal, at(1, 1, 0), at(2, 1, 0));
        let may = energy_between(&seasonal, at(5, 1, 0), at(6, 1, 0));
        assert!(jan > may * 1.4);

        let jan_flat = energy_between(&flat, at(1, 1, 0), at(2, 1, 0));
        let may_flat = energy_between(&flat, at(5, 1, 0), at(6, 1, 0));
        assert_relative_eq!(jan_flat, may_flat, epsilon = 1e-6);
    }

    #[test]
    fn flat_shape_gives_constant_consumption() {
        let generator = UsageProfileGenerator::new(LoadShape::flat()).unwrap();
        let profile = generator
            .generate(8_760.0, &presets::flat(0.1), 2025, false)
            .unwrap();
        for p in profile.points() {
            assert_relative_eq!(p.consumption_kwh, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn evening_exceeds_night_on_weekdays() {
        let generator = UsageProfileGenerator::default();
        let profile = generator
            .generate(12_000.0, &presets::flat(0.1), 2025, true)
            .unwrap();
        // 2025-03-05 is a Wednesday.
        let night = energy_between(&profile, at(3, 5, 3), at(3, 5, 4));
        let evening = energy_between(&profile, at(3, 5, 18), at(3, 5, 19));
        assert!(evening > 3.0 * night);
    }

    #[test]
    fn sub_hourly_steps_split_the_hour() {
        let hourly = UsageProfileGenerator::default();
        let quarter = UsageProfileGenerator::default().with_steps_per_day(96).unwrap();
        let plan = presets::time_of_use();
        let a = hourly.generate(10_000.0, &plan, 2025, true).unwrap();
        let b = quarter.generate(10_000.0, &plan, 2025, true).unwrap();
        assert_eq!(b.len(), 4 * a.len());
        assert_relative_eq!(b.step_hours(), 0.25);
        for i in 0..4 {
            assert_relative_eq!(
                b.points()[40 + i].consumption_kwh * 4.0,
                a.points()[10].consumption_kwh,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn rejects_unsupported_resolution() {
        assert!(UsageProfileGenerator::default().with_steps_per_day(12).is_err());
    }

    #[test]
    fn unresolved_plan_fails_fast() {
        let mut plan = presets::ultra_low_overnight();
        plan.periods.retain(|p| p.label != "weekend_off_peak");
        let err = UsageProfileGenerator::default()
            .generate(12_000.0, &plan, 2025, true)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedPeriod { .. }));
    }

    #[test]
    fn monthly_figures_are_honoured() {
        let mut monthly = [800.0; 12];
        monthly[0] = 1_500.0;
        let profile = UsageProfileGenerator::default()
            .from_monthly(&monthly, &presets::flat(0.1), 2025)
            .unwrap();
        assert_relative_eq!(
            energy_between(&profile, at(1, 1, 0), at(2, 1, 0)),
            1_500.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(profile.total_consumption_kwh(), 10_300.0, epsilon = 1e-6);
        assert!(
            UsageProfileGenerator::default()
                .from_monthly(&[0.0; 12], &presets::flat(0.1), 2025)
                .is_err()
        );
    }

    #[test]
    fn bill_conversion() {
        assert_relative_eq!(annual_kwh_from_bill(150.0, 0.15).unwrap(), 12_000.0, epsilon = 1e-9);
        assert!(annual_kwh_from_bill(150.0, 0.0).is_err());
        assert!(annual_kwh_from_bill(0.0, 0.15).is_err());
        let profile = UsageProfileGenerator::default()
            .from_monthly_bill(150.0, 0.15, &presets::time_of_use(), 2025, true);
        assert!(profile.is_ok());
    }

    #[test]
    fn weekends_follow_plan_holidays() {
        let mut plan = presets::flat(0.1);
        let generator = UsageProfileGenerator::default();
        let before = generator.generate(12_000.0, &plan, 2025, true).unwrap();
        // 2025-07-01 is a Tuesday.
        plan.holidays.push(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        let after = generator.generate(12_000.0, &plan, 2025, true).unwrap();
        let day = |p: &UsageProfile| energy_between(p, at(7, 1, 0), at(7, 2, 0));
        assert!(day(&after) > day(&before));
        assert_relative_eq!(after.total_consumption_kwh(), 12_000.0, epsilon = 1e-6);
    }
}
