//! Declarative utility rate plans.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::sim::clock::YearClock;

/// Tolerance used when comparing prices for the cheapest period.
const PRICE_EPSILON: f64 = 1e-9;

/// Which days of the week a rule applies to. Plan holidays count as weekends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    #[default]
    All,
    Weekdays,
    Weekends,
}

/// Half-open hour-of-day range `[start, end)`.
///
/// A range with `start > end` wraps midnight, so `23..7` covers
/// 23:00 through 06:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourRange {
    pub start: u32,
    pub end: u32,
}

impl HourRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether `hour` (0–23) falls inside the range.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start < self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }

    fn is_valid(&self) -> bool {
        self.start <= 23 && self.end <= 24 && self.start != self.end
    }
}

/// One applicability rule. Empty `months` or `hours` means "every".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeriodRule {
    /// Calendar months (1–12).
    pub months: Vec<u32>,
    pub days: DayType,
    pub hours: Vec<HourRange>,
}

impl PeriodRule {
    /// A rule matching every step of the year.
    pub fn always() -> Self {
        Self::default()
    }

    pub fn matches(&self, timestamp: NaiveDateTime, is_weekend: bool) -> bool {
        let month_ok = self.months.is_empty() || self.months.contains(&timestamp.month());
        let day_ok = match self.days {
            DayType::All => true,
            DayType::Weekdays => !is_weekend,
            DayType::Weekends => is_weekend,
        };
        let hour = timestamp.hour();
        let hour_ok = self.hours.is_empty() || self.hours.iter().any(|r| r.contains(hour));
        month_ok && day_ok && hour_ok
    }
}

/// A named pricing period. It applies when any of its rules match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatePeriod {
    pub label: String,
    pub price_per_kwh: f64,
    pub rules: Vec<PeriodRule>,
}

impl RatePeriod {
    pub fn new(label: &str, price_per_kwh: f64, rules: Vec<PeriodRule>) -> Self {
        Self {
            label: label.to_owned(),
            price_per_kwh,
            rules,
        }
    }

    pub fn applies_at(&self, timestamp: NaiveDateTime, is_weekend: bool) -> bool {
        self.rules.iter().any(|r| r.matches(timestamp, is_weekend))
    }
}

/// How exported solar energy is credited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportCredit {
    /// Net metering: credited at the retail price of the step.
    #[default]
    Retail,
    /// Flat $/kWh credit.
    Fixed { rate: f64 },
    /// Exports earn nothing.
    None,
}

/// A utility rate structure evaluated as an ordered list of periods.
///
/// The first period whose rules match a timestamp wins. A plan must cover
/// every step of the year; [`RatePlan::validate`] walks the whole year to
/// prove it before any simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatePlan {
    pub id: String,
    pub name: String,
    pub periods: Vec<RatePeriod>,
    #[serde(default)]
    pub export_credit: ExportCredit,
    /// Dates billed as weekend days.
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl RatePlan {
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&date)
    }

    /// Resolves the period in force at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedPeriod` if no period matches.
    pub fn period_at(&self, timestamp: NaiveDateTime) -> Result<&RatePeriod> {
        let is_weekend = self.is_weekend(timestamp.date());
        self.periods
            .iter()
            .find(|p| p.applies_at(timestamp, is_weekend))
            .ok_or_else(|| EngineError::UnresolvedPeriod {
                plan: self.id.clone(),
                timestamp,
            })
    }

    /// Retail $/kWh at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedPeriod` if no period matches.
    pub fn price_for(&self, timestamp: NaiveDateTime) -> Result<f64> {
        self.period_at(timestamp).map(|p| p.price_per_kwh)
    }

    /// Export credit $/kWh given the retail price of the same step.
    pub fn export_rate(&self, retail_price: f64) -> f64 {
        match self.export_credit {
            ExportCredit::Retail => retail_price,
            ExportCredit::Fixed { rate } => rate,
            ExportCredit::None => 0.0,
        }
    }

    /// Lowest period price in the plan (0 for an empty plan).
    pub fn cheapest_price(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| p.price_per_kwh)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Highest period price in the plan (0 for an empty plan).
    pub fn peak_price(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| p.price_per_kwh)
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Whether `price` is the plan's cheapest tier.
    pub fn is_cheap_price(&self, price: f64) -> bool {
        price <= self.cheapest_price() + PRICE_EPSILON
    }

    /// Checks the plan's structure and that every hour of `year` resolves.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRatePlan` for malformed periods and `UnresolvedPeriod`
    /// for the first uncovered hour.
    pub fn validate(&self, year: i32) -> Result<()> {
        let invalid = |reason: String| EngineError::InvalidRatePlan {
            plan: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".into()));
        }
        if self.periods.is_empty() {
            return Err(invalid("at least one period is required".into()));
        }
        for period in &self.periods {
            if period.label.trim().is_empty() {
                return Err(invalid("period label must not be empty".into()));
            }
            if !period.price_per_kwh.is_finite() || period.price_per_kwh < 0.0 {
                return Err(invalid(format!(
                    "period \"{}\" price must be finite and >= 0",
                    period.label
                )));
            }
            if period.rules.is_empty() {
                return Err(invalid(format!(
                    "period \"{}\" needs at least one rule",
                    period.label
                )));
            }
            for rule in &period.rules {
                if let Some(m) = rule.months.iter().find(|m| !(1..=12).contains(*m)) {
                    return Err(invalid(format!(
                        "period \"{}\" has invalid month {m}",
                        period.label
                    )));
                }
                if let Some(r) = rule.hours.iter().find(|r| !r.is_valid()) {
                    return Err(invalid(format!(
                        "period \"{}\" has invalid hour range {}..{}",
                        period.label, r.start, r.end
                    )));
                }
            }
        }
        if let ExportCredit::Fixed { rate } = self.export_credit {
            if !rate.is_finite() || rate < 0.0 {
                return Err(invalid("fixed export rate must be finite and >= 0".into()));
            }
        }

        // Hourly resolution is enough: rules only look at the hour component.
        for timestamp in YearClock::new(year, 24)? {
            self.period_at(timestamp)?;
        }
        Ok(())
    }
}
