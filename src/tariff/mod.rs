//! Utility rate plans: period rules, price lookup and built-in presets.

pub mod plan;
pub mod presets;

pub use plan::{DayType, ExportCredit, HourRange, PeriodRule, RatePeriod, RatePlan};
