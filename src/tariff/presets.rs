//! Built-in rate plans modelled on Ontario residential pricing.

use super::plan::{DayType, ExportCredit, HourRange, PeriodRule, RatePeriod, RatePlan};

/// Winter season months for the standard TOU plan.
const WINTER: [u32; 6] = [11, 12, 1, 2, 3, 4];
/// Summer season months for the standard TOU plan.
const SUMMER: [u32; 6] = [5, 6, 7, 8, 9, 10];

/// Names accepted by [`by_name`].
pub const PRESET_NAMES: &[&str] = &["ulo", "tou", "flat"];

/// Ultra-Low-Overnight: very cheap 23:00–07:00 every day and an expensive
/// weekday evening peak.
pub fn ultra_low_overnight() -> RatePlan {
    RatePlan {
        id: "ulo".into(),
        name: "Ultra-Low Overnight".into(),
        periods: vec![
            RatePeriod::new(
                "ultra_low_overnight",
                0.039,
                vec![PeriodRule {
                    hours: vec![HourRange::new(23, 7)],
                    ..PeriodRule::default()
                }],
            ),
            RatePeriod::new(
                "on_peak",
                0.391,
                vec![PeriodRule {
                    days: DayType::Weekdays,
                    hours: vec![HourRange::new(16, 21)],
                    ..PeriodRule::default()
                }],
            ),
            RatePeriod::new(
                "mid_peak",
                0.157,
                vec![PeriodRule {
                    days: DayType::Weekdays,
                    hours: vec![HourRange::new(7, 16), HourRange::new(21, 23)],
                    ..PeriodRule::default()
                }],
            ),
            RatePeriod::new(
                "weekend_off_peak",
                0.098,
                vec![PeriodRule {
                    days: DayType::Weekends,
                    hours: vec![HourRange::new(7, 23)],
                    ..PeriodRule::default()
                }],
            ),
        ],
        export_credit: ExportCredit::Retail,
        holidays: Vec::new(),
    }
}

/// Standard seasonal time-of-use: off-peak nights and weekends, with the
/// on-peak window moving between winter mornings/evenings and summer
/// afternoons.
pub fn time_of_use() -> RatePlan {
    let weekday = |months: &[u32], hours: Vec<HourRange>| PeriodRule {
        months: months.to_vec(),
        days: DayType::Weekdays,
        hours,
    };

    RatePlan {
        id: "tou".into(),
        name: "Time-of-Use".into(),
        periods: vec![
            RatePeriod::new(
                "off_peak",
                0.098,
                vec![
                    PeriodRule {
                        days: DayType::Weekends,
                        ..PeriodRule::default()
                    },
                    PeriodRule {
                        hours: vec![HourRange::new(19, 7)],
                        ..PeriodRule::default()
                    },
                ],
            ),
            RatePeriod::new(
                "on_peak",
                0.203,
                vec![
                    weekday(&WINTER, vec![HourRange::new(7, 11), HourRange::new(17, 19)]),
                    weekday(&SUMMER, vec![HourRange::new(11, 17)]),
                ],
            ),
            RatePeriod::new(
                "mid_peak",
                0.157,
                vec![
                    weekday(&WINTER, vec![HourRange::new(11, 17)]),
                    weekday(&SUMMER, vec![HourRange::new(7, 11), HourRange::new(17, 19)]),
                ],
            ),
        ],
        export_credit: ExportCredit::Retail,
        holidays: Vec::new(),
    }
}

/// Single all-hours price.
pub fn flat(price_per_kwh: f64) -> RatePlan {
    RatePlan {
        id: "flat".into(),
        name: "Flat rate".into(),
        periods: vec![RatePeriod::new(
            "flat",
            price_per_kwh,
            vec![PeriodRule::always()],
        )],
        export_credit: ExportCredit::Retail,
        holidays: Vec::new(),
    }
}

/// Looks up a built-in plan by name.
pub fn by_name(name: &str) -> Option<RatePlan> {
    match name {
        "ulo" => Some(ultra_low_overnight()),
        "tou" => Some(time_of_use()),
        "flat" => Some(flat(0.120)),
        _ => None,
    }
}
