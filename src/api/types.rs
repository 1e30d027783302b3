//! API response and query types.
//!
//! Dispatch records share their field names with the dispatch CSV export.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::compare::BatteryComparison;
use crate::io::export::TIMESTAMP_FORMAT;
use crate::sim::kpi::DispatchSummary;
use crate::sim::types::DispatchStep;

/// Every comparison from the current run.
#[derive(Debug, Serialize)]
pub struct ComparisonsResponse {
    pub plans: Vec<String>,
    pub comparisons: Vec<BatteryComparison>,
}

/// One dispatch step using the CSV export's field names, plus the step's
/// total grid import.
#[derive(Debug, Serialize)]
pub struct DispatchRecord {
    /// Step start as `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
    pub period: String,
    pub price: f64,
    pub export_rate: f64,
    pub consumption_kwh: f64,
    pub solar_kwh: f64,
    pub solar_to_load: f64,
    pub solar_to_battery: f64,
    pub solar_exported: f64,
    pub battery_to_load: f64,
    pub grid_to_load: f64,
    pub grid_to_battery: f64,
    /// `grid_to_load + grid_to_battery`.
    pub grid_import_kwh: f64,
    pub soc_kwh: f64,
    pub cost: f64,
}

impl From<&DispatchStep> for DispatchRecord {
    fn from(s: &DispatchStep) -> Self {
        Self {
            timestamp: s.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            period: s.period.clone(),
            price: s.price,
            export_rate: s.export_rate,
            consumption_kwh: s.consumption_kwh,
            solar_kwh: s.solar_kwh,
            solar_to_load: s.solar_to_load,
            solar_to_battery: s.solar_to_battery,
            solar_exported: s.solar_exported,
            battery_to_load: s.battery_to_load,
            grid_to_load: s.grid_to_load,
            grid_to_battery: s.grid_to_battery,
            grid_import_kwh: s.grid_import_kwh(),
            soc_kwh: s.soc_kwh,
            cost: s.cost,
        }
    }
}

/// Dispatch of one battery under one plan, optionally windowed.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub battery_id: String,
    pub plan_id: String,
    /// Whole-year summary, independent of the window.
    pub summary: DispatchSummary,
    pub steps: Vec<DispatchRecord>,
}

/// Query parameters for the dispatch endpoint.
#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    /// Rate plan id; the first plan when absent.
    pub plan: Option<String>,
    /// Window start, inclusive (`YYYY-MM-DDTHH:MM:SS`).
    pub from: Option<NaiveDateTime>,
    /// Window end, exclusive.
    pub to: Option<NaiveDateTime>,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Individual validation failures, when there are several.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn dispatch_record_from_step_maps_fields() {
        let step = DispatchStep {
            timestamp: NaiveDate::from_ymd_opt(2025, 7, 4)
                .and_then(|d| d.and_hms_opt(17, 30, 0))
                .unwrap(),
            period: "on_peak".into(),
            price: 0.391,
            export_rate: 0.391,
            consumption_kwh: 2.0,
            solar_kwh: 0.5,
            solar_to_load: 0.5,
            solar_to_battery: 0.0,
            solar_exported: 0.0,
            battery_to_load: 1.2,
            grid_to_load: 0.3,
            grid_to_battery: 0.0,
            soc_kwh: 3.3,
            cost: 0.1173,
        };
        let record = DispatchRecord::from(&step);
        assert_eq!(record.timestamp, "2025-07-04 17:30");
        assert_eq!(record.period, "on_peak");
        assert_eq!(record.battery_to_load, 1.2);
        assert_eq!(record.grid_import_kwh, 0.3);
        assert_eq!(record.soc_kwh, 3.3);
    }

    #[test]
    fn error_details_omitted_when_empty() {
        let json = serde_json::to_value(ErrorResponse::new("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "nope" }));
    }
}
