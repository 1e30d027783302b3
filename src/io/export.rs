//! CSV export for dispatch steps and comparison summaries.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::compare::BatteryComparison;
use crate::error::Result;
use crate::finance::fmt_or_na;
use crate::sim::types::DispatchStep;

/// Column header for per-step dispatch export.
const DISPATCH_HEADER: &str = "timestamp,period,price,export_rate,consumption_kwh,solar_kwh,\
                               solar_to_load,solar_to_battery,solar_exported,battery_to_load,\
                               grid_to_load,grid_to_battery,soc_kwh,cost";

/// Column header for the comparison summary export.
const SUMMARY_HEADER: &str = "battery_id,brand,model,rate_plan,usable_kwh,price,rebate,net_cost,\
                              original_annual_cost,solar_only_annual_cost,optimized_annual_cost,\
                              total_savings,storage_savings,annual_savings,cycles_per_year,\
                              total_kwh_shifted,payback_years,annual_roi,\
                              savings_per_dollar_invested,net_profit,recommendation";

/// Timestamp layout used in every export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Exports dispatch steps to a CSV file at the given path.
///
/// Writes a header row followed by one row per step. Output is deterministic
/// for identical inputs.
///
/// # Arguments
///
/// * `steps` - Dispatch steps, usually `DispatchRun::steps` or a window of it
/// * `path` - Output file path
///
/// # Errors
///
/// Returns `Io` if the file cannot be created, `Csv` if writing fails.
pub fn export_dispatch_csv<'a>(
    steps: impl IntoIterator<Item = &'a DispatchStep>,
    path: &Path,
) -> Result<()> {
    let file = File::create(path)?;
    write_dispatch_csv(steps, io::BufWriter::new(file))
}

/// Writes dispatch steps as CSV to any writer.
///
/// # Errors
///
/// Returns `Csv` if writing fails.
pub fn write_dispatch_csv<'a>(
    steps: impl IntoIterator<Item = &'a DispatchStep>,
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(DISPATCH_HEADER.split(',').map(str::trim))?;

    for s in steps {
        wtr.write_record(&[
            s.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            s.period.clone(),
            format!("{:.4}", s.price),
            format!("{:.4}", s.export_rate),
            format!("{:.4}", s.consumption_kwh),
            format!("{:.4}", s.solar_kwh),
            format!("{:.4}", s.solar_to_load),
            format!("{:.4}", s.solar_to_battery),
            format!("{:.4}", s.solar_exported),
            format!("{:.4}", s.battery_to_load),
            format!("{:.4}", s.grid_to_load),
            format!("{:.4}", s.grid_to_battery),
            format!("{:.4}", s.soc_kwh),
            format!("{:.4}", s.cost),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports one summary row per comparison to a CSV file.
///
/// Metrics without a value are written as `N/A`.
///
/// # Errors
///
/// Returns `Io` if the file cannot be created, `Csv` if writing fails.
pub fn export_summary_csv(results: &[BatteryComparison], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_summary_csv(results, io::BufWriter::new(file))
}

/// Writes comparison summaries as CSV to any writer.
///
/// # Errors
///
/// Returns `Csv` if writing fails.
pub fn write_summary_csv(results: &[BatteryComparison], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(',').map(str::trim))?;

    for c in results {
        let battery = c.battery();
        let fy = c.first_year();
        let proj = c.projection();
        let metrics = c.metrics();
        wtr.write_record(&[
            battery.id.clone(),
            battery.brand.clone(),
            battery.model.clone(),
            c.rate_plan_id().to_owned(),
            format!("{:.2}", battery.usable_kwh),
            format!("{:.2}", proj.price()),
            format!("{:.2}", proj.rebate()),
            format!("{:.2}", proj.net_cost()),
            format!("{:.2}", fy.original_annual_cost()),
            format!("{:.2}", fy.solar_only_annual_cost()),
            format!("{:.2}", fy.optimized_annual_cost()),
            format!("{:.2}", fy.total_savings()),
            format!("{:.2}", fy.storage_savings()),
            format!("{:.2}", proj.annual_savings()),
            format!("{:.2}", fy.cycles_per_year()),
            format!("{:.2}", fy.total_kwh_shifted()),
            fmt_or_na(metrics.payback_years, 2),
            fmt_or_na(metrics.annual_roi, 2),
            fmt_or_na(metrics.savings_per_dollar_invested, 4),
            format!("{:.2}", proj.net_profit()),
            c.recommendation().as_str().to_owned(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
