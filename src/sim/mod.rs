/// Solar split between load, battery and export.
pub mod allocation;
/// Calendar-year simulation clock.
pub mod clock;
pub mod engine;
pub mod kpi;
/// Discharge and grid-charge rules.
pub mod policy;
pub mod types;

pub use engine::{BatteryDispatchSimulator, simulate};
pub use kpi::DispatchSummary;
pub use policy::{DischargeRule, DispatchPolicy, GridChargeRule};
pub use types::{DispatchRun, DispatchStep};
