//! Physical models: the battery and the synthetic solar array.

/// Home battery spec and per-run state.
pub mod battery;
pub mod catalog;
/// Synthetic solar production model.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use battery::{Battery, BatterySpec, EfficiencyModel};
pub use catalog::sample_catalog;
pub use solar::{CloudModel, SolarProductionModel};
