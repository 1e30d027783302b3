//! Residential battery dispatch simulation and payback projection.
//!
//! A household's usage and solar are simulated step by step against a rate
//! plan for every candidate battery, and the resulting bills are projected
//! into payback, ROI and savings per dollar.

/// HTTP API over comparison results.
#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod compare;
/// Scenario files and presets.
pub mod config;
pub mod devices;
pub mod error;
pub mod finance;
pub mod io;
pub mod logging;
/// Household usage profiles.
pub mod profile;
/// Dispatch engine, policy and KPIs.
pub mod sim;
/// Rate plans and built-in presets.
pub mod tariff;
