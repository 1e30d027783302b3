//! CSV import and export helpers.

pub mod export;
pub mod import;

pub use export::{export_dispatch_csv, export_summary_csv, write_dispatch_csv, write_summary_csv};
pub use import::{parse_intervals, read_intervals_csv};
