use std::path::Path;
use std::process;

use clap::Parser;
use tracing::info;

use battery_roi::cli::Args;
use battery_roi::compare::{BatteryComparison, DetailedComparison};
use battery_roi::config::ScenarioConfig;
use battery_roi::io::{export_dispatch_csv, export_summary_csv};
use battery_roi::logging;
use battery_roi::sim::DispatchSummary;

/// Prints an error and exits non-zero.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

/// Loads the scenario: `--scenario` first, then `--preset`, then baseline.
fn load_scenario(args: &Args) -> ScenarioConfig {
    let scenario = if let Some(ref path) = args.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = args.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = scenario.unwrap_or_else(|e| fail(e));

    if let Some(seed) = args.seed {
        scenario = scenario.with_seed(seed);
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

fn print_report(results: &[DetailedComparison]) {
    let mut plan = "";
    for detailed in results {
        let c = &detailed.comparison;
        if c.rate_plan_id() != plan {
            plan = c.rate_plan_id();
            println!("=== Rate plan: {plan} ===\n");
        }
        println!("{c}");
        println!("{}\n", DispatchSummary::from_run(&detailed.dispatch));
    }
}

fn main() {
    let args = Args::parse();
    logging::init();

    let scenario = load_scenario(&args);
    let engine = scenario.build_engine().unwrap_or_else(|e| fail(e));
    let results = engine.run_with_dispatch().unwrap_or_else(|e| fail(e));

    if args.json {
        let comparisons: Vec<&BatteryComparison> = results.iter().map(|d| &d.comparison).collect();
        let json = serde_json::to_string_pretty(&comparisons).unwrap_or_else(|e| fail(e));
        println!("{json}");
    } else {
        print_report(&results);
    }

    if let Some(ref path) = args.summary_out {
        let comparisons: Vec<BatteryComparison> =
            results.iter().map(|d| d.comparison.clone()).collect();
        if let Err(e) = export_summary_csv(&comparisons, path) {
            fail(format!("failed to write summary CSV: {e}"));
        }
        info!(path = %path.display(), "summary written");
    }

    if let Some(ref path) = args.dispatch_out {
        write_dispatch(&results, args.battery.as_deref(), path);
    }

    #[cfg(feature = "api")]
    if args.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(battery_roi::api::AppState::from_detailed(results));
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let rt = tokio::runtime::Runtime::new()
            .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
        if let Err(e) = rt.block_on(battery_roi::api::serve(state, addr)) {
            fail(format!("server error: {e}"));
        }
    }
}

/// Exports the first plan's dispatch for `battery`, or the first battery.
fn write_dispatch(results: &[DetailedComparison], battery: Option<&str>, path: &Path) {
    let detailed = match battery {
        Some(id) => results.iter().find(|d| d.dispatch.battery_id == id),
        None => results.first(),
    };
    let Some(detailed) = detailed else {
        fail(format!(
            "unknown battery \"{}\"",
            battery.unwrap_or_default()
        ));
    };
    if let Err(e) = export_dispatch_csv(&detailed.dispatch.steps, path) {
        fail(format!("failed to write dispatch CSV: {e}"));
    }
    info!(
        path = %path.display(),
        battery = %detailed.dispatch.battery_id,
        plan = %detailed.dispatch.plan_id,
        "dispatch written"
    );
}
