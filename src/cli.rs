//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Compare home batteries on a household's usage, solar and rate plan.
///
/// Without `--scenario` or `--preset` the baseline preset runs.
#[derive(Debug, Parser)]
#[command(author, version, about)]
#[must_use]
pub struct Args {
    /// Scenario TOML file.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Built-in scenario: baseline, tou_solar or flat_rate.
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the solar cloud-noise seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the per-step dispatch of one battery to CSV.
    #[arg(long, value_name = "PATH")]
    pub dispatch_out: Option<PathBuf>,

    /// Battery id for `--dispatch-out`; defaults to the first battery.
    #[arg(long, value_name = "ID", requires = "dispatch_out")]
    pub battery: Option<String>,

    /// Write one summary row per battery and rate plan to CSV.
    #[arg(long, value_name = "PATH")]
    pub summary_out: Option<PathBuf>,

    /// Print the comparisons as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Serve the results over HTTP after the run.
    #[cfg(feature = "api")]
    #[arg(long)]
    pub serve: bool,

    /// Port for `--serve`.
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["battery-roi"]).unwrap();
        assert!(args.scenario.is_none());
        assert!(args.preset.is_none());
        assert!(!args.json);
    }

    #[test]
    fn scenario_conflicts_with_preset() {
        let res = Args::try_parse_from([
            "battery-roi",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn battery_requires_dispatch_out() {
        assert!(Args::try_parse_from(["battery-roi", "--battery", "iq-5p"]).is_err());
        let args = Args::try_parse_from([
            "battery-roi",
            "--dispatch-out",
            "d.csv",
            "--battery",
            "iq-5p",
        ])
        .unwrap();
        assert_eq!(args.battery.as_deref(), Some("iq-5p"));
    }

    #[test]
    fn seed_parses() {
        let args = Args::try_parse_from(["battery-roi", "--preset", "tou_solar", "--seed", "7"])
            .unwrap();
        assert_eq!(args.seed, Some(7));
        assert!(Args::try_parse_from(["battery-roi", "--seed", "x"]).is_err());
    }
}
