//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::compare::ComparisonEngine;
use crate::devices::{BatterySpec, CloudModel, SolarProductionModel, sample_catalog};
use crate::error::{EngineError, Result};
use crate::finance::{FinanceSettings, RebateRule, RebateTier, SavingsBasis};
use crate::io::read_intervals_csv;
use crate::profile::{LoadShape, UsageProfile, UsageProfileGenerator};
use crate::sim::clock::{SUPPORTED_STEPS_PER_DAY, YearClock};
use crate::sim::{DispatchPolicy, GridChargeRule};
use crate::tariff::{RatePlan, presets};

/// Annual consumption used when a household gives no usage input.
pub const DEFAULT_ANNUAL_KWH: f64 = 12_000.0;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`]
/// for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Usage input, calendar year and resolution.
    #[serde(default)]
    pub household: HouseholdConfig,
    /// Synthetic solar production.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Rate plans to compare under.
    #[serde(default)]
    pub rate_plan: RatePlanConfig,
    /// Candidate batteries; the sample catalog when empty.
    #[serde(default)]
    pub batteries: Vec<BatterySpec>,
    #[serde(default)]
    pub dispatch: DispatchPolicy,
    #[serde(default)]
    pub finance: FinanceSettings,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Household usage input. At most one of `annual_kwh`, `monthly_kwh`,
/// `monthly_bill` or `interval_csv` may be set; none means
/// [`DEFAULT_ANNUAL_KWH`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HouseholdConfig {
    /// Calendar year to simulate.
    pub year: i32,
    /// Steps per day: 24, 48 or 96.
    pub steps_per_day: usize,
    /// Apply the seasonal month curve to annual or bill-derived usage.
    pub seasonal: bool,
    pub annual_kwh: Option<f64>,
    /// Twelve monthly totals, January first.
    pub monthly_kwh: Option<[f64; 12]>,
    /// Typical monthly bill ($); requires `blended_rate`.
    pub monthly_bill: Option<f64>,
    /// All-in $/kWh used to turn the bill into kWh.
    pub blended_rate: Option<f64>,
    /// CSV of `timestamp,kwh` meter readings.
    pub interval_csv: Option<PathBuf>,
    pub load_shape: LoadShape,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            year: 2025,
            steps_per_day: 24,
            seasonal: true,
            annual_kwh: None,
            monthly_kwh: None,
            monthly_bill: None,
            blended_rate: None,
            interval_csv: None,
            load_shape: LoadShape::default(),
        }
    }
}

/// Resolved usage input.
#[derive(Debug, Clone, PartialEq)]
pub enum UsageInput {
    Annual(f64),
    Monthly([f64; 12]),
    Bill {
        monthly_bill: f64,
        blended_rate: f64,
    },
    Intervals(PathBuf),
}

impl HouseholdConfig {
    /// Number of usage inputs explicitly set.
    fn input_count(&self) -> usize {
        [
            self.annual_kwh.is_some(),
            self.monthly_kwh.is_some(),
            self.monthly_bill.is_some(),
            self.interval_csv.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// The usage input to build the profile from.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` if a bill is given without a blended rate.
    pub fn usage_input(&self) -> Result<UsageInput> {
        if let Some(path) = &self.interval_csv {
            return Ok(UsageInput::Intervals(path.clone()));
        }
        if let Some(monthly) = self.monthly_kwh {
            return Ok(UsageInput::Monthly(monthly));
        }
        if let Some(monthly_bill) = self.monthly_bill {
            let blended_rate = self.blended_rate.ok_or_else(|| {
                EngineError::InvalidUsage("monthly_bill requires blended_rate".into())
            })?;
            return Ok(UsageInput::Bill {
                monthly_bill,
                blended_rate,
            });
        }
        Ok(UsageInput::Annual(
            self.annual_kwh.unwrap_or(DEFAULT_ANNUAL_KWH),
        ))
    }
}

/// Solar array parameters. With neither `annual_kwh` nor `system_kw` set
/// the household has no solar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Annual production (kWh).
    pub annual_kwh: Option<f64>,
    /// DC system size (kW).
    pub system_kw: Option<f64>,
    /// Annual kWh per installed kW.
    pub specific_yield: f64,
    pub cloud: CloudModel,
    /// Cloud noise seed.
    pub seed: u64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            annual_kwh: None,
            system_kw: None,
            specific_yield: 1_150.0,
            cloud: CloudModel::Clear,
            seed: 42,
        }
    }
}

impl SolarConfig {
    /// Builds the production model, or `None` for a household without solar.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for negative sizes or bad cloud parameters.
    pub fn model(&self) -> Result<Option<SolarProductionModel>> {
        let model = match (self.annual_kwh, self.system_kw) {
            (Some(annual_kwh), _) => SolarProductionModel::new(annual_kwh)?,
            (None, Some(kw)) => SolarProductionModel::from_system(kw, self.specific_yield)?,
            (None, None) => return Ok(None),
        };
        model.with_cloud(self.cloud, self.seed).map(Some)
    }
}

/// Rate plans: built-in presets by name plus custom plans.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatePlanConfig {
    /// Names accepted by [`presets::by_name`].
    pub presets: Vec<String>,
    pub plans: Vec<RatePlan>,
}

impl Default for RatePlanConfig {
    fn default() -> Self {
        Self {
            presets: vec!["tou".into()],
            plans: Vec::new(),
        }
    }
}

impl RatePlanConfig {
    /// Presets first, then custom plans, in listed order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRatePlan` for an unknown preset name.
    pub fn resolve(&self) -> Result<Vec<RatePlan>> {
        let mut plans = Vec::with_capacity(self.presets.len() + self.plans.len());
        for name in &self.presets {
            let plan = presets::by_name(name).ok_or_else(|| EngineError::InvalidRatePlan {
                plan: name.clone(),
                reason: format!(
                    "unknown preset, available: {}",
                    presets::PRESET_NAMES.join(", ")
                ),
            })?;
            plans.push(plan);
        }
        plans.extend(self.plans.iter().cloned());
        Ok(plans)
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"household.steps_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a 12 MWh household with 7 kW of solar
    /// on the ULO and TOU plans, comparing the sample catalog.
    pub fn baseline() -> Self {
        Self {
            household: HouseholdConfig::default(),
            solar: SolarConfig {
                system_kw: Some(7.0),
                ..SolarConfig::default()
            },
            rate_plan: RatePlanConfig {
                presets: vec!["ulo".into(), "tou".into()],
                plans: Vec::new(),
            },
            batteries: sample_catalog(),
            dispatch: DispatchPolicy::default(),
            finance: FinanceSettings::default(),
            base_dir: None,
        }
    }

    /// Returns the TOU + large solar preset: cloudy 10 kW array, half-hourly
    /// steps, combined savings and a tiered rebate.
    pub fn tou_solar() -> Self {
        Self {
            household: HouseholdConfig {
                annual_kwh: Some(14_000.0),
                steps_per_day: 48,
                ..HouseholdConfig::default()
            },
            solar: SolarConfig {
                system_kw: Some(10.0),
                cloud: CloudModel::Ar1 {
                    alpha: 0.9,
                    noise_std: 0.15,
                },
                ..SolarConfig::default()
            },
            rate_plan: RatePlanConfig {
                presets: vec!["tou".into()],
                plans: Vec::new(),
            },
            batteries: sample_catalog(),
            dispatch: DispatchPolicy::default(),
            finance: FinanceSettings {
                savings_basis: SavingsBasis::Combined,
                rebate: RebateRule {
                    tiers: vec![
                        RebateTier {
                            up_to_kwh: 10.0,
                            per_kwh: 300.0,
                        },
                        RebateTier {
                            up_to_kwh: 20.0,
                            per_kwh: 150.0,
                        },
                    ],
                    cap: Some(5_000.0),
                },
                ..FinanceSettings::default()
            },
            base_dir: None,
        }
    }

    /// Returns the flat-rate preset: no price spread, so a battery only
    /// stores surplus solar and rarely pays back.
    pub fn flat_rate() -> Self {
        Self {
            household: HouseholdConfig {
                monthly_bill: Some(150.0),
                blended_rate: Some(0.15),
                ..HouseholdConfig::default()
            },
            solar: SolarConfig {
                system_kw: Some(6.0),
                ..SolarConfig::default()
            },
            rate_plan: RatePlanConfig {
                presets: vec!["flat".into()],
                plans: Vec::new(),
            },
            batteries: sample_catalog(),
            dispatch: DispatchPolicy {
                grid_charge: GridChargeRule::Never,
                ..DispatchPolicy::self_consumption()
            },
            finance: FinanceSettings::default(),
            base_dir: None,
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "tou_solar", "flat_rate"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> std::result::Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tou_solar" => Ok(Self::tou_solar()),
            "flat_rate" => Ok(Self::flat_rate()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// A relative `household.interval_csv` resolves against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let mut cfg: Self = toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))?;
        if cfg.batteries.is_empty() {
            cfg.batteries = sample_catalog();
        }
        Ok(cfg)
    }

    /// Overrides the solar cloud seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.solar.seed = seed;
        self
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let h = &self.household;

        let clock_ok = YearClock::new(h.year, h.steps_per_day).is_ok();
        if !SUPPORTED_STEPS_PER_DAY.contains(&h.steps_per_day) {
            errors.push(ConfigError::new(
                "household.steps_per_day",
                format!("must be one of {SUPPORTED_STEPS_PER_DAY:?}"),
            ));
        } else if !clock_ok {
            errors.push(ConfigError::new("household.year", "is not a valid year"));
        }
        if h.input_count() > 1 {
            errors.push(ConfigError::new(
                "household",
                "set at most one of annual_kwh, monthly_kwh, monthly_bill, interval_csv",
            ));
        }
        if let Some(kwh) = h.annual_kwh {
            if !kwh.is_finite() || kwh <= 0.0 {
                errors.push(ConfigError::new("household.annual_kwh", "must be > 0"));
            }
        }
        if let Some(monthly) = h.monthly_kwh {
            if monthly.iter().any(|m| !m.is_finite() || *m < 0.0)
                || monthly.iter().sum::<f64>() <= 0.0
            {
                errors.push(ConfigError::new(
                    "household.monthly_kwh",
                    "must be >= 0 and not all zero",
                ));
            }
        }
        match (h.monthly_bill, h.blended_rate) {
            (Some(bill), Some(rate)) => {
                if !bill.is_finite() || bill <= 0.0 {
                    errors.push(ConfigError::new("household.monthly_bill", "must be > 0"));
                }
                if !rate.is_finite() || rate <= 0.0 {
                    errors.push(ConfigError::new("household.blended_rate", "must be > 0"));
                }
            }
            (Some(_), None) => errors.push(ConfigError::new(
                "household.blended_rate",
                "is required with household.monthly_bill",
            )),
            (None, Some(_)) => errors.push(ConfigError::new(
                "household.blended_rate",
                "only applies with household.monthly_bill",
            )),
            (None, None) => {}
        }
        if let Err(e) = h.load_shape.validate() {
            errors.push(ConfigError::new("household.load_shape", e.to_string()));
        }

        let sol = &self.solar;
        if sol.annual_kwh.is_some() && sol.system_kw.is_some() {
            errors.push(ConfigError::new(
                "solar",
                "set either annual_kwh or system_kw, not both",
            ));
        }
        if !sol.specific_yield.is_finite() || sol.specific_yield < 0.0 {
            errors.push(ConfigError::new("solar.specific_yield", "must be >= 0"));
        }
        if let Err(e) = sol.model() {
            errors.push(ConfigError::new("solar", e.to_string()));
        }

        match self.rate_plan.resolve() {
            Ok(plans) if plans.is_empty() => errors.push(ConfigError::new(
                "rate_plan",
                "at least one preset or plan is required",
            )),
            Ok(plans) => {
                if clock_ok {
                    for (i, plan) in plans.iter().enumerate() {
                        if let Err(e) = plan.validate(h.year) {
                            errors.push(ConfigError::new(
                                format!("rate_plan[{i}]"),
                                e.to_string(),
                            ));
                        }
                    }
                }
            }
            Err(e) => errors.push(ConfigError::new("rate_plan.presets", e.to_string())),
        }

        let mut seen = std::collections::HashSet::new();
        for (i, battery) in self.batteries.iter().enumerate() {
            if let Err(e) = battery.validate() {
                errors.push(ConfigError::new(format!("batteries[{i}]"), e.to_string()));
            }
            if !seen.insert(battery.id.as_str()) {
                errors.push(ConfigError::new(
                    format!("batteries[{i}].id"),
                    format!("duplicate id \"{}\"", battery.id),
                ));
            }
        }
        if let Err(e) = self.dispatch.validate() {
            errors.push(ConfigError::new("dispatch", e.to_string()));
        }
        if let Err(e) = self.finance.validate() {
            errors.push(ConfigError::new("finance", e.to_string()));
        }

        errors
    }

    /// Builds the household profile with solar attached.
    ///
    /// `plan` decides which dates count as weekends.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUsage` for bad usage input, `Io`/`Csv` if the interval
    /// file cannot be read, and `UnresolvedPeriod` if `plan` leaves a step
    /// unpriced.
    pub fn build_profile(&self, plan: &RatePlan) -> Result<UsageProfile> {
        let h = &self.household;
        let generator = UsageProfileGenerator::new(h.load_shape.clone())?
            .with_steps_per_day(h.steps_per_day)?;

        let profile = match h.usage_input()? {
            UsageInput::Annual(kwh) => generator.generate(kwh, plan, h.year, h.seasonal)?,
            UsageInput::Monthly(monthly) => generator.from_monthly(&monthly, plan, h.year)?,
            UsageInput::Bill {
                monthly_bill,
                blended_rate,
            } => generator.from_monthly_bill(monthly_bill, blended_rate, plan, h.year, h.seasonal)?,
            UsageInput::Intervals(path) => {
                let path = match &self.base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path,
                };
                generator.from_intervals(&read_intervals_csv(&path)?, plan)?
            }
        };

        match self.solar.model()? {
            Some(model) => attach_solar(profile, &model),
            None => Ok(profile),
        }
    }

    /// Validates the scenario and builds a ready-to-run comparison.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`ScenarioConfig::build_profile`] or
    /// [`ComparisonEngine::new`].
    pub fn build_engine(&self) -> Result<ComparisonEngine> {
        let plans = self.rate_plan.resolve()?;
        let first = plans.first().ok_or_else(|| {
            EngineError::InvalidSettings("at least one rate plan is required".into())
        })?;
        let profile = self.build_profile(first)?;
        info!(
            year = profile.year(),
            steps = profile.len(),
            consumption_kwh = profile.total_consumption_kwh(),
            solar_kwh = profile.total_solar_kwh(),
            "usage profile ready"
        );

        let batteries = if self.batteries.is_empty() {
            sample_catalog()
        } else {
            self.batteries.clone()
        };
        ComparisonEngine::new(
            profile,
            plans,
            batteries,
            self.dispatch,
            self.finance.clone(),
        )
    }
}

/// Overlays synthetic solar onto a profile by timestamp.
///
/// Each reading takes the production of the same step in its own calendar
/// year, so interval data that starts mid-year or runs into the next year
/// gets the right season.
fn attach_solar(profile: UsageProfile, model: &SolarProductionModel) -> Result<UsageProfile> {
    let steps_per_day = (24.0 / profile.step_hours()).round() as usize;
    let step_minutes = (profile.step_hours() * 60.0).round() as i64;
    let mut years: BTreeMap<i32, (NaiveDateTime, Vec<f64>)> = BTreeMap::new();
    let mut aligned = Vec::with_capacity(profile.len());
    for p in profile.points() {
        let (start, series) = match years.entry(p.timestamp.year()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let year = *entry.key();
                let start = YearClock::new(year, steps_per_day)?.timestamp_at(0);
                entry.insert((start, model.generate(year, steps_per_day)?))
            }
        };
        let offset = (p.timestamp - *start).num_minutes();
        let kwh = usize::try_from(offset / step_minutes)
            .ok()
            .and_then(|i| series.get(i).copied())
            .ok_or_else(|| {
                EngineError::InvalidUsage(format!(
                    "interval reading at {} has no matching solar step",
                    p.timestamp
                ))
            })?;
        aligned.push(kwh);
    }
    profile.with_solar(&aligned)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let e = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert_eq!(e.field, "preset");
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[household]
year = 2024
steps_per_day = 96
monthly_kwh = [1200.0, 1100.0, 1000.0, 900.0, 800.0, 900.0, 1100.0, 1150.0, 900.0, 850.0, 1000.0, 1100.0]

[solar]
system_kw = 8.0
specific_yield = 1100.0
seed = 7
cloud = { kind = "ar1", alpha = 0.85, noise_std = 0.2 }

[rate_plan]
presets = ["ulo"]

[[rate_plan.plans]]
id = "co-op"
name = "Co-op flat"
export_credit = { kind = "fixed", rate = 0.04 }
[[rate_plan.plans.periods]]
label = "all_hours"
price_per_kwh = 0.14
[[rate_plan.plans.periods.rules]]

[[batteries]]
id = "home-10"
brand = "Acme"
model = "H10"
usable_kwh = 10.0
nominal_kwh = 10.5
inverter_kw = 5.0
round_trip_efficiency = 0.9
depth_of_discharge = 0.95
price = 9000.0

[dispatch]
discharge = { kind = "always" }
grid_charge = { kind = "cheap_period", min_spread = 0.05 }

[finance]
escalation_rate = 0.03
years = 20
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.household.year, 2024);
        assert_eq!(cfg.household.steps_per_day, 96);
        assert_eq!(cfg.solar.seed, 7);
        assert_eq!(cfg.batteries.len(), 1);
        assert_eq!(cfg.finance.years, 20);
        let plans = cfg.rate_plan.resolve().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].id, "co-op");
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[household]
steps_per_day = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[solar]\nsystem_kw = 5.0\n").unwrap();
        assert_eq!(cfg.household.steps_per_day, 24);
        assert_eq!(
            cfg.household.usage_input().unwrap(),
            UsageInput::Annual(DEFAULT_ANNUAL_KWH)
        );
        assert_eq!(cfg.rate_plan.presets, vec!["tou".to_string()]);
        assert_eq!(cfg.batteries, sample_catalog());
    }

    #[test]
    fn validation_catches_bad_resolution() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.steps_per_day = 12;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "household.steps_per_day"));
    }

    #[test]
    fn validation_catches_conflicting_usage_inputs() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.annual_kwh = Some(9_000.0);
        cfg.household.monthly_bill = Some(120.0);
        cfg.household.blended_rate = Some(0.14);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "household"));
    }

    #[test]
    fn validation_catches_bill_without_rate() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.monthly_bill = Some(120.0);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "household.blended_rate"));
    }

    #[test]
    fn validation_catches_non_positive_usage() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.household.annual_kwh = Some(0.0);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "household.annual_kwh"));
    }

    #[test]
    fn validation_catches_unknown_plan_preset() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.rate_plan.presets = vec!["nightly".into()];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "rate_plan.presets"));
    }

    #[test]
    fn validation_catches_duplicate_battery_ids() {
        let mut cfg = ScenarioConfig::baseline();
        let first = cfg.batteries[0].clone();
        cfg.batteries.push(first);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field.ends_with(".id")));
    }

    #[test]
    fn validation_catches_bad_finance() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.finance.years = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "finance"));
    }

    #[test]
    fn seed_override() {
        let cfg = ScenarioConfig::tou_solar().with_seed(99);
        assert_eq!(cfg.solar.seed, 99);
    }

    #[test]
    fn bill_input_scales_to_annual() {
        let cfg = ScenarioConfig::flat_rate();
        let plans = cfg.rate_plan.resolve().unwrap();
        let profile = cfg.build_profile(&plans[0]).unwrap();
        // $150 / $0.15 x 12 months
        assert!((profile.total_consumption_kwh() - 12_000.0).abs() < 1e-6);
        assert!((profile.total_solar_kwh() - 6.0 * 1_150.0).abs() < 1e-6);
    }

    #[test]
    fn household_without_solar() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.solar = SolarConfig::default();
        let plans = cfg.rate_plan.resolve().unwrap();
        let profile = cfg.build_profile(&plans[0]).unwrap();
        assert_eq!(profile.total_solar_kwh(), 0.0);
    }

    #[test]
    fn interval_csv_resolves_relative_to_scenario_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = fs::File::create(dir.path().join("meter.csv")).unwrap();
        writeln!(csv, "timestamp,kwh").unwrap();
        for hour in 0..48 {
            writeln!(csv, "2025-06-{:02} {:02}:00,0.8", 1 + hour / 24, hour % 24).unwrap();
        }
        let scenario = dir.path().join("scenario.toml");
        fs::write(
            &scenario,
            "[household]\ninterval_csv = \"meter.csv\"\n[solar]\nsystem_kw = 5.0\n",
        )
        .unwrap();

        let cfg = ScenarioConfig::from_toml_file(&scenario).unwrap();
        assert!(cfg.validate().is_empty());
        let plans = cfg.rate_plan.resolve().unwrap();
        let profile = cfg.build_profile(&plans[0]).unwrap();
        assert_eq!(profile.len(), 48);
        assert!((profile.total_consumption_kwh() - 38.4).abs() < 1e-9);
        // June days are sunny
        assert!(profile.total_solar_kwh() > 0.0);
    }

    /// Writes `hours` hourly readings from `start` and loads them with a 7 kW array.
    fn interval_profile(
        start: NaiveDateTime,
        hours: i64,
    ) -> Result<(UsageProfile, ScenarioConfig)> {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = fs::File::create(dir.path().join("meter.csv")).unwrap();
        writeln!(csv, "timestamp,kwh").unwrap();
        for h in 0..hours {
            let at = start + chrono::TimeDelta::hours(h);
            writeln!(csv, "{},1.0", at.format("%Y-%m-%d %H:%M")).unwrap();
        }
        let scenario = dir.path().join("scenario.toml");
        fs::write(
            &scenario,
            "[household]\ninterval_csv = \"meter.csv\"\n[solar]\nsystem_kw = 7.0\n",
        )
        .unwrap();

        let cfg = ScenarioConfig::from_toml_file(&scenario).unwrap();
        let plans = cfg.rate_plan.resolve().unwrap();
        cfg.build_profile(&plans[0]).map(|p| (p, cfg))
    }

    fn ts(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    /// Hourly solar of the configured array at `at`, straight from the model.
    fn solar_at(cfg: &ScenarioConfig, at: NaiveDateTime) -> f64 {
        let model = cfg.solar.model().unwrap().unwrap();
        let series = model.generate(at.year(), 24).unwrap();
        let index = (at - ts(at.year(), 1, 1, 0)).num_hours() as usize;
        series[index]
    }

    fn assert_solar_matches(profile: &UsageProfile, cfg: &ScenarioConfig, at: NaiveDateTime) {
        let point = profile.points().iter().find(|p| p.timestamp == at).unwrap();
        assert!(
            (point.solar_kwh - solar_at(cfg, at)).abs() < 1e-12,
            "solar at {at}: {} vs {}",
            point.solar_kwh,
            solar_at(cfg, at)
        );
    }

    #[test]
    fn partial_year_intervals_get_solar_of_their_dates() {
        let (profile, cfg) = interval_profile(ts(2025, 6, 1, 0), 24 * 10).unwrap();
        assert_eq!(profile.len(), 240);
        assert_solar_matches(&profile, &cfg, ts(2025, 6, 1, 12));
        assert_solar_matches(&profile, &cfg, ts(2025, 6, 10, 9));
    }

    #[test]
    fn mid_year_start_keeps_seasons_aligned() {
        // 8760 readings, the length of a full 2025 series
        let (profile, cfg) = interval_profile(ts(2025, 7, 1, 0), 8760).unwrap();
        assert_eq!(profile.len(), 8760);
        assert_solar_matches(&profile, &cfg, ts(2025, 7, 1, 12));
        assert_solar_matches(&profile, &cfg, ts(2025, 12, 31, 12));

        let july_noon = solar_at(&cfg, ts(2025, 7, 1, 12));
        let january_noon = solar_at(&cfg, ts(2025, 1, 1, 12));
        assert!(july_noon > january_noon);
        assert!((profile.points()[12].solar_kwh - july_noon).abs() < 1e-12);
    }

    #[test]
    fn readings_into_next_year_use_that_years_solar() {
        let (profile, cfg) = interval_profile(ts(2025, 12, 30, 0), 24 * 5).unwrap();
        assert_eq!(profile.len(), 120);
        assert_solar_matches(&profile, &cfg, ts(2025, 12, 31, 12));
        assert_solar_matches(&profile, &cfg, ts(2026, 1, 1, 12));
        assert_solar_matches(&profile, &cfg, ts(2026, 1, 3, 13));
        assert!(
            profile
                .points()
                .iter()
                .any(|p| p.timestamp.year() == 2026 && p.solar_kwh > 0.0)
        );
    }

    #[test]
    fn build_engine_covers_every_plan_and_battery() {
        let engine = ScenarioConfig::baseline().build_engine().unwrap();
        assert_eq!(engine.plans().len(), 2);
        assert_eq!(engine.units().len(), 2 * sample_catalog().len());
    }
}
