//! Battery comparison: fans the dispatch and financial pipeline out over every
//! (battery, rate plan) pair and collects the results.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::devices::BatterySpec;
use crate::error::{EngineError, Result};
use crate::finance::{
    FinanceSettings, FinancialProjector, FirstYearAnalysis, InvestmentMetrics, MultiYearProjection,
};
use crate::profile::UsageProfile;
use crate::sim::{BatteryDispatchSimulator, DispatchPolicy, DispatchRun};
use crate::tariff::RatePlan;

/// Verdict attached to every comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Pays back within the projection horizon.
    CostEffective,
    /// Negative savings or payback beyond the horizon. A valid result, not an
    /// error.
    NotCostEffective,
}

impl Recommendation {
    /// Machine-readable label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::CostEffective => "cost_effective",
            Recommendation::NotCostEffective => "not_cost_effective",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::CostEffective => write!(f, "cost-effective"),
            Recommendation::NotCostEffective => {
                write!(f, "not cost-effective with this usage pattern")
            }
        }
    }
}

/// Result for one battery under one rate plan.
///
/// Renderers read these figures as-is; nothing outside the engine builds
/// one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryComparison {
    battery: BatterySpec,
    rate_plan_id: String,
    metrics: InvestmentMetrics,
    first_year: FirstYearAnalysis,
    projection: MultiYearProjection,
    recommendation: Recommendation,
}

impl BatteryComparison {
    fn new(
        battery: &BatterySpec,
        plan: &RatePlan,
        first_year: FirstYearAnalysis,
        projection: MultiYearProjection,
        metrics: InvestmentMetrics,
    ) -> Self {
        let horizon = projection.years() as f64;
        let recommendation = match projection.payback_years() {
            Some(years) if projection.annual_savings() > 0.0 && years <= horizon => {
                Recommendation::CostEffective
            }
            _ => Recommendation::NotCostEffective,
        };
        Self {
            battery: battery.clone(),
            rate_plan_id: plan.id.clone(),
            metrics,
            first_year,
            projection,
            recommendation,
        }
    }

    pub fn battery(&self) -> &BatterySpec {
        &self.battery
    }

    pub fn rate_plan_id(&self) -> &str {
        &self.rate_plan_id
    }

    pub fn metrics(&self) -> &InvestmentMetrics {
        &self.metrics
    }

    pub fn first_year(&self) -> &FirstYearAnalysis {
        &self.first_year
    }

    pub fn projection(&self) -> &MultiYearProjection {
        &self.projection
    }

    pub fn recommendation(&self) -> Recommendation {
        self.recommendation
    }
}

impl fmt::Display for BatteryComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== {} {} ({}) on {} ===",
            self.battery.brand, self.battery.model, self.battery.id, self.rate_plan_id
        )?;
        writeln!(f, "{}", self.first_year)?;
        writeln!(f, "{}", self.projection)?;
        writeln!(f, "Metrics:               {}", self.metrics)?;
        write!(f, "Recommendation:        {}", self.recommendation)
    }
}

/// A comparison together with the dispatch run it came from.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedComparison {
    pub comparison: BatteryComparison,
    pub dispatch: DispatchRun,
}

/// One (battery, rate plan) unit of work.
///
/// Units share nothing mutable, so a host may run them in any order or on
/// any thread.
#[derive(Debug, Clone, Copy)]
pub struct SimulationUnit<'a> {
    profile: &'a UsageProfile,
    plan: &'a RatePlan,
    battery: &'a BatterySpec,
    policy: &'a DispatchPolicy,
    projector: &'a FinancialProjector,
}

impl<'a> SimulationUnit<'a> {
    pub fn battery(&self) -> &'a BatterySpec {
        self.battery
    }

    pub fn plan(&self) -> &'a RatePlan {
        self.plan
    }

    /// Runs dispatch and finance for this unit.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedPeriod` if the plan leaves a step unpriced.
    pub fn run(&self) -> Result<BatteryComparison> {
        self.run_detailed().map(|d| d.comparison)
    }

    /// Like [`SimulationUnit::run`], keeping the dispatch run.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedPeriod` if the plan leaves a step unpriced.
    #[instrument(skip_all, fields(battery = %self.battery.id, plan = %self.plan.id))]
    pub fn run_detailed(&self) -> Result<DetailedComparison> {
        let dispatch =
            BatteryDispatchSimulator::new(self.plan, self.policy).run(self.profile, self.battery)?;
        let first_year = self.projector.first_year(&dispatch);
        let projection = self.projector.project(&first_year, self.battery);
        let metrics = self.projector.metrics(&projection);
        let comparison =
            BatteryComparison::new(self.battery, self.plan, first_year, projection, metrics);
        Ok(DetailedComparison {
            comparison,
            dispatch,
        })
    }
}

/// Compares candidate batteries on one household.
///
/// Every input is validated once, at construction. Results come back in
/// input order: plan-major, then battery order. Callers sort them with
/// [`sort_by_payback`], [`sort_by_net_profit`] or
/// [`sort_by_savings_per_dollar`].
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    profile: UsageProfile,
    plans: Vec<RatePlan>,
    batteries: Vec<BatterySpec>,
    policy: DispatchPolicy,
    projector: FinancialProjector,
}

impl ComparisonEngine {
    /// # Arguments
    ///
    /// * `profile` - Usage profile with solar attached
    /// * `plans` - One or more rate plans
    /// * `batteries` - Candidate batteries
    /// * `policy` - Dispatch policy shared by every run
    /// * `finance` - Projection settings shared by every run
    ///
    /// # Errors
    ///
    /// Returns the first validation error among the batteries (including
    /// duplicate ids), plans, policy and finance settings.
    pub fn new(
        profile: UsageProfile,
        plans: Vec<RatePlan>,
        batteries: Vec<BatterySpec>,
        policy: DispatchPolicy,
        finance: FinanceSettings,
    ) -> Result<Self> {
        if plans.is_empty() {
            return Err(EngineError::InvalidSettings(
                "at least one rate plan is required".into(),
            ));
        }
        for plan in &plans {
            plan.validate(profile.year())?;
        }
        let mut seen = HashSet::new();
        for battery in &batteries {
            battery.validate()?;
            if !seen.insert(battery.id.as_str()) {
                return Err(EngineError::InvalidBattery {
                    id: battery.id.clone(),
                    reason: "duplicate id".into(),
                });
            }
        }
        policy.validate()?;
        let projector = FinancialProjector::new(finance)?;

        Ok(Self {
            profile,
            plans,
            batteries,
            policy,
            projector,
        })
    }

    pub fn profile(&self) -> &UsageProfile {
        &self.profile
    }

    pub fn plans(&self) -> &[RatePlan] {
        &self.plans
    }

    pub fn batteries(&self) -> &[BatterySpec] {
        &self.batteries
    }

    /// All units of work, plan-major.
    pub fn units(&self) -> Vec<SimulationUnit<'_>> {
        self.plans
            .iter()
            .flat_map(|plan| {
                self.batteries.iter().map(move |battery| SimulationUnit {
                    profile: &self.profile,
                    plan,
                    battery,
                    policy: &self.policy,
                    projector: &self.projector,
                })
            })
            .collect()
    }

    /// Runs every unit in parallel.
    ///
    /// # Errors
    ///
    /// Returns the first error any unit hits.
    pub fn run(&self) -> Result<Vec<BatteryComparison>> {
        let results = self
            .units()
            .par_iter()
            .map(SimulationUnit::run)
            .collect::<Result<Vec<_>>>()?;
        self.log_done(&results);
        Ok(results)
    }

    /// Runs every unit on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the first error any unit hits.
    pub fn run_sequential(&self) -> Result<Vec<BatteryComparison>> {
        let results = self
            .units()
            .iter()
            .map(SimulationUnit::run)
            .collect::<Result<Vec<_>>>()?;
        self.log_done(&results);
        Ok(results)
    }

    /// Runs every unit in parallel, keeping each dispatch run.
    ///
    /// # Errors
    ///
    /// Returns the first error any unit hits.
    pub fn run_with_dispatch(&self) -> Result<Vec<DetailedComparison>> {
        let results = self
            .units()
            .par_iter()
            .map(SimulationUnit::run_detailed)
            .collect::<Result<Vec<_>>>()?;
        self.log_done(results.iter().map(|d| &d.comparison));
        Ok(results)
    }

    fn log_done<'r>(&self, results: impl IntoIterator<Item = &'r BatteryComparison>) {
        let (mut runs, mut cost_effective) = (0, 0);
        for comparison in results {
            runs += 1;
            if comparison.recommendation() == Recommendation::CostEffective {
                cost_effective += 1;
            }
        }
        info!(
            runs,
            plans = self.plans.len(),
            batteries = self.batteries.len(),
            cost_effective,
            "comparison complete"
        );
    }
}

/// Orders an optional metric with `None` last.
fn cmp_some_first(a: Option<f64>, b: Option<f64>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if ascending => x.total_cmp(&y),
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Shortest payback first; "N/A" last.
pub fn sort_by_payback(results: &mut [BatteryComparison]) {
    results.sort_by(|a, b| {
        cmp_some_first(a.metrics.payback_years, b.metrics.payback_years, true)
    });
}

/// Highest net profit over the horizon first.
pub fn sort_by_net_profit(results: &mut [BatteryComparison]) {
    results.sort_by(|a, b| {
        b.projection
            .net_profit()
            .total_cmp(&a.projection.net_profit())
    });
}

/// Most savings per dollar invested first; "N/A" last.
pub fn sort_by_savings_per_dollar(results: &mut [BatteryComparison]) {
    results.sort_by(|a, b| {
        cmp_some_first(
            a.metrics.savings_per_dollar_invested,
            b.metrics.savings_per_dollar_invested,
            false,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{LoadShape, UsageProfileGenerator};
    use crate::tariff::presets;

    fn battery(id: &str, usable_kwh: f64, price: f64) -> BatterySpec {
        BatterySpec {
            id: id.into(),
            brand: "Acme".into(),
            model: id.into(),
            usable_kwh,
            nominal_kwh: usable_kwh,
            inverter_kw: 5.0,
            round_trip_efficiency: 0.9,
            depth_of_discharge: 1.0,
            price,
        }
    }

    fn engine(batteries: Vec<BatterySpec>) -> ComparisonEngine {
        let plan = presets::ultra_low_overnight();
        let profile = UsageProfileGenerator::new(LoadShape::flat())
            .unwrap()
            .generate(12_000.0, &plan, 2025, false)
            .unwrap();
        ComparisonEngine::new(
            profile,
            vec![plan],
            batteries,
            DispatchPolicy::default(),
            FinanceSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let engine = engine(vec![battery("a", 10.0, 9_000.0), battery("b", 5.0, 5_000.0)]);
        let parallel = engine.run().unwrap();
        let sequential = engine.run_sequential().unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(parallel[0].battery().id, "a");
        assert_eq!(parallel[1].battery().id, "b");
    }

    #[test]
    fn units_cover_every_pair() {
        let plan = presets::ultra_low_overnight();
        let profile = UsageProfileGenerator::default()
            .generate(9_000.0, &plan, 2025, true)
            .unwrap();
        let engine = ComparisonEngine::new(
            profile,
            vec![plan, presets::time_of_use()],
            vec![battery("a", 10.0, 9_000.0), battery("b", 5.0, 5_000.0)],
            DispatchPolicy::default(),
            FinanceSettings::default(),
        )
        .unwrap();
        let units = engine.units();
        assert_eq!(units.len(), 4);
        assert_eq!(units[1].plan().id, "ulo");
        assert_eq!(units[1].battery().id, "b");
        assert_eq!(units[2].plan().id, "tou");
    }

    #[test]
    fn rejects_invalid_inputs() {
        let plan = presets::flat(0.1);
        let profile = UsageProfileGenerator::default()
            .generate(9_000.0, &plan, 2025, true)
            .unwrap();

        let dup = ComparisonEngine::new(
            profile.clone(),
            vec![plan.clone()],
            vec![battery("a", 10.0, 1.0), battery("a", 5.0, 1.0)],
            DispatchPolicy::default(),
            FinanceSettings::default(),
        );
        assert!(matches!(dup, Err(EngineError::InvalidBattery { .. })));

        let no_plan = ComparisonEngine::new(
            profile.clone(),
            Vec::new(),
            vec![battery("a", 10.0, 1.0)],
            DispatchPolicy::default(),
            FinanceSettings::default(),
        );
        assert!(no_plan.is_err());

        let mut broken = plan.clone();
        broken.periods.clear();
        let bad_plan = ComparisonEngine::new(
            profile,
            vec![broken],
            vec![battery("a", 10.0, 1.0)],
            DispatchPolicy::default(),
            FinanceSettings::default(),
        );
        assert!(bad_plan.is_err());
    }

    #[test]
    fn sorting_puts_na_last() {
        let engine = engine(vec![
            battery("none", 0.0, 0.0),
            battery("big", 30.0, 40_000.0),
            battery("small", 10.0, 5_000.0),
        ]);
        let mut results = engine.run().unwrap();

        sort_by_payback(&mut results);
        assert_eq!(results.last().unwrap().battery().id, "none");
        assert_eq!(results[0].battery().id, "small");

        sort_by_savings_per_dollar(&mut results);
        assert_eq!(results[0].battery().id, "small");
        assert_eq!(results.last().unwrap().battery().id, "none");

        sort_by_net_profit(&mut results);
        for pair in results.windows(2) {
            assert!(pair[0].projection().net_profit() >= pair[1].projection().net_profit());
        }
    }

    #[test]
    fn dispatch_is_kept_on_request() {
        let engine = engine(vec![battery("a", 10.0, 9_000.0)]);
        let detailed = engine.run_with_dispatch().unwrap();
        assert_eq!(detailed.len(), 1);
        assert_eq!(detailed[0].dispatch.steps.len(), 8760);
        assert_eq!(detailed[0].dispatch.battery_id, "a");
        assert_eq!(
            detailed[0].comparison,
            engine.run().unwrap().into_iter().next().unwrap()
        );
    }

    #[test]
    fn recommendation_display() {
        assert_eq!(Recommendation::CostEffective.to_string(), "cost-effective");
        assert!(
            Recommendation::NotCostEffective
                .to_string()
                .starts_with("not cost-effective")
        );
    }
}
