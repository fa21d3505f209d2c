use anyhow::{anyhow, bail, Context, Result};
use gridlp_core::{
    BasicCosts, BasicLimits, BasicUnit, Cluster, CriticalPoint, FlowBounds, Formulation, Group,
    Pid, PiecewiseUnit, Row, Series, StorageUnit, Unit, UnitModel,
};
use gridlp_solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub solver: Option<SolverConfig>,
    #[serde(default)]
    pub units: Vec<UnitSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    /// Units tied across exactly two groups.
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub horizon: HorizonSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: String,
    #[serde(flatten)]
    pub model: UnitKindSpec,
    /// Add the unit's headroom rows (power within reserved capacity).
    #[serde(default)]
    pub capacity_constraints: bool,
    pub setpoint: Option<Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitKindSpec {
    Basic {
        costs: BasicCosts,
        limits: BasicLimits,
    },
    Piecewise {
        points: Vec<CriticalPoint>,
        positive_capacity: CriticalPoint,
        negative_capacity: CriticalPoint,
        #[serde(default)]
        flow_bounds: FlowBounds,
    },
    Storage {
        points: Vec<CriticalPoint>,
        positive_capacity: CriticalPoint,
        negative_capacity: CriticalPoint,
        energy_capacity: f64,
        #[serde(default)]
        flow_bounds: FlowBounds,
    },
}

impl UnitKindSpec {
    pub fn name(&self) -> &'static str {
        match self {
            UnitKindSpec::Basic { .. } => "basic",
            UnitKindSpec::Piecewise { .. } => "piecewise",
            UnitKindSpec::Storage { .. } => "storage",
        }
    }

    fn stores_energy(&self) -> bool {
        !matches!(self, UnitKindSpec::Piecewise { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    pub units: Vec<String>,
    pub net_load: Option<Profile>,
    pub positive_reserve: Option<Profile>,
    pub negative_reserve: Option<Profile>,
}

/// A value that is either fixed over the horizon or given per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Constant(f64),
    PerStage(Vec<f64>),
}

impl Profile {
    /// Value at `stage`. Per-stage profiles must have been length-checked.
    pub(crate) fn at(&self, stage: usize) -> f64 {
        match self {
            Profile::Constant(value) => *value,
            Profile::PerStage(values) => values[stage],
        }
    }

    fn check(&self, stages: usize, what: &str) -> Result<()> {
        let values: &[f64] = match self {
            Profile::Constant(value) => std::slice::from_ref(value),
            Profile::PerStage(values) => {
                if values.len() != stages {
                    bail!("{what} has {} values, horizon has {stages} stages", values.len());
                }
                values
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            bail!("{what} must be finite");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonSpec {
    #[serde(default = "default_stages")]
    pub stages: usize,
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    #[serde(default)]
    pub batteries: Vec<BatterySpec>,
}

fn default_stages() -> usize {
    1
}

fn default_time_step() -> f64 {
    1.0
}

impl Default for HorizonSpec {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            time_step: default_time_step(),
            batteries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatterySpec {
    pub unit: String,
    pub initial_energy: f64,
}

/// A composed scenario: one cluster per stage plus the names behind it.
#[derive(Debug, Clone)]
pub struct ScenarioModel {
    pub series: Series<Cluster>,
    pub group_ids: Vec<String>,
    unit_ids: HashMap<Pid, String>,
}

impl ScenarioModel {
    pub fn unit_id(&self, pid: Pid) -> Option<&str> {
        self.unit_ids.get(&pid).map(String::as_str)
    }

    pub fn pid(&self, unit_id: &str) -> Option<Pid> {
        self.unit_ids
            .iter()
            .find(|(_, id)| id.as_str() == unit_id)
            .map(|(pid, _)| *pid)
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario '{}'", path.display()))?;
    parse_scenario(&data).with_context(|| format!("loading scenario '{}'", path.display()))
}

pub fn parse_scenario(data: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(data).context("parsing scenario toml")?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    let horizon = &scenario.horizon;
    if horizon.stages == 0 {
        bail!("horizon must have at least one stage");
    }
    if !(horizon.time_step.is_finite() && horizon.time_step > 0.0) {
        bail!("horizon time_step must be positive, got {}", horizon.time_step);
    }

    let mut kinds = HashMap::new();
    for unit in &scenario.units {
        if unit.id.trim().is_empty() {
            return Err(anyhow!("unit id cannot be empty"));
        }
        if kinds.insert(unit.id.as_str(), &unit.model).is_some() {
            bail!("duplicate unit id '{}'", unit.id);
        }
        if let Some(setpoint) = &unit.setpoint {
            setpoint.check(horizon.stages, &format!("setpoint of unit '{}'", unit.id))?;
        }
    }

    let mut seen = HashSet::new();
    for group in &scenario.groups {
        if !seen.insert(group.id.as_str()) {
            bail!("duplicate group id '{}'", group.id);
        }
        for id in &group.units {
            if !kinds.contains_key(id.as_str()) {
                bail!("group '{}' references unknown unit '{id}'", group.id);
            }
        }
        let profiles = [
            ("net_load", &group.net_load),
            ("positive_reserve", &group.positive_reserve),
            ("negative_reserve", &group.negative_reserve),
        ];
        for (name, profile) in profiles {
            if let Some(profile) = profile {
                profile.check(horizon.stages, &format!("{name} of group '{}'", group.id))?;
            }
        }
    }

    for id in &scenario.links {
        if !kinds.contains_key(id.as_str()) {
            bail!("link references unknown unit '{id}'");
        }
        let (groups, appearances) = placements(scenario, id);
        if (groups, appearances) != (2, 2) {
            bail!(
                "link unit '{id}' must appear once in each of two groups, \
                 found {appearances} appearance(s) in {groups} group(s)"
            );
        }
    }

    for battery in &horizon.batteries {
        match kinds.get(battery.unit.as_str()) {
            None => bail!("battery references unknown unit '{}'", battery.unit),
            Some(model) if !model.stores_energy() => bail!(
                "battery unit '{}' is {} and has no stored-energy column",
                battery.unit,
                model.name()
            ),
            Some(_) => {}
        }
        let (groups, appearances) = placements(scenario, &battery.unit);
        if (groups, appearances) != (1, 1) {
            bail!(
                "battery unit '{}' must appear in exactly one group, \
                 found {appearances} appearance(s) in {groups} group(s)",
                battery.unit
            );
        }
        if !battery.initial_energy.is_finite() {
            bail!("initial_energy of battery '{}' must be finite", battery.unit);
        }
    }
    Ok(())
}

/// Number of groups listing `unit_id`, and its total number of appearances.
fn placements(scenario: &Scenario, unit_id: &str) -> (usize, usize) {
    scenario.groups.iter().fold((0, 0), |(groups, total), group| {
        let count = group.units.iter().filter(|id| *id == unit_id).count();
        (groups + usize::from(count > 0), total + count)
    })
}

/// Compose the scenario into a series of clusters.
///
/// Every stage holds the same groups; per-stage profiles only change the
/// right-hand sides of their rows.
pub fn build_model(scenario: &Scenario) -> Result<ScenarioModel> {
    validate_scenario(scenario)?;
    let units: HashMap<&str, (Pid, &UnitSpec)> = scenario
        .units
        .iter()
        .map(|unit| (unit.id.as_str(), (Pid::new(), unit)))
        .collect();

    let mut stages = Vec::with_capacity(scenario.horizon.stages);
    for stage in 0..scenario.horizon.stages {
        let mut groups = Vec::with_capacity(scenario.groups.len());
        for spec in &scenario.groups {
            let members = spec
                .units
                .iter()
                .map(|id| {
                    let (pid, unit) = lookup(&units, id)?;
                    build_unit(unit, pid, stage)
                })
                .collect::<Result<Vec<Unit>>>()?;
            let mut group = Group::new(members);
            let rows = group_rows(&group, spec, stage);
            group
                .new_constraint(rows)
                .with_context(|| format!("group '{}' at stage {stage}", spec.id))?;
            groups.push(group);
        }

        let mut cluster = Cluster::new(groups);
        let mut links = Vec::new();
        for id in &scenario.links {
            let (pid, _) = lookup(&units, id)?;
            links.extend(cluster.linked_bus_constraints(pid));
        }
        cluster
            .new_constraint(links)
            .with_context(|| format!("linked buses at stage {stage}"))?;
        stages.push(cluster);
    }

    let mut series = Series::new(stages);
    let mut rows = Vec::new();
    for battery in &scenario.horizon.batteries {
        let (pid, _) = lookup(&units, &battery.unit)?;
        rows.extend(series.battery_initial_energy_constraint(pid, battery.initial_energy));
        rows.extend(series.battery_energy_constraint(pid, scenario.horizon.time_step));
    }
    series.new_constraint(rows).context("battery energy rows")?;

    info!(
        stages = series.len(),
        columns = series.column_size(),
        "composed scenario"
    );
    Ok(ScenarioModel {
        series,
        group_ids: scenario.groups.iter().map(|g| g.id.clone()).collect(),
        unit_ids: units
            .into_iter()
            .map(|(id, (pid, _))| (pid, id.to_string()))
            .collect(),
    })
}

fn lookup<'a>(
    units: &HashMap<&str, (Pid, &'a UnitSpec)>,
    id: &str,
) -> Result<(Pid, &'a UnitSpec)> {
    units
        .get(id)
        .copied()
        .ok_or_else(|| anyhow!("unknown unit '{id}'"))
}

fn build_unit(spec: &UnitSpec, pid: Pid, stage: usize) -> Result<Unit> {
    let built = match &spec.model {
        UnitKindSpec::Basic { costs, limits } => {
            BasicUnit::new(pid, *costs, *limits).map(Unit::from)
        }
        UnitKindSpec::Piecewise {
            points,
            positive_capacity,
            negative_capacity,
            flow_bounds,
        } => PiecewiseUnit::new(pid, points.clone(), *positive_capacity, *negative_capacity)
            .map(|unit| Unit::from(unit.with_flow_bounds(*flow_bounds))),
        UnitKindSpec::Storage {
            points,
            positive_capacity,
            negative_capacity,
            energy_capacity,
            flow_bounds,
        } => StorageUnit::new(
            pid,
            points.clone(),
            *positive_capacity,
            *negative_capacity,
            *energy_capacity,
        )
        .map(|unit| Unit::from(unit.with_flow_bounds(*flow_bounds))),
    };
    let mut unit = built.with_context(|| format!("building unit '{}'", spec.id))?;

    let mut rows: Vec<Row> = Vec::new();
    if spec.capacity_constraints {
        rows.extend(unit.capacity_constraints());
    }
    if let Some(setpoint) = &spec.setpoint {
        rows.push(unit.real_power_constraint(setpoint.at(stage)));
    }
    unit.new_constraint(rows)?;
    debug!(unit = %spec.id, kind = unit.kind(), stage, "built unit");
    Ok(unit)
}

fn group_rows(group: &Group, spec: &GroupSpec, stage: usize) -> Vec<Row> {
    let mut rows = Vec::new();
    if let Some(net_load) = &spec.net_load {
        rows.push(group.net_load_constraint(net_load.at(stage)));
    }
    if let Some(reserve) = &spec.positive_reserve {
        rows.push(group.positive_capacity_constraint(reserve.at(stage)));
    }
    if let Some(reserve) = &spec.negative_reserve {
        rows.push(group.negative_capacity_constraint(reserve.at(stage)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_at_reads_constant_and_per_stage() {
        assert_eq!(Profile::Constant(2.5).at(7), 2.5);
        let profile = Profile::PerStage(vec![1.0, -1.0, 3.0]);
        assert_eq!(profile.at(1), -1.0);
        assert_eq!(profile.at(2), 3.0);
    }

    #[test]
    fn test_profile_check_guards_indexing() {
        let profile = Profile::PerStage(vec![1.0, 2.0]);
        assert!(profile.check(2, "net load").is_ok());
        assert!(profile.check(3, "net load").is_err());
        assert!(Profile::Constant(f64::NAN).check(3, "net load").is_err());
    }

    #[test]
    fn test_placements_count_groups_and_appearances() {
        let scenario = parse_scenario(
            r#"
[[units]]
id = "tie"
kind = "basic"
capacity_constraints = false
costs = { positive = 0.0, negative = 0.0, capacity = 0.0, energy = 0.0 }
limits = { positive = 1.0, negative = 1.0, capacity = 1.0, energy = 0.0 }

[[groups]]
id = "a"
units = ["tie"]

[[groups]]
id = "b"
units = ["tie"]
"#,
        )
        .unwrap();
        assert_eq!(placements(&scenario, "tie"), (2, 2));
        assert_eq!(placements(&scenario, "ghost"), (0, 0));
    }
}
