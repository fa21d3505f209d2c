//! Per-unit dispatch extracted from a solved scenario.

use std::io::Write;

use anyhow::Result;
use gridlp_core::{ColumnRange, UnitModel, WeightedColumn};
use gridlp_solver::Solution;
use serde::Serialize;
use tabwriter::TabWriter;

use crate::scenario::ScenarioModel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRow {
    pub stage: usize,
    pub group: String,
    pub unit: String,
    pub kind: &'static str,
    pub real_power: f64,
    pub positive_capacity: f64,
    pub negative_capacity: f64,
    pub stored_energy: Option<f64>,
}

/// One row per unit occurrence, in column order.
pub fn dispatch_rows(model: &ScenarioModel, solution: &Solution) -> Vec<DispatchRow> {
    let mut rows = Vec::new();
    for (stage, cluster) in model.series.stages().iter().enumerate() {
        let Some(stage_range) = model.series.stage_columns(stage) else {
            continue;
        };
        for (g, group) in cluster.groups().iter().enumerate() {
            let Some(group_range) = cluster.layout().range(g) else {
                continue;
            };
            for (u, unit) in group.units().iter().enumerate() {
                let Some(unit_range) = group.layout().range(u) else {
                    continue;
                };
                let ranges = [unit_range, group_range, stage_range];
                let quantity = |terms: Vec<WeightedColumn>| {
                    solution.weighted_sum(&to_global(&ranges, terms))
                };
                rows.push(DispatchRow {
                    stage,
                    group: model.group_ids.get(g).cloned().unwrap_or_default(),
                    unit: model
                        .unit_id(unit.pid())
                        .map(str::to_string)
                        .unwrap_or_else(|| unit.pid().to_string()),
                    kind: unit.kind(),
                    real_power: quantity(unit.real_power_terms()),
                    positive_capacity: quantity(unit.positive_capacity_terms()),
                    negative_capacity: quantity(unit.negative_capacity_terms()),
                    stored_energy: unit
                        .as_storage()
                        .map(|storage| quantity(storage.stored_energy_terms())),
                });
            }
        }
    }
    rows
}

fn to_global(ranges: &[ColumnRange], terms: Vec<WeightedColumn>) -> Vec<WeightedColumn> {
    ranges
        .iter()
        .fold(terms, |terms, range| range.relocate(terms))
}

pub fn write_dispatch_table<W: Write>(writer: W, rows: &[DispatchRow]) -> Result<()> {
    let mut writer = TabWriter::new(writer);
    writeln!(
        writer,
        "STAGE\tGROUP\tUNIT\tKIND\tPOWER\tPOS CAPACITY\tNEG CAPACITY\tENERGY"
    )?;
    for row in rows {
        let energy = row
            .stored_energy
            .map(|e| format!("{e:.4}"))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{}",
            row.stage,
            row.group,
            row.unit,
            row.kind,
            row.real_power,
            row.positive_capacity,
            row.negative_capacity,
            energy,
        )?;
    }
    writer.flush()?;
    Ok(())
}
