use crate::crs::Crs;
use crate::error::PipelineError;
use crate::metrics;
use crate::types::{
    Count, DemoRow, DemoTable, DemographicRecord, NeighborhoodId, NeighborhoodShape, SpatialUnit,
};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, info};

/// Inner join requiring every key to be unique on both sides.
///
/// Rows without a partner are dropped; the result is ordered by key.
pub fn inner_join_unique<K, L, R, O>(
    step: &str,
    left: Vec<L>,
    right: Vec<R>,
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
    combine: impl Fn(L, R) -> O,
) -> Result<Vec<O>, PipelineError>
where
    K: Ord + Display,
{
    let left_len = left.len();
    let right_len = right.len();
    let left = index_unique(step, "left", left, left_key)?;
    let mut right = index_unique(step, "right", right, right_key)?;

    let mut joined = Vec::with_capacity(left.len().min(right.len()));
    for (key, l) in left {
        match right.remove(&key) {
            Some(r) => joined.push(combine(l, r)),
            None => debug!("{}: key {} has no match on the right", step, key),
        }
    }
    for key in right.keys() {
        debug!("{}: key {} has no match on the left", step, key);
    }

    info!("{}: {} x {} rows -> {}", step, left_len, right_len, joined.len());
    Ok(joined)
}

fn index_unique<K, T>(
    step: &str,
    side: &str,
    rows: Vec<T>,
    key: impl Fn(&T) -> K,
) -> Result<BTreeMap<K, T>, PipelineError>
where
    K: Ord + Display,
{
    let mut index = BTreeMap::new();
    for row in rows {
        let k = key(&row);
        if index.contains_key(&k) {
            return Err(PipelineError::DuplicateKey {
                step: step.to_string(),
                side: side.to_string(),
                key: k.to_string(),
            });
        }
        index.insert(k, row);
    }
    Ok(index)
}

/// Planning-area polygons ⨝ name→id lookup, on the neighborhood name.
pub fn join_units(
    shapes: Vec<NeighborhoodShape>,
    lookup: Vec<NeighborhoodId>,
) -> Result<Vec<SpatialUnit>, PipelineError> {
    let mut units = inner_join_unique(
        "neighborhoods ⨝ neighborhood_ids",
        shapes,
        lookup,
        |s| s.neighborhood.clone(),
        |l| l.neighborhood.clone(),
        |s, l| SpatialUnit {
            id: l.id,
            neighborhood: s.neighborhood,
            geometry: s.geometry,
        },
    )?;
    units.sort_by_key(|u| u.id);
    Ok(units)
}

/// population ⨝ migration ⨝ residency ⨝ foreign, on id.
pub fn join_demographics(
    population: Vec<Count>,
    migration: Vec<Count>,
    residency: Vec<Count>,
    foreign: Vec<Count>,
) -> Result<Vec<DemographicRecord>, PipelineError> {
    let records = inner_join_unique(
        "population ⨝ migration",
        population,
        migration,
        |c| c.id,
        |c| c.id,
        |p, m| DemographicRecord {
            id: p.id,
            population: p.value,
            migrbg: m.value,
            res10yrs: 0,
            foreign: 0,
        },
    )?;
    let records = inner_join_unique(
        "… ⨝ residency",
        records,
        residency,
        |r| r.id,
        |c| c.id,
        |r, c| DemographicRecord { res10yrs: c.value, ..r },
    )?;
    inner_join_unique(
        "… ⨝ foreign",
        records,
        foreign,
        |r| r.id,
        |c| c.id,
        |r, c| DemographicRecord { foreign: c.value, ..r },
    )
}

/// Spatial units ⨝ demographics, with the derived percentages filled in.
pub fn build_demo_table(
    units: Vec<SpatialUnit>,
    demographics: Vec<DemographicRecord>,
) -> Result<DemoTable, PipelineError> {
    let mut rows = inner_join_unique(
        "units ⨝ demographics",
        units,
        demographics,
        |u| u.id,
        |d| d.id,
        |u, d| DemoRow {
            id: u.id,
            population: d.population,
            metrics: metrics::derive(&d),
            neighborhood: u.neighborhood,
            geometry: u.geometry,
        },
    )?;
    rows.sort_by_key(|row| row.id);

    if rows.is_empty() {
        return Err(PipelineError::EmptyTable("the joined demo table".to_string()));
    }
    Ok(DemoTable {
        crs: Crs::WGS84,
        rows,
    })
}
