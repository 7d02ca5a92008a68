//! Column selection, renaming and typed parsing of the loaded tables.

use crate::crs::{reproject, Crs};
use crate::data::{DelimitedTable, GeometryTable};
use crate::error::PipelineError;
use crate::types::{Borough, Count, NeighborhoodId, NeighborhoodShape};

/// Parses a join key. Leading zeros are fine (`01011101`), as is the `.0`
/// that numeric dBase fields carry.
pub fn parse_id(raw: &str, dataset: &str, column: &str, row: usize) -> Result<i64, PipelineError> {
    strip_zero_fraction(raw.trim())
        .parse::<i64>()
        .map_err(|_| PipelineError::InvalidId {
            dataset: dataset.to_string(),
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
}

pub fn parse_count(
    raw: &str,
    dataset: &str,
    column: &str,
    row: usize,
) -> Result<u64, PipelineError> {
    strip_zero_fraction(raw.trim())
        .parse::<u64>()
        .map_err(|_| PipelineError::InvalidCount {
            dataset: dataset.to_string(),
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
}

fn strip_zero_fraction(s: &str) -> &str {
    match s.split_once('.') {
        Some((int, frac)) if !int.is_empty() && !frac.is_empty() && frac.bytes().all(|b| b == b'0') => {
            int
        }
        _ => s,
    }
}

/// `Schluessel, Gemeinde_n, geometry` → `id, borough, geometry`, in WGS84, sorted by id.
pub fn normalize_boroughs(
    table: GeometryTable,
    id_column: &str,
    name_column: &str,
) -> Result<Vec<Borough>, PipelineError> {
    let crs = table.crs;
    let mut boroughs = table
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| -> Result<Borough, PipelineError> {
            let raw_id = feature.attributes.get(id_column).map(String::as_str).unwrap_or("");
            Ok(Borough {
                id: parse_id(raw_id, &table.name, id_column, index + 1)?,
                borough: feature.attributes.get(name_column).cloned().unwrap_or_default(),
                geometry: reproject(&feature.geometry, crs, Crs::WGS84),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    boroughs.sort_by_key(|b| b.id);
    Ok(boroughs)
}

/// `PLANUNGSRA, geometry` → `neighborhood, geometry`, in WGS84, sorted by name.
pub fn normalize_neighborhoods(
    table: GeometryTable,
    name_column: &str,
) -> Result<Vec<NeighborhoodShape>, PipelineError> {
    let crs = table.crs;
    let mut shapes = Vec::with_capacity(table.features.len());
    for (index, feature) in table.features.into_iter().enumerate() {
        let neighborhood = feature
            .attributes
            .get(name_column)
            .filter(|name| !name.is_empty())
            .cloned()
            .ok_or_else(|| PipelineError::MissingName {
                dataset: table.name.clone(),
                column: name_column.to_string(),
                row: index + 1,
            })?;
        shapes.push(NeighborhoodShape {
            neighborhood,
            geometry: reproject(&feature.geometry, crs, Crs::WGS84),
        });
    }

    shapes.sort_by(|a, b| a.neighborhood.cmp(&b.neighborhood));
    Ok(shapes)
}

/// The `neighborhood;id` lookup, sorted by id.
pub fn normalize_lookup(
    table: &DelimitedTable,
    id_column: &str,
    name_column: &str,
) -> Result<Vec<NeighborhoodId>, PipelineError> {
    let id_idx = table.column_index(id_column)?;
    let name_idx = table.column_index(name_column)?;

    let mut lookup = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<NeighborhoodId, PipelineError> {
            Ok(NeighborhoodId {
                neighborhood: record.get(name_idx).unwrap_or("").to_string(),
                id: parse_id(record.get(id_idx).unwrap_or(""), &table.name, id_column, index + 1)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    lookup.sort_by_key(|entry| entry.id);
    Ok(lookup)
}

/// `RAUMID, <value_column>` → `(id, count)`, sorted by id.
pub fn normalize_counts(
    table: &DelimitedTable,
    id_column: &str,
    value_column: &str,
) -> Result<Vec<Count>, PipelineError> {
    let id_idx = table.column_index(id_column)?;
    let value_idx = table.column_index(value_column)?;

    let mut counts = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, record)| -> Result<Count, PipelineError> {
            let row = index + 1;
            Ok(Count {
                id: parse_id(record.get(id_idx).unwrap_or(""), &table.name, id_column, row)?,
                value: parse_count(
                    record.get(value_idx).unwrap_or(""),
                    &table.name,
                    value_column,
                    row,
                )?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    counts.sort_by_key(|c| c.id);
    Ok(counts)
}
