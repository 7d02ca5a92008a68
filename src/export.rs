use crate::types::DemoTable;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct TableRow<'a> {
    id: i64,
    population: u64,
    migrbg_perc: Option<f64>,
    res10yrs_perc: Option<f64>,
    foreign_perc: Option<f64>,
    neighborhood: &'a str,
}

/// Writes the demo table without geometry; undefined percentages stay empty.
pub fn write_table_csv(table: &DemoTable, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to create table CSV: {:?}", path))?;

    for row in &table.rows {
        writer.serialize(TableRow {
            id: row.id,
            population: row.population,
            migrbg_perc: row.metrics.migrbg_perc,
            res10yrs_perc: row.metrics.res10yrs_perc,
            foreign_perc: row.metrics.foreign_perc,
            neighborhood: &row.neighborhood,
        })?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write table CSV: {:?}", path))?;

    info!("Wrote {} rows to {:?}", table.len(), path);
    Ok(())
}
