use crate::config::{AppConfig, IndicatorSource};
use crate::data;
use crate::join;
use crate::schema;
use crate::types::{Borough, Count, DemoTable};
use anyhow::{Context, Result};
use tracing::info;

/// Everything the renderers need: the joined table plus the borough outlines.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub table: DemoTable,
    pub boroughs: Vec<Borough>,
}

/// Load, normalize and join all configured datasets.
pub fn prepare(config: &AppConfig) -> Result<Prepared> {
    info!("Loading data...");
    let input = &config.input;

    let boroughs = {
        let src = &input.boroughs;
        let table = data::load_geometry(
            "boroughs",
            &src.path,
            &[src.id_column.as_str(), src.name_column.as_str()],
            src.crs.as_deref(),
        )?;
        schema::normalize_boroughs(table, &src.id_column, &src.name_column)
            .context("Failed to normalize boroughs")?
    };

    let shapes = {
        let src = &input.neighborhoods;
        let table = data::load_geometry(
            "neighborhoods",
            &src.path,
            &[src.name_column.as_str()],
            src.crs.as_deref(),
        )?;
        schema::normalize_neighborhoods(table, &src.name_column)
            .context("Failed to normalize neighborhoods")?
    };

    let lookup = {
        let src = &input.neighborhood_ids;
        let table = data::load_delimited("neighborhood_ids", &src.path, src.delimiter)?;
        schema::normalize_lookup(&table, &src.id_column, &src.name_column)
            .context("Failed to normalize neighborhood ids")?
    };

    let population = load_counts("population", &input.population)?;
    let migration = load_counts("migration", &input.migration)?;
    let residency = load_counts("residency", &input.residency)?;
    let foreign = load_counts("foreign", &input.foreign)?;

    let units = join::join_units(shapes, lookup)?;
    let demographics = join::join_demographics(population, migration, residency, foreign)?;
    let table = join::build_demo_table(units, demographics)?;

    info!(
        "Demo table: {} spatial units, {} boroughs",
        table.len(),
        boroughs.len()
    );

    Ok(Prepared { table, boroughs })
}

fn load_counts(name: &str, src: &IndicatorSource) -> Result<Vec<Count>> {
    let table = data::load_delimited(name, &src.path, src.delimiter)?;
    let counts = schema::normalize_counts(&table, &src.id_column, &src.value_column)
        .with_context(|| format!("Failed to normalize {} ({:?})", name, table.path))?;
    Ok(counts)
}
