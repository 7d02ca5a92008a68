use crate::crs::{reproject, Crs, Transformer};
use crate::error::PipelineError;
use crate::types::DemoTable;
use geo::{Centroid, Coord};
use tracing::info;

/// Map centre as `(lat, lon)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Mean of the unit centroids taken in the equal-area projection, converted
/// back to geographic coordinates.
pub fn map_center(table: &DemoTable) -> Result<MapCenter, PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::EmptyTable("the demo table".to_string()));
    }

    let mut sum = Coord { x: 0.0, y: 0.0 };
    let mut n = 0usize;

    for row in &table.rows {
        let projected = reproject(&row.geometry, table.crs, Crs::EQUAL_AREA);
        if let Some(c) = projected.centroid() {
            sum.x += c.x();
            sum.y += c.y();
            n += 1;
        }
    }

    if n == 0 {
        return Err(PipelineError::EmptyTable("geometry for the map centre".to_string()));
    }

    let mean = Coord {
        x: sum.x / n as f64,
        y: sum.y / n as f64,
    };
    let geographic = Transformer::new(Crs::EQUAL_AREA, Crs::WGS84).convert(mean);
    let center = MapCenter {
        lat: geographic.y,
        lon: geographic.x,
    };
    info!("Map centre from {} units: {:.6}, {:.6}", n, center.lat, center.lon);
    Ok(center)
}
