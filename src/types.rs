use crate::crs::Crs;
use geo::MultiPolygon;
use serde::Deserialize;
use std::fmt;

/// Borough outline, drawn as context only.
#[derive(Debug, Clone)]
pub struct Borough {
    pub id: i64,
    pub borough: String,
    pub geometry: MultiPolygon<f64>,
}

/// Planning-area polygon before it has been matched to an id.
#[derive(Debug, Clone)]
pub struct NeighborhoodShape {
    pub neighborhood: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborhoodId {
    pub neighborhood: String,
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct SpatialUnit {
    pub id: i64,
    pub neighborhood: String,
    pub geometry: MultiPolygon<f64>,
}

/// A single `(id, count)` pair out of one statistics matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub id: i64,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemographicRecord {
    pub id: i64,
    pub population: u64,
    pub migrbg: u64,
    pub res10yrs: u64,
    pub foreign: u64,
}

/// Percentages derived from a [`DemographicRecord`]; `None` where the population is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    pub migrbg_perc: Option<f64>,
    pub res10yrs_perc: Option<f64>,
    pub foreign_perc: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DemoRow {
    pub id: i64,
    pub population: u64,
    pub metrics: DerivedMetrics,
    pub neighborhood: String,
    pub geometry: MultiPolygon<f64>,
}

impl DemoRow {
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::MigrationBackground => self.metrics.migrbg_perc,
            Metric::LongTermResidency => self.metrics.res10yrs_perc,
            Metric::Foreign => self.metrics.foreign_perc,
        }
    }
}

/// The joined table, one row per planning area, ascending by id.
#[derive(Debug, Clone)]
pub struct DemoTable {
    pub crs: Crs,
    pub rows: Vec<DemoRow>,
}

impl DemoTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.metric(metric)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Metric {
    #[serde(rename = "migrbg_perc")]
    MigrationBackground,
    #[serde(rename = "res10yrs_perc")]
    LongTermResidency,
    #[serde(rename = "foreign_perc")]
    Foreign,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::MigrationBackground,
        Metric::LongTermResidency,
        Metric::Foreign,
    ];

    /// Column name in the demo table and GeoJSON property name.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::MigrationBackground => "migrbg_perc",
            Metric::LongTermResidency => "res10yrs_perc",
            Metric::Foreign => "foreign_perc",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}
