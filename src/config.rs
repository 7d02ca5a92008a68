use crate::types::Metric;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "default_maps")]
    pub maps: Vec<MapConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boroughs: BoroughSource,
    pub neighborhoods: NeighborhoodSource,
    pub neighborhood_ids: LookupSource,
    pub population: IndicatorSource,
    pub migration: IndicatorSource,
    pub residency: IndicatorSource,
    pub foreign: IndicatorSource,
}

/// Borough outlines (`lor_bezirke`).
#[derive(Debug, Deserialize, Clone)]
pub struct BoroughSource {
    pub path: PathBuf,
    #[serde(default = "default_borough_id")]
    pub id_column: String,
    #[serde(default = "default_borough_name")]
    pub name_column: String,
    /// Overrides the CRS read from the `.prj` sidecar or GeoJSON `crs` member.
    pub crs: Option<String>,
}

/// Planning-area outlines (`lor_planungsraeume`).
#[derive(Debug, Deserialize, Clone)]
pub struct NeighborhoodSource {
    pub path: PathBuf,
    #[serde(default = "default_neighborhood_name")]
    pub name_column: String,
    pub crs: Option<String>,
}

/// Neighborhood name to planning-area id table.
#[derive(Debug, Deserialize, Clone)]
pub struct LookupSource {
    pub path: PathBuf,
    #[serde(default = "default_lookup_id")]
    pub id_column: String,
    #[serde(default = "default_lookup_name")]
    pub name_column: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// One count column of a statistics matrix keyed by `RAUMID`.
#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorSource {
    pub path: PathBuf,
    #[serde(default = "default_raumid")]
    pub id_column: String,
    pub value_column: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Joined table without geometry, written next to the maps.
    pub table_csv: Option<PathBuf>,
    #[serde(default = "default_zoom_start")]
    pub zoom_start: u8,
    #[serde(default = "default_tile_opacity")]
    pub tile_opacity: f64,
    #[serde(default = "default_preview_width")]
    pub preview_width: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: default_output_dir(),
            table_csv: None,
            zoom_start: default_zoom_start(),
            tile_opacity: default_tile_opacity(),
            preview_width: default_preview_width(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    pub metric: Metric,
    pub file: PathBuf,
    pub legend: String,
    /// Tooltip label shown before the metric value.
    pub alias: String,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration: {:?}", path))?;
        Ok(config)
    }
}

fn default_borough_id() -> String {
    "Schluessel".to_string()
}

fn default_borough_name() -> String {
    "Gemeinde_n".to_string()
}

fn default_neighborhood_name() -> String {
    "PLANUNGSRA".to_string()
}

fn default_lookup_id() -> String {
    "id".to_string()
}

fn default_lookup_name() -> String {
    "neighborhood".to_string()
}

fn default_raumid() -> String {
    "RAUMID".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_zoom_start() -> u8 {
    10
}

fn default_tile_opacity() -> f64 {
    0.4
}

fn default_preview_width() -> u32 {
    800
}

fn default_maps() -> Vec<MapConfig> {
    vec![
        MapConfig {
            metric: Metric::MigrationBackground,
            file: PathBuf::from("migration_background.html"),
            legend: "Population with migration background in %".to_string(),
            alias: "Migration Background in %:".to_string(),
        },
        MapConfig {
            metric: Metric::LongTermResidency,
            file: PathBuf::from("residency_10_years.html"),
            legend: "Population residing at the same address for 10 or more years in %"
                .to_string(),
            alias: "Residing for >=10 Years in %:".to_string(),
        },
    ]
}
