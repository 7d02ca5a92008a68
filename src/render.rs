use crate::centroid::MapCenter;
use crate::classify::ColorScale;
use crate::config::{AppConfig, MapConfig};
use crate::types::{Borough, DemoTable};
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const TEMPLATE: &str = include_str!("map_template.html");

/// Writes one HTML document per configured map into the output directory.
pub fn write_maps(
    config: &AppConfig,
    table: &DemoTable,
    boroughs: &[Borough],
    center: MapCenter,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output.dir))?;

    let borough_layer = borough_geojson(boroughs);
    let mut written = Vec::with_capacity(config.maps.len());

    for map in &config.maps {
        let values = table.values(map.metric);
        let scale = ColorScale::quantile_ylgnbu(map.metric.column(), &values)?;
        info!("{}: breakpoints {:?}", map.metric, scale.breaks);

        let html = render_map(config, map, table, &borough_layer, &scale, center);
        let path = config.output.dir.join(&map.file);
        fs::write(&path, html).with_context(|| format!("Failed to write map: {:?}", path))?;
        info!("Wrote {:?}", path);
        written.push(path);
    }

    Ok(written)
}

pub fn render_map(
    config: &AppConfig,
    map: &MapConfig,
    table: &DemoTable,
    borough_layer: &GeoJson,
    scale: &ColorScale,
    center: MapCenter,
) -> String {
    let units = unit_geojson(table, map, scale);
    let legend = json!({
        "title": map.legend,
        "colors": scale.colors,
        "breaks": scale.breaks,
    });

    fill_template(
        TEMPLATE,
        &[
            ("__TITLE__", escape_html(&map.legend)),
            ("__LAT__", center.lat.to_string()),
            ("__LON__", center.lon.to_string()),
            ("__ZOOM__", config.output.zoom_start.to_string()),
            ("__TILE_OPACITY__", config.output.tile_opacity.to_string()),
            ("__LAYER_NAME__", script_json(&json!(map.legend))),
            ("__LEGEND__", script_json(&legend)),
            ("__BOROUGHS__", script_safe(&borough_layer.to_string())),
            ("__UNITS__", script_safe(&units.to_string())),
        ],
    )
}

/// Substitutes every placeholder in one pass; inserted text is never rescanned.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find("__") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('_');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn borough_geojson(boroughs: &[Borough]) -> GeoJson {
    let features = boroughs.iter().map(|b| {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&b.geometry))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("id", b.id);
        feature.set_property("borough", b.borough.clone());
        feature
    });
    GeoJson::from(features.collect::<FeatureCollection>())
}

fn unit_geojson(table: &DemoTable, map: &MapConfig, scale: &ColorScale) -> GeoJson {
    let features = table.rows.iter().map(|row| {
        let value = row.metric(map.metric);
        let shown = value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}", v));
        let tooltip = format!(
            "<table><tr><th>Neighborhood:</th><td>{}</td></tr><tr><th>{}</th><td>{}</td></tr></table>",
            escape_html(&row.neighborhood),
            escape_html(&map.alias),
            shown
        );

        let mut feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&row.geometry))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("id", row.id);
        feature.set_property("neighborhood", row.neighborhood.clone());
        feature.set_property("population", row.population);
        feature.set_property(map.metric.column(), value);
        feature.set_property("fill", scale.color(value));
        feature.set_property("tooltip", tooltip);
        feature
    });
    GeoJson::from(features.collect::<FeatureCollection>())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON embedded in a `<script>` block must not contain `</`.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn script_json(value: &serde_json::Value) -> String {
    script_safe(&value.to_string())
}
