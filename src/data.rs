use crate::crs::Crs;
use crate::error::PipelineError;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use geo::MultiPolygon;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Polygon feature with the requested attribute columns as strings.
#[derive(Debug, Clone)]
pub struct Feature {
    pub attributes: HashMap<String, String>,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct GeometryTable {
    pub name: String,
    pub crs: Crs,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub name: String,
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl DelimitedTable {
    pub fn column_index(&self, column: &str) -> Result<usize, PipelineError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                dataset: self.name.clone(),
                column: column.to_string(),
                available: self.headers.join(", "),
            })
    }
}

/// Reads a Shapefile or GeoJSON polygon layer, keeping only `columns`.
///
/// `crs_override` wins over whatever the file declares.
pub fn load_geometry(
    name: &str,
    path: &Path,
    columns: &[&str],
    crs_override: Option<&str>,
) -> Result<GeometryTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Geometry file for '{}' has no extension: {:?}", name, path))?;

    let (declared, features) = match extension.as_str() {
        "shp" => load_shapefile(name, path, columns)?,
        "json" | "geojson" => load_geojson(name, path, columns)?,
        _ => return Err(anyhow!("Unsupported geometry format for '{}': {}", name, extension)),
    };

    let crs = match crs_override {
        Some(code) => {
            let crs: Crs = code
                .parse()
                .with_context(|| format!("Invalid crs override for '{}'", name))?;
            if let Some(declared) = declared.filter(|d| *d != crs) {
                warn!("{}: overriding declared {} with {}", name, declared, crs);
            }
            crs
        }
        None => declared.ok_or_else(|| PipelineError::MissingCrs(name.to_string()))?,
    };

    info!("Loaded {} features from {:?} ({})", features.len(), path, crs);
    Ok(GeometryTable {
        name: name.to_string(),
        crs,
        features,
    })
}

fn load_shapefile(
    name: &str,
    path: &Path,
    columns: &[&str],
) -> Result<(Option<Crs>, Vec<Feature>)> {
    let prj = path.with_extension("prj");
    let declared = if prj.exists() {
        let wkt = fs::read_to_string(&prj)
            .with_context(|| format!("Failed to read projection file: {:?}", prj))?;
        Some(Crs::from_wkt(&wkt).with_context(|| format!("Unrecognised projection in {:?}", prj))?)
    } else {
        None
    };

    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut features = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) =
            result.with_context(|| format!("Failed to read shape {} of {:?}", index, path))?;

        let mut attributes = HashMap::new();
        for column in columns {
            let value = record.get(column).ok_or_else(|| PipelineError::MissingColumn {
                dataset: name.to_string(),
                column: column.to_string(),
                available: "see the .dbf header".to_string(),
            })?;
            if let Some(text) = field_to_string(value) {
                attributes.insert(column.to_string(), text);
            }
        }

        let geometry = match shape {
            shapefile::Shape::Polygon(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?;
                geo_polygon
            }
            shapefile::Shape::PolygonM(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?;
                geo_polygon
            }
            shapefile::Shape::PolygonZ(polygon) => {
                let geo_polygon: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?;
                geo_polygon
            }
            other => {
                warn!("{}: skipping non-polygon shape {} ({:?})", name, index, other.shapetype());
                continue;
            }
        };

        features.push(Feature { attributes, geometry });
    }

    Ok((declared, features))
}

fn load_geojson(
    name: &str,
    path: &Path,
    columns: &[&str],
) -> Result<(Option<Crs>, Vec<Feature>)> {
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON for '{}' must be a FeatureCollection", name)),
    };

    // Legacy `crs` member; RFC 7946 files are always WGS84.
    let declared = match collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(|name| name.as_str())
    {
        Some(code) => code
            .parse::<Crs>()
            .with_context(|| format!("Unrecognised crs of '{}' in {:?}", name, path))?,
        None => Crs::WGS84,
    };

    let mut features = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let mut attributes = HashMap::new();
        for column in columns {
            let value = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(*column))
                .ok_or_else(|| PipelineError::MissingColumn {
                    dataset: name.to_string(),
                    column: column.to_string(),
                    available: feature
                        .properties
                        .as_ref()
                        .map(|props| props.keys().cloned().collect::<Vec<_>>().join(", "))
                        .unwrap_or_default(),
                })?;
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            attributes.insert(column.to_string(), text);
        }

        let geometry = match feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!("{}: skipping non-polygon feature {}", name, index);
                        continue;
                    }
                }
            }
            None => {
                warn!("{}: skipping feature {} without geometry", name, index);
                continue;
            }
        };

        features.push(Feature { attributes, geometry });
    }

    Ok((Some(declared), features))
}

fn field_to_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(n) => n.map(format_number),
        FieldValue::Float(n) => n.map(|f| format_number(f as f64)),
        FieldValue::Double(n) => Some(format_number(*n)),
        FieldValue::Integer(i) => Some(i.to_string()),
        other => Some(format!("{:?}", other)),
    }
}

/// dBase stores integral keys as floats; print them without the fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub fn load_delimited(name: &str, path: &Path, delimiter: char) -> Result<DelimitedTable> {
    if !delimiter.is_ascii() {
        return Err(anyhow!("Delimiter for '{}' must be ASCII, got {:?}", name, delimiter));
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file for '{}': {:?}", name, path))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(Trim::All)
        .from_reader(file);

    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read CSV header of {:?}", path))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        // Line numbers count the header.
        let record = result
            .with_context(|| format!("Malformed record at line {} of {:?}", index + 2, path))?;
        rows.push(record);
    }

    debug!("{}: columns {:?}", name, headers);
    info!("Loaded {} rows for '{}' from {:?}", rows.len(), name, path);

    Ok(DelimitedTable {
        name: name.to_string(),
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, content: &str) -> PathBuf {
        let path = dir.path().join(file);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_semicolon_separated_tables() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "pop.csv", "\u{feff}RAUMID;BEZ;E_E\n01011101; 1;2300\n01011102;1;4100\n");

        let table = load_delimited("population", &path, ';').unwrap();
        assert_eq!(table.headers, vec!["RAUMID", "BEZ", "E_E"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column_index("E_E").unwrap(), 2);
        assert_eq!(&table.rows[0][1], "1");
        assert_eq!(&table.rows[1][0], "01011102");
    }

    #[test]
    fn missing_column_lists_available_headers() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "pop.csv", "RAUMID;E_E\n1;2\n");
        let table = load_delimited("population", &path, ';').unwrap();

        let err = table.column_index("E_A").unwrap_err().to_string();
        assert!(err.contains("population"));
        assert!(err.contains("E_A"));
        assert!(err.contains("RAUMID, E_E"));
    }

    #[test]
    fn ragged_rows_abort_the_load() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "pop.csv", "RAUMID;E_E\n1;2\n3;4;5\n");
        let err = load_delimited("population", &path, ';').unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_delimited("population", Path::new("nope.csv"), ';').unwrap_err();
        assert!(err.to_string().contains("population"));
    }

    #[test]
    fn reads_geojson_with_legacy_crs_member() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bezirke.geojson",
            r#"{
                "type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::25833"}},
                "features": [
                    {"type": "Feature", "properties": {"Schluessel": "01", "Gemeinde_n": "Mitte"},
                     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                    {"type": "Feature", "properties": {"Schluessel": 2, "Gemeinde_n": "Friedrichshain-Kreuzberg"},
                     "geometry": {"type": "Point", "coordinates": [0,0]}}
                ]
            }"#,
        );

        let table = load_geometry("boroughs", &path, &["Schluessel", "Gemeinde_n"], None).unwrap();
        assert_eq!(table.crs.epsg(), 25833);
        assert_eq!(table.features.len(), 1);
        assert_eq!(table.features[0].attributes["Schluessel"], "01");
        assert_eq!(table.features[0].attributes["Gemeinde_n"], "Mitte");
    }

    #[test]
    fn geojson_defaults_to_wgs84_and_honours_override() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "pr.json",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"PLANUNGSRA": "Stülerstraße"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]]}}
            ]}"#,
        );

        let table = load_geometry("neighborhoods", &path, &["PLANUNGSRA"], None).unwrap();
        assert_eq!(table.crs, Crs::WGS84);

        let table = load_geometry("neighborhoods", &path, &["PLANUNGSRA"], Some("EPSG:3035")).unwrap();
        assert_eq!(table.crs, Crs::Laea);

        let err = load_geometry("neighborhoods", &path, &["NAME"], None).unwrap_err();
        assert!(err.to_string().contains("PLANUNGSRA"));
    }

    #[test]
    fn unknown_geojson_crs_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bezirke.geojson",
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3068"}},
                "features": []}"#,
        );
        let err = format!("{:#}", load_geometry("boroughs", &path, &[], None).unwrap_err());
        assert!(err.contains("boroughs"), "{err}");
        assert!(err.contains("bezirke.geojson"), "{err}");
        assert!(err.contains("EPSG::3068"), "{err}");
    }

    const UTM33_ESRI_PRJ: &str = r#"PROJCS["ETRS_1989_UTM_Zone_33N",GEOGCS["GCS_ETRS_1989",DATUM["D_ETRS_1989",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    /// One square borough with a numeric key and a name, written as `.shp`/`.shx`/`.dbf`.
    fn write_bezirke_shapefile(dir: &TempDir) -> PathBuf {
        use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
        use shapefile::{Point, Polygon, PolygonRing};

        let path = dir.path().join("bezirke.shp");
        let table = TableWriterBuilder::new()
            .add_numeric_field(FieldName::try_from("Schluessel").unwrap(), 10, 0)
            .add_character_field(FieldName::try_from("Gemeinde_n").unwrap(), 50);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

        let square = Polygon::new(PolygonRing::Outer(vec![
            Point::new(390_000.0, 5_818_000.0),
            Point::new(390_000.0, 5_819_000.0),
            Point::new(391_000.0, 5_819_000.0),
            Point::new(391_000.0, 5_818_000.0),
            Point::new(390_000.0, 5_818_000.0),
        ]));
        let mut record = Record::default();
        record.insert("Schluessel".to_string(), FieldValue::Numeric(Some(1.0)));
        record.insert(
            "Gemeinde_n".to_string(),
            FieldValue::Character(Some("Mitte".to_string())),
        );
        writer.write_shape_and_record(&square, &record).unwrap();
        drop(writer);
        path
    }

    #[test]
    fn shapefile_without_prj_needs_a_crs() {
        let dir = TempDir::new().unwrap();
        let path = write_bezirke_shapefile(&dir);

        let err = load_geometry("boroughs", &path, &["Schluessel", "Gemeinde_n"], None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingCrs(name)) if name == "boroughs"
        ));

        let table =
            load_geometry("boroughs", &path, &["Schluessel"], Some("EPSG:25833")).unwrap();
        assert_eq!(table.crs.epsg(), 25833);
    }

    #[test]
    fn reads_shapefile_attributes_and_prj() {
        let dir = TempDir::new().unwrap();
        let path = write_bezirke_shapefile(&dir);
        write(&dir, "bezirke.prj", UTM33_ESRI_PRJ);

        let table = load_geometry("boroughs", &path, &["Schluessel", "Gemeinde_n"], None).unwrap();
        assert_eq!(table.crs.to_string(), "EPSG:25833");
        assert_eq!(table.features.len(), 1);
        let feature = &table.features[0];
        assert_eq!(feature.attributes["Schluessel"], "1");
        assert_eq!(feature.attributes["Gemeinde_n"], "Mitte");
        assert_eq!(feature.geometry.0.len(), 1);
        assert_eq!(feature.geometry.0[0].exterior().0.len(), 5);

        let err = load_geometry("boroughs", &path, &["BEZIRK"], None).unwrap_err();
        assert!(err.to_string().contains("BEZIRK"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_geometry("boroughs", Path::new("bezirke.gpkg"), &[], None).unwrap_err();
        assert!(err.to_string().contains("gpkg"));
    }

    #[test]
    fn integral_dbase_numbers_print_without_fraction() {
        assert_eq!(format_number(1011101.0), "1011101");
        assert_eq!(format_number(2.5), "2.5");
    }
}
