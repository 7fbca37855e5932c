use crate::config::{AppConfig, FilterConfig};
use crate::error::{PipelineError, Result};
use crate::types::{BallotCounts, BallotRecord, Department, Region, RegionGeometry};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// The three tabular sources, as read from the data directory.
#[derive(Debug, Clone)]
pub struct Tables {
    pub referendum: Vec<BallotRecord>,
    pub regions: Vec<Region>,
    pub departments: Vec<Department>,
}

#[derive(Debug, Deserialize)]
struct BallotRow {
    #[serde(rename = "Department code")]
    department_code: String,
    #[serde(rename = "Registered")]
    registered: u64,
    #[serde(rename = "Abstentions")]
    abstentions: u64,
    #[serde(rename = "Null")]
    null: u64,
    #[serde(rename = "Choice A")]
    choice_a: u64,
    #[serde(rename = "Choice B")]
    choice_b: u64,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    code: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DepartmentRow {
    code: String,
    name: String,
    region_code: String,
}

pub fn load_data(config: &AppConfig) -> Result<Tables> {
    let input = &config.input;
    info!(data_dir = ?input.data_dir, "Loading data...");

    let referendum = load_referendum(
        &input.referendum_path(),
        input.referendum_delimiter,
        &config.filter,
    )?;
    let regions = load_regions(&input.regions_path(), input.regions_delimiter)?;
    let departments = load_departments(
        &input.departments_path(),
        input.departments_delimiter,
    )?;

    info!(
        ballots = referendum.len(),
        regions = regions.len(),
        departments = departments.len(),
        "Loaded tabular sources"
    );

    Ok(Tables {
        referendum,
        regions,
        departments,
    })
}

pub fn load_referendum(
    path: &Path,
    delimiter: u8,
    filter: &FilterConfig,
) -> Result<Vec<BallotRecord>> {
    let rows: Vec<BallotRow> = read_csv(path, delimiter)?;
    Ok(rows
        .into_iter()
        .map(|row| BallotRecord {
            department_code: pad_code(row.department_code.trim(), filter.department_code_width),
            counts: BallotCounts {
                registered: row.registered,
                abstentions: row.abstentions,
                null: row.null,
                choice_a: row.choice_a,
                choice_b: row.choice_b,
            },
        })
        .collect())
}

pub fn load_regions(path: &Path, delimiter: u8) -> Result<Vec<Region>> {
    let rows: Vec<RegionRow> = read_csv(path, delimiter)?;
    Ok(rows
        .into_iter()
        .map(|row| Region {
            code: row.code,
            name: row.name,
        })
        .collect())
}

pub fn load_departments(path: &Path, delimiter: u8) -> Result<Vec<Department>> {
    let rows: Vec<DepartmentRow> = read_csv(path, delimiter)?;
    Ok(rows
        .into_iter()
        .map(|row| Department {
            code: row.code,
            name: row.name,
            region_code: row.region_code,
        })
        .collect())
}

// Codes are deserialized as strings so "01" and "2A" survive untouched;
// extra columns in the source are ignored.
fn read_csv<T: DeserializeOwned>(path: &Path, delimiter: u8) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.map_err(|e| PipelineError::csv(path, e))?;
        rows.push(row);
    }
    debug!(path = ?path, rows = rows.len(), "Read CSV");
    Ok(rows)
}

/// Left-pads a department code with zeros ("1" -> "01").
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{:0>width$}", code, width = width)
}

pub fn load_geometries(config: &AppConfig) -> Result<Vec<RegionGeometry>> {
    let path = config.input.geometry_path();
    let property = &config.input.geometry_code_property;

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| PipelineError::UnsupportedGeometryFormat { path: path.clone() })?;

    let geometries = match extension.as_str() {
        "shp" => load_shapefile(&path, property)?,
        "json" | "geojson" => load_geojson(&path, property)?,
        _ => return Err(PipelineError::UnsupportedGeometryFormat { path }),
    };

    info!("Loaded geometry for {} regions", geometries.len());
    Ok(geometries)
}

fn load_geojson(path: &Path, property: &str) -> Result<Vec<RegionGeometry>> {
    use geojson::GeoJson;

    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).map_err(|e| PipelineError::GeoJson {
        path: path.to_path_buf(),
        source: geojson::Error::MalformedJson(e),
    })?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(PipelineError::Geometry {
                path: path.to_path_buf(),
                message: "GeoJSON must be a FeatureCollection".to_string(),
            })
        }
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let code = match feature.properties.as_ref().and_then(|props| props.get(property)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                warn!(property, "Skipping feature without a region code");
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let value: geo::Geometry<f64> =
                    geom.value.try_into().map_err(|e| PipelineError::Geometry {
                        path: path.to_path_buf(),
                        message: format!("region {}: {:?}", code, e),
                    })?;

                match value {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!(code = %code, "Skipping non-areal geometry");
                        continue;
                    }
                }
            }
            None => continue,
        };

        regions.push(RegionGeometry { code, geometry });
    }

    Ok(regions)
}

fn load_shapefile(path: &Path, field: &str) -> Result<Vec<RegionGeometry>> {
    use shapefile::dbase::FieldValue;
    use shapefile::Shape;

    let shape_err = |e: shapefile::Error| match e {
        shapefile::Error::IoError(io) => PipelineError::io(path, io),
        shapefile::Error::MissingDbf => PipelineError::FileNotFound {
            path: path.with_extension("dbf"),
        },
        other => PipelineError::Geometry {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    };

    let mut reader = shapefile::Reader::from_path(path).map_err(shape_err)?;
    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(shape_err)?;

        let code = match record.get(field) {
            Some(FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(FieldValue::Numeric(Some(n))) => n.to_string(),
            _ => continue,
        };

        let invalid = |e: &dyn std::fmt::Debug| PipelineError::Geometry {
            path: path.to_path_buf(),
            message: format!("region {}: {:?}", code, e),
        };
        let geometry: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon.try_into().map_err(|e| invalid(&e))?,
            Shape::PolygonM(polygon) => polygon.try_into().map_err(|e| invalid(&e))?,
            Shape::PolygonZ(polygon) => polygon.try_into().map_err(|e| invalid(&e))?,
            _ => continue, // Skip non-polygon shapes
        };

        regions.push(RegionGeometry { code, geometry });
    }

    Ok(regions)
}
