use crate::error::{PipelineError, Result};
use crate::types::{RegionMap, RegionResult};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use image::RgbaImage;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const RESULT_HEADER: [&str; 7] = [
    "code_reg",
    "name_reg",
    "Registered",
    "Abstentions",
    "Null",
    "Choice A",
    "Choice B",
];

/// Writes the per-region table, one row per region in the given order.
pub fn write_results<W: Write>(results: &[RegionResult], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(RESULT_HEADER)?;
    for r in results {
        wtr.write_record([
            r.code.clone(),
            r.name.clone(),
            r.counts.registered.to_string(),
            r.counts.abstentions.to_string(),
            r.counts.null.to_string(),
            r.counts.choice_a.to_string(),
            r.counts.choice_b.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_results(results: &[RegionResult], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let file = fs::File::create(path).map_err(|e| PipelineError::io(path, e))?;
    write_results_to(results, file, path)?;
    info!(path = ?path, "Wrote region results");
    Ok(())
}

fn write_results_to<W: Write>(results: &[RegionResult], writer: W, path: &Path) -> Result<()> {
    write_results(results, writer).map_err(|source| PipelineError::CsvWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Region geometries with `code`, `name_reg` and `ratio` properties. An
/// undefined ratio is written as `null`.
pub fn region_map_to_geojson(map: &RegionMap) -> GeoJson {
    let features = map
        .entries
        .iter()
        .map(|entry| {
            let mut properties = JsonObject::new();
            properties.insert("code".to_string(), entry.code.clone().into());
            properties.insert(
                "name_reg".to_string(),
                entry.name.clone().map_or(serde_json::Value::Null, Into::into),
            );
            let ratio = serde_json::Number::from_f64(entry.ratio)
                .map_or(serde_json::Value::Null, serde_json::Value::Number);
            properties.insert("ratio".to_string(), ratio);

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&entry.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

pub fn save_region_map(map: &RegionMap, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, region_map_to_geojson(map).to_string())
        .map_err(|e| PipelineError::io(path, e))?;
    info!(path = ?path, "Wrote region map");
    Ok(())
}

pub fn save_figure(image: &RgbaImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    image.save(path).map_err(|source| PipelineError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = ?path, "Wrote map figure");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
        }
        _ => Ok(()),
    }
}
