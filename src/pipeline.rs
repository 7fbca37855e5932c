use crate::config::AppConfig;
use crate::data;
use crate::error::Result;
use crate::merge::{merge_referendum_and_areas, merge_regions_and_departments};
use crate::processing::compute_referendum_result_by_regions;
use crate::render::{plot_referendum_map, MapStyle};
use crate::types::{RegionMap, RegionResult};
use image::RgbaImage;
use tracing::info;

/// Everything a run produces. Nothing is written to disk here.
pub struct PipelineOutput {
    pub results: Vec<RegionResult>,
    pub map: RegionMap,
    pub figure: RgbaImage,
}

/// Runs every stage in order. All inputs, including the geometry source and
/// the optional font, are read before anything is returned, so a missing
/// file fails the whole run.
pub fn run(config: &AppConfig) -> Result<PipelineOutput> {
    let tables = data::load_data(config)?;
    let geometries = data::load_geometries(config)?;
    let style = MapStyle::from_config(&config.output)?;

    let regions_and_departments =
        merge_regions_and_departments(&tables.regions, &tables.departments);
    let referendum_and_areas = merge_referendum_and_areas(
        &tables.referendum,
        &regions_and_departments,
        &config.filter.excluded_marker,
    );
    let results = compute_referendum_result_by_regions(&referendum_and_areas)?;

    for r in results.iter().take(5) {
        info!(
            code = %r.code,
            name = %r.name,
            registered = r.counts.registered,
            abstentions = r.counts.abstentions,
            null = r.counts.null,
            choice_a = r.counts.choice_a,
            choice_b = r.counts.choice_b,
            "Region result"
        );
    }

    let (map, figure) = plot_referendum_map(&results, &geometries, &style);

    Ok(PipelineOutput {
        results,
        map,
        figure,
    })
}
