use crate::error::{PipelineError, Result};
use crate::types::{BallotCounts, ReferendumArea, RegionRatio, RegionResult};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::info;

/// Sums the five ballot columns per region.
///
/// Output is ordered by region code, one row per code. A code seen with two
/// different names is reported instead of producing two rows.
pub fn compute_referendum_result_by_regions(
    areas: &[ReferendumArea],
) -> Result<Vec<RegionResult>> {
    let mut by_code: BTreeMap<&str, (&str, BallotCounts)> = BTreeMap::new();

    for area in areas {
        match by_code.entry(area.region_code.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert((area.region_name.as_str(), area.counts));
            }
            Entry::Occupied(mut slot) => {
                let (name, counts) = slot.get_mut();
                if *name != area.region_name {
                    return Err(PipelineError::ConflictingRegionName {
                        code: area.region_code.clone(),
                        first: name.to_string(),
                        second: area.region_name.clone(),
                    });
                }
                *counts = counts.checked_add(&area.counts).ok_or_else(|| {
                    PipelineError::CountOverflow {
                        code: area.region_code.clone(),
                    }
                })?;
            }
        }
    }

    info!("Aggregated {} rows into {} regions", areas.len(), by_code.len());

    Ok(by_code
        .into_iter()
        .map(|(code, (name, counts))| RegionResult {
            code: code.to_string(),
            name: name.to_string(),
            counts,
        })
        .collect())
}

/// Adds the expressed-ballot count and the choice-A ratio to each region.
pub fn compute_ratios(results: &[RegionResult]) -> Vec<RegionRatio> {
    results
        .iter()
        .map(|r| RegionRatio {
            code: r.code.clone(),
            name: r.name.clone(),
            expressed: r.counts.expressed(),
            ratio: r.counts.ratio(),
        })
        .collect()
}
