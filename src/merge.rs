//! Relational steps between loading and aggregation: attaching regions to
//! departments, then resolving ballot records to regions.

use crate::table::left_join;
use crate::types::{BallotRecord, Department, ReferendumArea, Region, RegionDepartment};
use tracing::{debug, info};

/// Left join of departments onto regions by region code.
///
/// Every department appears exactly once as long as region codes are unique;
/// a department whose region is unknown keeps `region: None`.
pub fn merge_regions_and_departments(
    regions: &[Region],
    departments: &[Department],
) -> Vec<RegionDepartment> {
    let merged = left_join(
        departments,
        regions,
        |d| d.region_code.as_str(),
        |r| r.code.as_str(),
        |department, region| RegionDepartment {
            region: region.cloned(),
            department_code: department.code.clone(),
            department_name: department.name.clone(),
        },
    );

    let orphans = merged.iter().filter(|rd| rd.region.is_none()).count();
    if orphans > 0 {
        debug!(orphans, "Departments without a known region");
    }
    merged
}

/// True for department codes that denote overseas territories or voters
/// abroad.
pub fn is_excluded(department_code: &str, marker: &str) -> bool {
    !marker.is_empty() && department_code.contains(marker)
}

/// Drops ballot records whose department code contains `marker`, joins the
/// rest onto the department hierarchy and keeps only rows resolved to a
/// region.
pub fn merge_referendum_and_areas(
    referendum: &[BallotRecord],
    regions_and_departments: &[RegionDepartment],
    marker: &str,
) -> Vec<ReferendumArea> {
    let metropolitan: Vec<&BallotRecord> = referendum
        .iter()
        .filter(|r| !is_excluded(&r.department_code, marker))
        .collect();

    let joined = left_join(
        &metropolitan,
        regions_and_departments,
        |r| r.department_code.as_str(),
        |rd| rd.department_code.as_str(),
        |record, area| -> Option<ReferendumArea> {
            let area = area?;
            let region = area.region.as_ref()?;
            Some(ReferendumArea {
                department_code: record.department_code.clone(),
                department_name: area.department_name.clone(),
                region_code: region.code.clone(),
                region_name: region.name.clone(),
                counts: record.counts,
            })
        },
    );

    let (resolved, unresolved) = split_unresolved(joined);

    info!(
        excluded = referendum.len() - metropolitan.len(),
        unresolved,
        kept = resolved.len(),
        "Resolved ballot records to regions"
    );
    resolved
}

// Duplicate hierarchy rows can yield several resolved rows per record, so
// unresolved rows are counted directly.
fn split_unresolved(joined: Vec<Option<ReferendumArea>>) -> (Vec<ReferendumArea>, usize) {
    let unresolved = joined.iter().filter(|row| row.is_none()).count();
    (joined.into_iter().flatten().collect(), unresolved)
}
