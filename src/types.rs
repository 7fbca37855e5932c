use geo::MultiPolygon;

/// The five ballot-count columns carried from the ballot source to the
/// per-region aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BallotCounts {
    pub registered: u64,
    pub abstentions: u64,
    pub null: u64,
    pub choice_a: u64,
    pub choice_b: u64,
}

impl BallotCounts {
    /// Ballots counted toward one of the two choices, saturating at `u64::MAX`.
    pub fn expressed(&self) -> u64 {
        self.choice_a.saturating_add(self.choice_b)
    }

    /// Share of expressed ballots for choice A; NaN when nothing was expressed.
    pub fn ratio(&self) -> f64 {
        if self.choice_a == 0 && self.choice_b == 0 {
            return f64::NAN;
        }
        self.choice_a as f64 / (self.choice_a as f64 + self.choice_b as f64)
    }

    /// Column-wise sum, `None` if any column overflows.
    pub fn checked_add(&self, rhs: &BallotCounts) -> Option<BallotCounts> {
        Some(BallotCounts {
            registered: self.registered.checked_add(rhs.registered)?,
            abstentions: self.abstentions.checked_add(rhs.abstentions)?,
            null: self.null.checked_add(rhs.null)?,
            choice_a: self.choice_a.checked_add(rhs.choice_a)?,
            choice_b: self.choice_b.checked_add(rhs.choice_b)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallotRecord {
    pub department_code: String,
    pub counts: BallotCounts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub code: String,
    pub name: String,
    pub region_code: String,
}

/// One department with its parent region, if the region list knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDepartment {
    pub region: Option<Region>,
    pub department_code: String,
    pub department_name: String,
}

impl RegionDepartment {
    pub fn region_code(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.code.as_str())
    }

    pub fn region_name(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.name.as_str())
    }
}

/// A ballot record resolved to its region. Only built for rows whose
/// department joined to a known region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferendumArea {
    pub department_code: String,
    pub department_name: String,
    pub region_code: String,
    pub region_name: String,
    pub counts: BallotCounts,
}

/// Summed ballot counts for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionResult {
    pub code: String,
    pub name: String,
    pub counts: BallotCounts,
}

/// The columns derived from a `RegionResult` before it is put on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRatio {
    pub code: String,
    pub name: String,
    pub expressed: u64,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct RegionGeometry {
    pub code: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct RegionMapEntry {
    pub code: String,
    pub name: Option<String>,
    pub ratio: f64,
    pub geometry: MultiPolygon<f64>,
}

impl RegionMapEntry {
    pub fn has_data(&self) -> bool {
        self.ratio.is_finite()
    }
}

/// Region geometries annotated with their ratio, in geometry-source order.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    pub entries: Vec<RegionMapEntry>,
}

impl RegionMap {
    pub fn get(&self, code: &str) -> Option<&RegionMapEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest and largest defined ratio, if any region has data.
    pub fn ratio_range(&self) -> Option<(f64, f64)> {
        self.entries
            .iter()
            .filter(|e| e.has_data())
            .map(|e| e.ratio)
            .fold(None, |acc, r| match acc {
                None => Some((r, r)),
                Some((lo, hi)) => Some((lo.min(r), hi.max(r))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(a: u64, b: u64) -> BallotCounts {
        BallotCounts {
            registered: 100,
            abstentions: 20,
            null: 5,
            choice_a: a,
            choice_b: b,
        }
    }

    #[test]
    fn ratio_is_share_of_expressed() {
        let c = counts(40, 35);
        assert_eq!(c.expressed(), 75);
        assert!((c.ratio() - 40.0 / 75.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_is_nan_without_expressed_ballots() {
        assert!(counts(0, 0).ratio().is_nan());
    }

    #[test]
    fn counts_add_column_wise() {
        let total = counts(1, 2).checked_add(&counts(3, 4)).unwrap();
        assert_eq!(total.registered, 200);
        assert_eq!(total.null, 10);
        assert_eq!(total.choice_a, 4);
        assert_eq!(total.choice_b, 6);
    }

    #[test]
    fn overflowing_sum_is_none() {
        let big = BallotCounts {
            registered: u64::MAX / 2 + 1,
            ..Default::default()
        };
        assert_eq!(big.checked_add(&big), None);
    }

    #[test]
    fn ratio_stays_defined_near_the_top_of_the_range() {
        let c = counts(u64::MAX, u64::MAX);
        assert_eq!(c.expressed(), u64::MAX);
        assert!((c.ratio() - 0.5).abs() < 1e-12);
    }
}
