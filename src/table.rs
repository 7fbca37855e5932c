//! Hash-join helpers over row slices.
//!
//! Every join in the pipeline builds a key → rows index over the right-hand
//! table once and probes it for each left-hand row.

use std::collections::HashMap;

/// Rows of a table bucketed by a string key.
pub struct HashIndex<'a, T> {
    buckets: HashMap<&'a str, Vec<&'a T>>,
}

impl<'a, T> HashIndex<'a, T> {
    pub fn build<F>(rows: &'a [T], key: F) -> Self
    where
        F: Fn(&'a T) -> &'a str,
    {
        let mut buckets: HashMap<&'a str, Vec<&'a T>> = HashMap::with_capacity(rows.len());
        for row in rows {
            buckets.entry(key(row)).or_default().push(row);
        }
        Self { buckets }
    }

    /// All rows with this key, in their original order.
    pub fn get(&self, key: &str) -> &[&'a T] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Left outer join: one output row per matching right row, or a single row
/// with `None` when nothing matches. Left order is preserved.
pub fn left_join<'a, L, R, O, KL, KR, C>(
    left: &'a [L],
    right: &'a [R],
    left_key: KL,
    right_key: KR,
    mut combine: C,
) -> Vec<O>
where
    KL: Fn(&'a L) -> &'a str,
    KR: Fn(&'a R) -> &'a str,
    C: FnMut(&'a L, Option<&'a R>) -> O,
{
    let index = HashIndex::build(right, right_key);
    let mut out = Vec::with_capacity(left.len());

    for row in left {
        let matches = index.get(left_key(row));
        if matches.is_empty() {
            out.push(combine(row, None));
        } else {
            for other in matches {
                out.push(combine(row, Some(*other)));
            }
        }
    }

    out
}
