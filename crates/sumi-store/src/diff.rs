//! Line-level diff statistics for review UI.
//!
//! A pure function of the two strings — no store state is read or
//! mutated. Counts are a per-line multiset difference, which is exact for
//! the add/remove totals a review badge shows; byte-minimal edit scripts
//! are out of scope.

use std::collections::HashMap;

use sumi_types::DiffStats;

/// Count added and deleted lines between `original` and `proposed`.
///
/// A line occurring N times on one side and M times on the other
/// contributes `|N - M|` to the appropriate counter, so moved lines cost
/// nothing and repeated lines are not over-counted.
pub fn line_diff_stats(original: &str, proposed: &str) -> DiffStats {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for line in original.lines() {
        *counts.entry(line).or_insert(0) -= 1;
    }
    for line in proposed.lines() {
        *counts.entry(line).or_insert(0) += 1;
    }

    let mut stats = DiffStats::default();
    for surplus in counts.values() {
        if *surplus > 0 {
            stats.additions += *surplus as usize;
        } else {
            stats.deletions += (-*surplus) as usize;
        }
    }
    stats
}
