// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::{ExtractionConfig, RegspanError, Seed};
use std::ops::Range;

/// Splits `values` into maximal runs where every member matches the run's
/// first element under `same`.
///
/// Runs are returned in order, cover the whole slice, and never overlap.
pub fn maximal_runs<T, F>(values: &[T], mut same: F) -> Vec<Range<usize>>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut runs = Vec::new();
    let mut start = 0usize;
    for idx in 1..values.len() {
        if !same(&values[start], &values[idx]) {
            runs.push(start..idx);
            start = idx;
        }
    }
    if !values.is_empty() {
        runs.push(start..values.len());
    }
    runs
}

/// Seeds plus bookkeeping about runs that did not qualify.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedScan {
    pub seeds: Vec<Seed>,
    pub runs_total: usize,
    pub too_short: usize,
    pub above_max_interval: usize,
}

/// Groups intervals into runs of near-equal values and keeps the runs long
/// enough to act as seeds.
///
/// Returns [`RegspanError::NoSeedFound`] when nothing qualifies.
pub fn find_seeds(intervals: &[f64], config: &ExtractionConfig) -> Result<SeedScan, RegspanError> {
    let tolerance = config.tolerance;
    let min_intervals = config.min_seed_intervals();
    let max_interval = config.effective_max_interval();

    let runs = maximal_runs(intervals, |first, next| (next - first).abs() <= tolerance);
    let mut scan = SeedScan {
        seeds: Vec::new(),
        runs_total: runs.len(),
        too_short: 0,
        above_max_interval: 0,
    };

    for run in runs {
        if run.len() < min_intervals {
            scan.too_short += 1;
            continue;
        }
        let common_interval = intervals[run.start];
        if let Some(limit) = max_interval
            && common_interval > limit
        {
            scan.above_max_interval += 1;
            continue;
        }
        scan.seeds.push(Seed {
            start_index: run.start,
            end_index: run.end,
            common_interval,
        });
    }

    if scan.seeds.is_empty() {
        return Err(RegspanError::NoSeedFound);
    }
    Ok(scan)
}
