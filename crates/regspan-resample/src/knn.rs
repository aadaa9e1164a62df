// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::table::SampleTable;
use regspan_core::RegspanError;

const EPANECHNIKOV_SCALE: f64 = 0.75;

/// Largest grid [`regular_grid`] will materialize.
pub const MAX_GRID_POINTS: usize = 10_000_000;

fn epanechnikov(u: f64) -> f64 {
    EPANECHNIKOV_SCALE * (1.0 - u * u)
}

/// Grid `start, start + step, ...` up to and including `end`.
pub fn regular_grid(start: f64, end: f64, step: f64) -> Result<Vec<f64>, RegspanError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(RegspanError::invalid_config(format!(
            "grid step must be finite and > 0.0; got {step}"
        )));
    }
    if !start.is_finite() || !end.is_finite() || start > end {
        return Err(RegspanError::invalid_input(format!(
            "grid bounds must be finite with start <= end; got start={start}, end={end}"
        )));
    }

    let intervals = ((end - start) / step).floor();
    if !intervals.is_finite() || intervals >= MAX_GRID_POINTS as f64 {
        return Err(RegspanError::resource_limit(format!(
            "grid too large: ({end} - {start}) / {step} exceeds {MAX_GRID_POINTS} points"
        )));
    }
    let count = intervals as usize + 1;
    Ok((0..count).map(|idx| start + idx as f64 * step).collect())
}

/// Kernel-weighted estimate of every feature at `target`.
///
/// The bandwidth is the `k`-th smallest (0-based) absolute distance from
/// `target` to a sample time; samples within the bandwidth contribute with an
/// Epanechnikov weight. Weights are not normalized.
pub fn knn_interpolate(
    table: &SampleTable,
    target: f64,
    k: usize,
) -> Result<Vec<f64>, RegspanError> {
    if !target.is_finite() {
        return Err(RegspanError::invalid_input(format!(
            "interpolation target must be finite; got {target}"
        )));
    }
    let n = table.n_samples();
    if k >= n {
        return Err(RegspanError::invalid_config(format!(
            "k must be < number of samples; got k={k}, samples={n}"
        )));
    }

    let mut distances: Vec<f64> = table
        .times()
        .iter()
        .map(|time| (time - target).abs())
        .collect();
    distances.sort_unstable_by(f64::total_cmp);
    let bandwidth = distances[k];
    if bandwidth <= 0.0 {
        return Err(RegspanError::invalid_input(format!(
            "bandwidth collapsed to {bandwidth} at target={target} with k={k}; duplicate sample times?"
        )));
    }

    let mut estimate = vec![0.0; table.n_features()];
    for (sample, &time) in table.times().iter().enumerate() {
        if (time - target).abs() > bandwidth {
            continue;
        }
        let weight = epanechnikov((target - time) / bandwidth);
        for (feature, slot) in estimate.iter_mut().enumerate() {
            *slot += weight * table.row(feature)[sample];
        }
    }
    Ok(estimate)
}

/// Resamples every feature onto a regular grid spanning the sample times.
pub fn resample_knn(table: &SampleTable, step: f64, k: usize) -> Result<SampleTable, RegspanError> {
    let times = table.times();
    let (Some(start), Some(end)) = (
        times.iter().copied().reduce(f64::min),
        times.iter().copied().reduce(f64::max),
    ) else {
        return Err(RegspanError::invalid_input(
            "cannot resample a table with no samples",
        ));
    };

    let grid = regular_grid(start, end, step)?;
    tracing::debug!(
        samples = table.n_samples(),
        features = table.n_features(),
        grid_points = grid.len(),
        k,
        step,
        "knn resample"
    );

    let n_features = table.n_features();
    let cells = n_features.checked_mul(grid.len()).ok_or_else(|| {
        RegspanError::resource_limit(format!(
            "resampled table size overflow: features={n_features}, grid_points={}",
            grid.len()
        ))
    })?;
    let mut values = vec![0.0; cells];
    for (column, &target) in grid.iter().enumerate() {
        let estimate = knn_interpolate(table, target, k)?;
        for (feature, value) in estimate.into_iter().enumerate() {
            values[feature * grid.len() + column] = value;
        }
    }

    SampleTable::new(grid, table.labels().to_vec(), values)
}
