// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic fixtures shared by the regspan benchmarks.

/// Weekly sampling with jitter, off-cadence inserts, and missed weeks.
///
/// The step pattern repeats every 16 samples.
pub fn irregular_weekly_series(n: usize) -> Vec<f64> {
    const STEPS: [f64; 16] = [
        7.0, 7.0, 8.0, 6.0, 7.0, 3.0, 4.0, 7.0, 14.0, 7.0, 7.0, 6.5, 7.0, 21.0, 7.0, 7.5,
    ];
    let mut values = Vec::with_capacity(n);
    let mut current = 0.0;
    for idx in 0..n {
        values.push(current);
        current += STEPS[idx % STEPS.len()];
    }
    values
}

/// Feature-major rows for `n_features` features over `times`.
pub fn feature_rows(times: &[f64], n_features: usize) -> Vec<(String, Vec<f64>)> {
    (0..n_features)
        .map(|feature| {
            let phase = feature as f64;
            let row = times
                .iter()
                .map(|time| 10.0 + (time / 30.0 + phase).sin())
                .collect();
            (format!("feature_{feature}"), row)
        })
        .collect()
}
