// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::extend::Extension;
use regspan_core::{ExtractionConfig, Objective, RegspanError, TimestampSeries};

/// Score of one extended seed under `objective`.
pub fn objective_value(
    extension: &Extension,
    series: &TimestampSeries<'_>,
    objective: Objective,
) -> f64 {
    match objective {
        Objective::Count => extension.sequence_length() as f64,
        Objective::Span => extension.time_span(series),
    }
}

fn replaces(candidate: f64, incumbent: f64, objective: Objective, tolerance: f64) -> bool {
    match objective {
        Objective::Count => candidate > incumbent,
        Objective::Span => candidate - incumbent > tolerance,
    }
}

/// Keeps the best-scoring extension; earlier extensions win ties.
///
/// Extensions must be given in seed order. Non-positive scores never win.
pub fn select_best<I>(
    extensions: I,
    series: &TimestampSeries<'_>,
    config: &ExtractionConfig,
) -> Result<Extension, RegspanError>
where
    I: IntoIterator<Item = Extension>,
{
    let mut best: Option<(f64, Extension)> = None;
    for extension in extensions {
        let score = objective_value(&extension, series, config.objective);
        if score <= 0.0 {
            continue;
        }
        let better = match &best {
            None => true,
            Some((incumbent, _)) => {
                replaces(score, *incumbent, config.objective, config.tolerance)
            }
        };
        if better {
            best = Some((score, extension));
        }
    }

    best.map(|(_, extension)| extension)
        .ok_or(RegspanError::NoSequenceFound)
}
