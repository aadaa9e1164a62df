// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::extend::{Extension, ExtensionRules, IntervalMatch};
use regspan_core::{ExtractionConfig, GapBridge, RegspanError, Sequence, TimestampSeries};

fn included_indices(extension: &Extension) -> Vec<usize> {
    (extension.start_index..=extension.end_index)
        .filter(|idx| {
            extension.skipped.binary_search(idx).is_err()
                && extension.gap_interior.binary_search(idx).is_err()
        })
        .collect()
}

fn bridge_between(bridges: &[GapBridge], lower: usize, upper: usize) -> Option<&GapBridge> {
    bridges
        .iter()
        .find(|bridge| bridge.lower() == lower && bridge.upper() == upper)
}

/// Counts consecutive included pairs that are not within `tolerance` of the
/// interval expected for them (a bridge multiple or the common interval).
pub fn count_mismatches(
    included: &[usize],
    bridges: &[GapBridge],
    series: &TimestampSeries<'_>,
    rules: &ExtensionRules,
) -> usize {
    included
        .windows(2)
        .filter(|pair| {
            let expected = match bridge_between(bridges, pair[0], pair[1]) {
                Some(bridge) => f64::from(bridge.multiple) * rules.common_interval,
                None => rules.common_interval,
            };
            rules.classify_against(series.span(pair[0], pair[1]), expected)
                != IntervalMatch::Exact
        })
        .count()
}

/// Materializes the winning extension into a [`Sequence`] and verifies it.
pub fn assemble(
    extension: Extension,
    series: &TimestampSeries<'_>,
    config: &ExtractionConfig,
) -> Result<Sequence, RegspanError> {
    let rules = ExtensionRules::new(config, extension.seed.common_interval);
    let included = included_indices(&extension);
    let mismatch_count = count_mismatches(&included, &extension.bridges, series, &rules);

    let sequence = Sequence {
        start_index: extension.start_index,
        end_index: extension.end_index,
        sequence_length: included.len(),
        included_indices: included,
        skipped_count: extension.skipped.len(),
        gap_count: extension.bridges.len(),
        skipped_indices: extension.skipped,
        gap_indices: extension.gap_interior,
        gaps: extension.bridges,
        common_interval: extension.seed.common_interval,
        mismatch_count,
        time_span: series.span(extension.start_index, extension.end_index),
        seed: extension.seed,
    };
    sequence.check_invariants(series)?;
    Ok(sequence)
}
