// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::diagnostics::Diagnostics;
use crate::{RegspanError, TimestampSeries};

/// Maximal run of near-equal consecutive intervals.
///
/// `start_index` and `end_index` are sample indices; the run covers intervals
/// `start_index..end_index`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
    pub start_index: usize,
    pub end_index: usize,
    pub common_interval: f64,
}

impl Seed {
    /// Number of intervals in the run.
    pub fn interval_count(&self) -> usize {
        self.end_index - self.start_index
    }
}

/// A bridged sampling hole: `to` is reached from `from` across roughly
/// `multiple` common intervals.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GapBridge {
    pub from: usize,
    pub to: usize,
    pub multiple: u32,
}

impl GapBridge {
    pub fn lower(&self) -> usize {
        self.from.min(self.to)
    }

    pub fn upper(&self) -> usize {
        self.from.max(self.to)
    }
}

/// Longest approximately regular sub-series found in a timestamp series.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub start_index: usize,
    pub end_index: usize,
    pub included_indices: Vec<usize>,
    pub skipped_indices: Vec<usize>,
    pub gap_indices: Vec<usize>,
    pub gaps: Vec<GapBridge>,
    pub common_interval: f64,
    pub mismatch_count: usize,
    pub skipped_count: usize,
    pub gap_count: usize,
    pub sequence_length: usize,
    pub time_span: f64,
    pub seed: Seed,
}

impl Sequence {
    /// Verifies the structural contract against the series it was built from.
    pub fn check_invariants(&self, series: &TimestampSeries<'_>) -> Result<(), RegspanError> {
        if self.start_index > self.end_index || self.end_index >= series.len() {
            return Err(RegspanError::invalid_input(format!(
                "sequence bounds [{}, {}] invalid for n={}",
                self.start_index,
                self.end_index,
                series.len()
            )));
        }
        if self.seed.start_index < self.start_index || self.seed.end_index > self.end_index {
            return Err(RegspanError::invalid_input(format!(
                "sequence [{}, {}] does not contain its seed [{}, {}]",
                self.start_index, self.end_index, self.seed.start_index, self.seed.end_index
            )));
        }
        if self.included_indices.first() != Some(&self.start_index)
            || self.included_indices.last() != Some(&self.end_index)
        {
            return Err(RegspanError::invalid_input(
                "included_indices must start at start_index and end at end_index",
            ));
        }
        if self
            .included_indices
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(RegspanError::invalid_input(
                "included_indices must be strictly increasing",
            ));
        }
        if self.sequence_length != self.included_indices.len() {
            return Err(RegspanError::invalid_input(format!(
                "sequence_length={} does not match included_indices.len()={}",
                self.sequence_length,
                self.included_indices.len()
            )));
        }
        let excluded = self.skipped_indices.len() + self.gap_indices.len();
        if self.sequence_length + excluded != self.end_index - self.start_index + 1 {
            return Err(RegspanError::invalid_input(format!(
                "sequence_length={} plus excluded={excluded} does not cover [{}, {}]",
                self.sequence_length, self.start_index, self.end_index
            )));
        }
        if self.skipped_count != self.skipped_indices.len() || self.gap_count != self.gaps.len() {
            return Err(RegspanError::invalid_input(
                "skipped_count/gap_count disagree with recorded indices",
            ));
        }
        let expected_span = series.span(self.start_index, self.end_index);
        if self.time_span.to_bits() != expected_span.to_bits() {
            return Err(RegspanError::invalid_input(format!(
                "time_span={} differs from t[end]-t[start]={expected_span}",
                self.time_span
            )));
        }
        Ok(())
    }
}

/// Winning sequence plus run metadata.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionResult {
    pub sequence: Sequence,
    pub diagnostics: Diagnostics,
}
