// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RegspanError;

/// Validated borrowed view over sample timestamps (day offsets).
///
/// Values are finite and non-decreasing. Equal neighbours are allowed and
/// produce zero-length intervals. Empty series are valid; length checks that
/// depend on configuration happen in the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimestampSeries<'a> {
    values: &'a [f64],
}

impl<'a> TimestampSeries<'a> {
    pub fn new(values: &'a [f64]) -> Result<Self, RegspanError> {
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(RegspanError::invalid_input(format!(
                "timestamps must be finite: index {idx} has {value}"
            )));
        }

        if let Some(idx) = values.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(RegspanError::invalid_input(format!(
                "timestamps must be non-decreasing: t[{}]={} < t[{idx}]={}",
                idx + 1,
                values[idx + 1],
                values[idx]
            )));
        }

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied()
    }

    /// Wall-clock extent between two sample indices, `t[end] - t[start]`.
    ///
    /// # Panics
    /// Panics when either index is out of bounds.
    pub fn span(&self, start: usize, end: usize) -> f64 {
        self.values[end] - self.values[start]
    }

    /// Total extent of the series; zero when fewer than two samples exist.
    pub fn extent(&self) -> f64 {
        match (self.values.first(), self.values.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}
