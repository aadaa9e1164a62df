// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RegspanError;

const DEFAULT_ALLOWED_DEVIATION: f64 = 1.0;
const DEFAULT_MIN_SEED_LENGTH: usize = 3;
const DEFAULT_TOLERANCE: f64 = 1.0e-6;
const DEFAULT_GAP_ALLOWANCE_PERIOD: f64 = 365.0;
const DEFAULT_GAP_EXTENSION_THRESHOLD: f64 = 28.0;
const DEFAULT_CANCEL_CHECK_EVERY: usize = 1000;

/// Quantity maximized when choosing among candidate sequences.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Objective {
    /// Number of included samples. Disables skipping and gap bridging.
    Count,
    /// Wall-clock extent `t[end] - t[start]`.
    #[default]
    Span,
}

impl Objective {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Span => "span",
        }
    }
}

/// Configuration for flexible sequence extraction.
///
/// All distances are in the same unit as the timestamps (day offsets in the
/// usual pipeline).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionConfig {
    /// Largest deviation from the common interval still accepted as in-sequence.
    pub allowed_deviation: f64,
    /// Minimum number of samples (not intervals) in a seed.
    pub min_seed_length: usize,
    /// Seeds with a larger common interval are discarded. Span objective only.
    pub max_interval: Option<f64>,
    /// Epsilon for floating-point interval equality.
    pub tolerance: f64,
    /// Elapsed time that earns one gap bridge.
    pub gap_allowance_period: f64,
    /// Extension a bridge must be followed by before it is accepted.
    pub gap_extension_threshold: f64,
    pub objective: Objective,
    pub allow_skips: bool,
    pub allow_gaps: bool,
    pub cancel_check_every: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            allowed_deviation: DEFAULT_ALLOWED_DEVIATION,
            min_seed_length: DEFAULT_MIN_SEED_LENGTH,
            max_interval: None,
            tolerance: DEFAULT_TOLERANCE,
            gap_allowance_period: DEFAULT_GAP_ALLOWANCE_PERIOD,
            gap_extension_threshold: DEFAULT_GAP_EXTENSION_THRESHOLD,
            objective: Objective::Span,
            allow_skips: true,
            allow_gaps: true,
            cancel_check_every: DEFAULT_CANCEL_CHECK_EVERY,
        }
    }
}

impl ExtractionConfig {
    /// Exact runs only: count objective with zero allowed deviation.
    pub fn strict() -> Self {
        Self {
            allowed_deviation: 0.0,
            objective: Objective::Count,
            allow_skips: false,
            allow_gaps: false,
            ..Self::default()
        }
    }

    /// Deviation-tolerant extension maximizing sample count.
    pub fn tolerant(allowed_deviation: f64) -> Self {
        Self {
            allowed_deviation,
            objective: Objective::Count,
            allow_skips: false,
            allow_gaps: false,
            ..Self::default()
        }
    }

    /// Full skip/gap extension maximizing time span.
    pub fn flexible(allowed_deviation: f64) -> Self {
        Self {
            allowed_deviation,
            objective: Objective::Span,
            allow_skips: true,
            allow_gaps: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RegspanError> {
        if !self.allowed_deviation.is_finite() || self.allowed_deviation < 0.0 {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.allowed_deviation must be finite and >= 0.0; got {}",
                self.allowed_deviation
            )));
        }
        if self.min_seed_length < 2 {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.min_seed_length must be >= 2; got {}",
                self.min_seed_length
            )));
        }
        if let Some(max_interval) = self.max_interval
            && (!max_interval.is_finite() || max_interval <= 0.0)
        {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.max_interval must be finite and > 0.0 when set; got {max_interval}"
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.tolerance must be finite and > 0.0; got {}",
                self.tolerance
            )));
        }
        if !self.gap_allowance_period.is_finite() || self.gap_allowance_period <= 0.0 {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.gap_allowance_period must be finite and > 0.0; got {}",
                self.gap_allowance_period
            )));
        }
        if !self.gap_extension_threshold.is_finite() || self.gap_extension_threshold < 0.0 {
            return Err(RegspanError::invalid_config(format!(
                "ExtractionConfig.gap_extension_threshold must be finite and >= 0.0; got {}",
                self.gap_extension_threshold
            )));
        }
        Ok(())
    }

    /// Skipping is only active under the span objective.
    pub fn skips_enabled(&self) -> bool {
        self.allow_skips && self.objective == Objective::Span
    }

    /// Gap bridging is only active under the span objective.
    pub fn gaps_enabled(&self) -> bool {
        self.allow_gaps && self.objective == Objective::Span
    }

    /// `max_interval` filtering is only active under the span objective.
    pub fn effective_max_interval(&self) -> Option<f64> {
        match self.objective {
            Objective::Span => self.max_interval,
            Objective::Count => None,
        }
    }

    pub fn normalized_cancel_check_every(&self) -> usize {
        self.cancel_check_every.max(1)
    }

    /// Minimum number of intervals a run needs to qualify as a seed.
    pub fn min_seed_intervals(&self) -> usize {
        self.min_seed_length.saturating_sub(1)
    }
}
