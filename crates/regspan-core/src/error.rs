// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error type for the regspan workspace.
///
/// The three not-found outcomes (`InsufficientData`, `NoSeedFound`,
/// `NoSequenceFound`) are ordinary results of running on sparse or irregular
/// data; callers that treat them as "skip this series" can test
/// [`RegspanError::is_not_found`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RegspanError {
    /// Configuration values violate their documented ranges.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Input data is malformed (non-finite or unsorted timestamps, shape mismatch).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The series is shorter than the minimum seed length.
    #[error("insufficient data: n={n} is shorter than min_seed_length={min_seed_length}")]
    InsufficientData { n: usize, min_seed_length: usize },

    /// No run of equal intervals is long enough to act as a seed.
    #[error("no seed found")]
    NoSeedFound,

    /// Seeds existed but none extended into a sequence with a positive objective.
    #[error("no sequence found")]
    NoSequenceFound,

    /// A step, time, or counter budget was exceeded.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("cancelled")]
    Cancelled,
}

impl RegspanError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Returns true for the explicit "no sequence" outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::NoSeedFound | Self::NoSequenceFound
        )
    }

    /// Stable machine-readable code used by adapters and the CLI.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::InvalidInput(_) => "invalid_input",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::NoSeedFound => "no_seed_found",
            Self::NoSequenceFound => "no_sequence_found",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Cancelled => "cancelled",
        }
    }
}
