// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RegspanError;

/// Runtime limits applied to a single extraction.
///
/// Worst-case extension work is linear per seed, so inputs with many short
/// seeds approach quadratic total work. `max_extension_steps` bounds the total
/// number of interval evaluations across all seeds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    pub max_extension_steps: Option<usize>,
    pub time_budget_ms: Option<u64>,
}

impl Constraints {
    pub fn validate(&self) -> Result<(), RegspanError> {
        if self.max_extension_steps == Some(0) {
            return Err(RegspanError::invalid_config(
                "constraints.max_extension_steps must be >= 1 when set; got 0",
            ));
        }
        if self.time_budget_ms == Some(0) {
            return Err(RegspanError::invalid_config(
                "constraints.time_budget_ms must be >= 1 when set; got 0",
            ));
        }
        Ok(())
    }

    /// True when any budget is configured.
    pub fn is_bounded(&self) -> bool {
        self.max_extension_steps.is_some() || self.time_budget_ms.is_some()
    }
}
