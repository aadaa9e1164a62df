// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::{
    BudgetMode, Constraints, ExecutionContext, ExtractionConfig, ExtractionResult, RegspanError,
    ReproMode, SequenceExtractor, TimestampSeries,
};
use regspan_extract::FlexibleExtractor;
use serde::{Deserialize, Serialize};

/// Everything one extraction run needs besides the timestamps.
///
/// This is the document accepted by `regspan extract --config`; every field
/// is optional and falls back to its default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub extraction: ExtractionConfig,
    pub constraints: Constraints,
    pub budget_mode: BudgetMode,
    pub repro_mode: ReproMode,
}

/// Runs the flexible extractor over `timestamps` under `settings`.
pub fn run_extraction(
    timestamps: &[f64],
    settings: &RunSettings,
) -> Result<ExtractionResult, RegspanError> {
    let series = TimestampSeries::new(timestamps)?;
    let ctx = ExecutionContext::new(&settings.constraints)
        .with_budget_mode(settings.budget_mode)
        .with_repro_mode(settings.repro_mode);
    FlexibleExtractor::new(settings.extraction.clone())?.extract(&series, &ctx)
}

/// Parses a [`RunSettings`] JSON document.
pub fn parse_settings_json(raw: &str) -> Result<RunSettings, RegspanError> {
    serde_json::from_str(raw)
        .map_err(|err| RegspanError::invalid_config(format!("invalid settings JSON: {err}")))
}
