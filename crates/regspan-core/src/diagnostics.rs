// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::Objective;
use crate::repro::ReproMode;
use std::borrow::Cow;

/// Diagnostics schema version for extraction run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from an extraction run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub n: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub algorithm: Cow<'static, str>,
    pub objective: Objective,
    pub repro_mode: ReproMode,
    pub thread_count: Option<usize>,
    #[cfg(feature = "serde")]
    pub params_json: Option<serde_json::Value>,
    pub seeds_found: usize,
    pub seeds_evaluated: usize,
    pub extension_steps: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            algorithm: Cow::Borrowed(""),
            objective: Objective::Span,
            repro_mode: ReproMode::Balanced,
            thread_count: None,
            #[cfg(feature = "serde")]
            params_json: None,
            seeds_found: 0,
            seeds_evaluated: 0,
            extension_steps: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
    use crate::{Objective, ReproMode};
    use std::borrow::Cow;

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.algorithm, Cow::Borrowed(""));
        assert_eq!(diagnostics.objective, Objective::Span);
        assert_eq!(diagnostics.repro_mode, ReproMode::Balanced);
        assert!(diagnostics.runtime_ms.is_none());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
        assert_eq!(diagnostics.seeds_found, 0);
        assert_eq!(diagnostics.extension_steps, 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let diagnostics = Diagnostics {
            n: 240,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: Some(3),
            notes: vec!["gap_policy=interleaved".to_string()],
            warnings: vec!["budget exceeded".to_string()],
            algorithm: Cow::Owned("flexible".to_string()),
            objective: Objective::Count,
            repro_mode: ReproMode::Strict,
            thread_count: Some(1),
            params_json: Some(serde_json::json!({ "allowed_deviation": 1.0 })),
            seeds_found: 12,
            seeds_evaluated: 10,
            extension_steps: 981,
        };

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: Diagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
