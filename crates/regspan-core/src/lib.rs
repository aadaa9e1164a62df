// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types and traits for regspan.

pub mod config;
pub mod constraints;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod execution_context;
pub mod extractor;
pub mod observability;
pub mod repro;
pub mod results;
pub mod timestamps;

pub use config::{ExtractionConfig, Objective};
pub use constraints::Constraints;
pub use control::{BudgetMode, BudgetStatus, CancelToken};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
pub use error::RegspanError;
pub use execution_context::ExecutionContext;
pub use extractor::SequenceExtractor;
pub use observability::{ProgressSink, TelemetrySink};
pub use repro::ReproMode;
pub use results::{ExtractionResult, GapBridge, Seed, Sequence};
pub use timestamps::TimestampSeries;
