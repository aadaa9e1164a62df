// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Flexible extraction of approximately regular sub-series.
//!
//! Pipeline: [`intervals`] derives consecutive differences, [`seeds`] finds
//! maximal runs of near-equal intervals, [`extend`] walks each seed outward,
//! [`select`] keeps the best candidate, and [`assemble`] materializes it.

pub mod assemble;
pub mod extend;
pub mod extractor;
pub mod intervals;
pub mod seeds;
pub mod select;

pub use extend::{Direction, Extender, Extension, ExtensionRules, IntervalMatch};
pub use extractor::{FlexibleExtractor, extract_sequence};
pub use intervals::derive_intervals;
pub use seeds::{SeedScan, find_seeds, maximal_runs};
pub use select::{objective_value, select_best};
