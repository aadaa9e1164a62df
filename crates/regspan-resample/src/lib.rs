// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Sample-table utilities around extraction: slicing a table down to a
//! sequence's included samples, or regularizing it by KNN kernel resampling.

pub mod knn;
pub mod table;

pub use knn::{MAX_GRID_POINTS, knn_interpolate, regular_grid, resample_knn};
pub use table::SampleTable;
