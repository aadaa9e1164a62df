// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::results::ExtractionResult;
use crate::{ExecutionContext, RegspanError, TimestampSeries};

/// Extractor contract: full timestamp series in, best regular sub-series out.
///
/// Implementations return one of the not-found errors
/// ([`RegspanError::is_not_found`]) instead of an empty result.
pub trait SequenceExtractor {
    fn extract(
        &self,
        series: &TimestampSeries<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ExtractionResult, RegspanError>;
}
