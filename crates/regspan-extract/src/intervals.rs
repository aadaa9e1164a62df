// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::{RegspanError, TimestampSeries};

/// Consecutive differences `t[i + 1] - t[i]`, length `n - 1`.
///
/// Fails with [`RegspanError::InsufficientData`] when the series holds fewer
/// than `min_seed_length` samples.
pub fn derive_intervals(
    series: &TimestampSeries<'_>,
    min_seed_length: usize,
) -> Result<Vec<f64>, RegspanError> {
    let n = series.len();
    if n < min_seed_length {
        return Err(RegspanError::InsufficientData { n, min_seed_length });
    }

    Ok(series
        .as_slice()
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::derive_intervals;
    use regspan_core::{RegspanError, TimestampSeries};

    #[test]
    fn intervals_have_length_n_minus_one() {
        let values = [0.0, 7.0, 14.0, 22.0];
        let series = TimestampSeries::new(&values).expect("valid series");
        let intervals = derive_intervals(&series, 2).expect("enough samples");
        assert_eq!(intervals, vec![7.0, 7.0, 8.0]);
    }

    #[test]
    fn duplicate_timestamps_yield_zero_intervals() {
        let values = [0.0, 0.0, 7.0, 14.0];
        let series = TimestampSeries::new(&values).expect("valid series");
        let intervals = derive_intervals(&series, 2).expect("enough samples");
        assert_eq!(intervals, vec![0.0, 7.0, 7.0]);
    }

    #[test]
    fn short_series_is_insufficient() {
        let values = [5.0];
        let series = TimestampSeries::new(&values).expect("valid series");
        let err = derive_intervals(&series, 2).expect_err("one sample is too short");
        assert_eq!(
            err,
            RegspanError::InsufficientData {
                n: 1,
                min_seed_length: 2
            }
        );

        let empty: [f64; 0] = [];
        let series = TimestampSeries::new(&empty).expect("valid series");
        assert!(derive_intervals(&series, 2).is_err());
    }
}
