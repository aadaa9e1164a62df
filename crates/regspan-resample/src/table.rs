// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::RegspanError;

/// Feature-major matrix of observations with one time per sample column.
///
/// `values[feature * n_samples + sample]` holds feature `feature` observed at
/// `times[sample]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SampleTable {
    times: Vec<f64>,
    labels: Vec<String>,
    values: Vec<f64>,
}

impl SampleTable {
    pub fn new(
        times: Vec<f64>,
        labels: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, RegspanError> {
        if let Some((idx, time)) = times.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(RegspanError::invalid_input(format!(
                "sample times must be finite: index {idx} has {time}"
            )));
        }
        let expected = times.len().checked_mul(labels.len()).ok_or_else(|| {
            RegspanError::resource_limit(format!(
                "sample table size overflow: samples={}, features={}",
                times.len(),
                labels.len()
            ))
        })?;
        if values.len() != expected {
            return Err(RegspanError::invalid_input(format!(
                "sample table shape mismatch: expected {} features x {} samples = {expected} values, got {}",
                labels.len(),
                times.len(),
                values.len()
            )));
        }
        Ok(Self {
            times,
            labels,
            values,
        })
    }

    /// Builds a table from one row per feature.
    pub fn from_rows(
        times: Vec<f64>,
        rows: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, RegspanError> {
        let mut labels = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len() * times.len());
        for (label, row) in rows {
            if row.len() != times.len() {
                return Err(RegspanError::invalid_input(format!(
                    "feature '{label}' has {} values but there are {} sample times",
                    row.len(),
                    times.len()
                )));
            }
            labels.push(label);
            values.extend(row);
        }
        Self::new(times, labels, values)
    }

    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    pub fn n_features(&self) -> usize {
        self.labels.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn row(&self, feature: usize) -> &[f64] {
        let n = self.n_samples();
        &self.values[feature * n..(feature + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.labels
            .iter()
            .enumerate()
            .map(|(feature, label)| (label.as_str(), self.row(feature)))
    }

    /// Keeps only the given sample columns, in the given order.
    ///
    /// Pass a sequence's `included_indices` to get the regular sub-table.
    pub fn select_samples(&self, indices: &[usize]) -> Result<Self, RegspanError> {
        let n = self.n_samples();
        if let Some(&bad) = indices.iter().find(|&&idx| idx >= n) {
            return Err(RegspanError::invalid_input(format!(
                "sample index {bad} out of bounds for {n} samples"
            )));
        }

        let times = indices.iter().map(|&idx| self.times[idx]).collect();
        let mut values = Vec::with_capacity(indices.len() * self.n_features());
        for feature in 0..self.n_features() {
            let row = self.row(feature);
            values.extend(indices.iter().map(|&idx| row[idx]));
        }
        Self::new(times, self.labels.clone(), values)
    }
}
