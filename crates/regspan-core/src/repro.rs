// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Reproducibility mode used to control determinism/performance trade-offs.
///
/// `Strict` forces sequential seed evaluation even when parallel evaluation
/// is compiled in. Results are identical in every mode; only scheduling differs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReproMode {
    Strict,
    #[default]
    Balanced,
    Fast,
}

impl ReproMode {
    pub fn allows_parallel(self) -> bool {
        self != Self::Strict
    }
}
