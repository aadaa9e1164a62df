// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use regspan_core::{
    BudgetMode, Constraints, ExecutionContext, ExtractionConfig, Objective, ReproMode,
    SequenceExtractor, TimestampSeries,
};
use regspan_extract::FlexibleExtractor;

struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_u8(&mut self) -> u8 {
        let value = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos = self.pos.saturating_add(1);
        value
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}

fn bounded(seed: u8, min: usize, max: usize) -> usize {
    min + usize::from(seed) % (max - min + 1)
}

/// Step sizes cluster around a weekly cadence with room for zeros and outliers.
fn build_step(seed: u8) -> f64 {
    match seed % 8 {
        0 => 0.0,
        1 => 14.0,
        2 => f64::from(seed % 32),
        3 => 7.0 + f64::from(seed % 5) / 4.0 - 0.5,
        _ => 7.0,
    }
}

fn build_config(cursor: &mut ByteCursor<'_>) -> ExtractionConfig {
    let flags = cursor.next_u8();
    ExtractionConfig {
        allowed_deviation: f64::from(cursor.next_u8() % 16) / 4.0,
        min_seed_length: bounded(cursor.next_u8(), 1, 6),
        max_interval: if flags & 1 == 0 {
            None
        } else {
            Some(f64::from(cursor.next_u8() % 32))
        },
        tolerance: 1.0e-6,
        gap_allowance_period: f64::from(cursor.next_u8()).max(1.0),
        gap_extension_threshold: f64::from(cursor.next_u8() % 64),
        objective: if flags & 2 == 0 {
            Objective::Span
        } else {
            Objective::Count
        },
        allow_skips: flags & 4 == 0,
        allow_gaps: flags & 8 == 0,
        cancel_check_every: bounded(cursor.next_u8(), 0, 16),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = ByteCursor::new(data);
    let config = build_config(&mut cursor);
    let budget_seed = cursor.next_u8();

    let len = cursor.remaining().min(256);
    let mut values = Vec::with_capacity(len + 1);
    let mut current = 0.0;
    values.push(current);
    for _ in 0..len {
        current += build_step(cursor.next_u8());
        values.push(current);
    }

    let Ok(series) = TimestampSeries::new(&values) else {
        return;
    };
    // Invalid configs (e.g. min_seed_length = 1) must be rejected, not panic.
    let Ok(extractor) = FlexibleExtractor::new(config) else {
        return;
    };

    let constraints = Constraints {
        max_extension_steps: if budget_seed & 1 == 0 {
            None
        } else {
            Some(bounded(budget_seed, 1, 512))
        },
        ..Constraints::default()
    };
    let budget_mode = if budget_seed & 2 == 0 {
        BudgetMode::HardFail
    } else {
        BudgetMode::SoftDegrade
    };
    let ctx = ExecutionContext::new(&constraints)
        .with_budget_mode(budget_mode)
        .with_repro_mode(ReproMode::Strict);

    if let Ok(result) = extractor.extract(&series, &ctx) {
        assert!(result.sequence.check_invariants(&series).is_ok());
    }
});
