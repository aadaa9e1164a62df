// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::{
    BudgetMode, CancelToken, Constraints, ExecutionContext, ExtractionConfig, GapBridge,
    Objective, ProgressSink, RegspanError, ReproMode, SequenceExtractor, TimestampSeries,
};
use regspan_extract::{FlexibleExtractor, extract_sequence};
use std::sync::Mutex;

fn with_seed_length(config: ExtractionConfig, min_seed_length: usize) -> ExtractionConfig {
    ExtractionConfig {
        min_seed_length,
        ..config
    }
}

#[derive(Default)]
struct RecordingProgress {
    values: Mutex<Vec<f32>>,
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, fraction: f32) {
        self.values
            .lock()
            .expect("progress mutex should lock")
            .push(fraction);
    }
}

#[test]
fn pure_extension_absorbs_deviated_steps() {
    let values = [0.0, 7.0, 14.0, 21.0, 29.0, 35.0];
    let sequence = extract_sequence(
        &values,
        &with_seed_length(ExtractionConfig::tolerant(1.0), 2),
    )
    .expect("sequence should be found");

    assert_eq!((sequence.start_index, sequence.end_index), (0, 5));
    assert_eq!(sequence.common_interval, 7.0);
    assert_eq!(sequence.sequence_length, 6);
    assert_eq!(sequence.included_indices, vec![0, 1, 2, 3, 4, 5]);
    // 21 -> 29 (8) and 29 -> 35 (6) both deviate from 7.
    assert_eq!(sequence.mismatch_count, 2);
    assert_eq!(sequence.skipped_count, 0);
    assert_eq!(sequence.gap_count, 0);
    assert_eq!(sequence.time_span, 35.0);
}

#[test]
fn inserted_sample_is_skipped() {
    let values = [0.0, 7.0, 10.0, 14.0, 21.0];
    let sequence = extract_sequence(
        &values,
        &with_seed_length(ExtractionConfig::flexible(1.0), 2),
    )
    .expect("sequence should be found");

    assert_eq!(sequence.included_indices, vec![0, 1, 3, 4]);
    assert_eq!(sequence.skipped_indices, vec![2]);
    assert_eq!(sequence.skipped_count, 1);
    assert_eq!(sequence.common_interval, 7.0);
    assert_eq!(sequence.sequence_length, 4);
    assert_eq!(sequence.time_span, 21.0);
    assert_eq!(sequence.mismatch_count, 0);
    // Seeds at [0, 1] and [3, 4] tie on span; the earlier one wins.
    assert_eq!(sequence.seed.start_index, 0);
}

#[test]
fn single_sample_is_insufficient() {
    let err = extract_sequence(&[5.0], &with_seed_length(ExtractionConfig::default(), 2))
        .expect_err("one sample cannot hold a seed");
    assert_eq!(
        err,
        RegspanError::InsufficientData {
            n: 1,
            min_seed_length: 2
        }
    );
    assert!(err.is_not_found());
}

#[test]
fn strictly_growing_intervals_have_no_seed() {
    let values = [0.0, 1.0, 3.0, 6.0, 10.0, 15.0];
    let err = extract_sequence(&values, &ExtractionConfig::default())
        .expect_err("no two equal adjacent intervals");
    assert_eq!(err, RegspanError::NoSeedFound);
    assert!(err.is_not_found());
}

#[test]
fn duplicate_timestamps_are_ordinary_intervals() {
    let values = [0.0, 0.0, 7.0, 14.0];
    for config in [
        ExtractionConfig::default(),
        ExtractionConfig::tolerant(1.0),
        with_seed_length(ExtractionConfig::flexible(1.0), 2),
    ] {
        let sequence = extract_sequence(&values, &config).expect("sequence should be found");
        assert_eq!((sequence.start_index, sequence.end_index), (1, 3));
        assert_eq!(sequence.common_interval, 7.0);
    }

    let err = extract_sequence(&[3.0, 3.0, 3.0], &ExtractionConfig::default())
        .expect_err("zero span never wins under the span objective");
    assert_eq!(err, RegspanError::NoSequenceFound);

    let sequence = extract_sequence(&[3.0, 3.0, 3.0], &ExtractionConfig::strict())
        .expect("count objective accepts a zero-interval run");
    assert_eq!(sequence.sequence_length, 3);
    assert_eq!(sequence.time_span, 0.0);
}

#[test]
fn earned_gap_bridges_missing_and_off_cadence_samples() {
    let values = [0.0, 7.0, 14.0, 21.0, 26.0, 35.0, 42.0, 49.0];
    let config = ExtractionConfig {
        gap_allowance_period: 14.0,
        gap_extension_threshold: 14.0,
        ..ExtractionConfig::flexible(1.0)
    };

    let sequence = extract_sequence(&values, &config).expect("sequence should be found");
    assert_eq!((sequence.start_index, sequence.end_index), (0, 7));
    assert_eq!(sequence.gap_indices, vec![4]);
    assert_eq!(
        sequence.gaps,
        vec![GapBridge {
            from: 3,
            to: 5,
            multiple: 2
        }]
    );
    assert_eq!(sequence.gap_count, 1);
    assert_eq!(sequence.included_indices, vec![0, 1, 2, 3, 5, 6, 7]);
    assert_eq!(sequence.time_span, 49.0);
    assert_eq!(sequence.mismatch_count, 0);

    let no_gaps = ExtractionConfig {
        allow_gaps: false,
        ..config
    };
    let sequence = extract_sequence(&values, &no_gaps).expect("sequence should be found");
    assert_eq!((sequence.start_index, sequence.end_index), (0, 3));
    assert_eq!(sequence.gap_count, 0);
}

#[test]
fn default_gap_period_needs_a_year_of_extent() {
    let values = [0.0, 7.0, 14.0, 21.0, 35.0, 42.0, 49.0, 56.0];
    let sequence = extract_sequence(&values, &ExtractionConfig::default())
        .expect("sequence should be found");
    assert_eq!(sequence.gap_count, 0);
    assert_eq!(sequence.time_span, 21.0);
}

#[test]
fn max_interval_discards_coarse_seeds_in_span_mode() {
    let values = [0.0, 1.0, 2.0, 3.0, 103.0, 203.0, 303.0];

    let unrestricted =
        extract_sequence(&values, &ExtractionConfig::default()).expect("sequence should be found");
    assert_eq!(unrestricted.common_interval, 100.0);
    assert_eq!(unrestricted.time_span, 300.0);

    let capped = extract_sequence(
        &values,
        &ExtractionConfig {
            max_interval: Some(10.0),
            ..ExtractionConfig::default()
        },
    )
    .expect("sequence should be found");
    assert_eq!(capped.common_interval, 1.0);
    assert_eq!((capped.start_index, capped.end_index), (0, 3));

    let count_ignores_cap = extract_sequence(
        &values,
        &ExtractionConfig {
            max_interval: Some(10.0),
            objective: Objective::Count,
            ..ExtractionConfig::default()
        },
    )
    .expect("sequence should be found");
    assert_eq!(count_ignores_cap.sequence_length, 4);
    assert_eq!(count_ignores_cap.common_interval, 1.0);
}

#[test]
fn step_budget_hard_fail_and_soft_degrade() {
    let values = [0.0, 7.0, 14.0, 21.0, 29.0, 35.0];
    let config = with_seed_length(ExtractionConfig::tolerant(1.0), 2);
    let series = TimestampSeries::new(&values).expect("valid series");
    let constraints = Constraints {
        max_extension_steps: Some(1),
        ..Constraints::default()
    };
    let extractor = FlexibleExtractor::new(config).expect("config is valid");

    let hard = ExecutionContext::new(&constraints);
    let err = extractor
        .extract(&series, &hard)
        .expect_err("hard fail should surface the exceeded budget");
    assert_eq!(err.code(), "resource_limit");
    assert!(err.to_string().contains("max_extension_steps"));

    let soft = ExecutionContext::new(&constraints).with_budget_mode(BudgetMode::SoftDegrade);
    let result = extractor
        .extract(&series, &soft)
        .expect("soft degrade keeps the best sequence so far");
    assert_eq!(result.diagnostics.seeds_found, 3);
    assert_eq!(result.diagnostics.seeds_evaluated, 1);
    assert_eq!(result.diagnostics.warnings.len(), 1);
    assert!(result.diagnostics.warnings[0].contains("SoftDegrade"));
    assert_eq!(
        (result.sequence.start_index, result.sequence.end_index),
        (0, 5)
    );
}

#[test]
fn cancelled_token_stops_extraction() {
    let values = [0.0, 7.0, 14.0, 21.0, 28.0];
    let series = TimestampSeries::new(&values).expect("valid series");
    let constraints = Constraints::default();
    let cancel = CancelToken::new();
    cancel.cancel();
    let ctx = ExecutionContext::new(&constraints).with_cancel(&cancel);

    let err = FlexibleExtractor::default()
        .extract(&series, &ctx)
        .expect_err("cancelled run must fail");
    assert_eq!(err, RegspanError::Cancelled);
    assert!(!err.is_not_found());
}

#[test]
fn progress_reaches_completion() {
    let values = [0.0, 7.0, 14.0, 21.0, 29.0, 35.0];
    let series = TimestampSeries::new(&values).expect("valid series");
    let constraints = Constraints::default();
    let progress = RecordingProgress::default();
    let ctx = ExecutionContext::new(&constraints)
        .with_repro_mode(ReproMode::Strict)
        .with_progress_sink(&progress);

    FlexibleExtractor::new(with_seed_length(ExtractionConfig::tolerant(1.0), 2))
        .expect("config is valid")
        .extract(&series, &ctx)
        .expect("extraction should succeed");

    let seen = progress
        .values
        .lock()
        .expect("progress values should lock")
        .clone();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(seen.last().copied(), Some(1.0));
}

#[test]
fn repro_modes_agree_on_the_selected_sequence() {
    let mut values = vec![0.0];
    for step in [
        7.0, 7.0, 7.0, 3.0, 4.0, 7.0, 8.0, 7.0, 14.0, 7.0, 7.0, 6.0, 7.0, 1.0, 1.0, 1.0, 1.0,
        21.0, 7.0, 7.0, 7.0,
    ] {
        let last = values[values.len() - 1];
        values.push(last + step);
    }
    let series = TimestampSeries::new(&values).expect("valid series");
    let constraints = Constraints::default();
    let config = with_seed_length(
        ExtractionConfig {
            gap_allowance_period: 30.0,
            gap_extension_threshold: 7.0,
            ..ExtractionConfig::flexible(1.0)
        },
        2,
    );
    let extractor = FlexibleExtractor::new(config).expect("config is valid");

    let strict = extractor
        .extract(
            &series,
            &ExecutionContext::new(&constraints).with_repro_mode(ReproMode::Strict),
        )
        .expect("strict run succeeds");
    for mode in [ReproMode::Balanced, ReproMode::Fast] {
        let other = extractor
            .extract(
                &series,
                &ExecutionContext::new(&constraints).with_repro_mode(mode),
            )
            .expect("run succeeds");
        assert_eq!(other.sequence, strict.sequence);
        assert_eq!(
            other.diagnostics.extension_steps,
            strict.diagnostics.extension_steps
        );
    }
}

#[test]
fn span_objective_can_shrink_when_deviation_widens() {
    // The extender commits to the first acceptable move (match, skip, gap).
    // At 2.534 a deviated skip lands the c=14 walk on a sample with no bridge
    // within reach, where 1.676 rejected the skip and bridged further.
    let steps = [
        21.0, 14.0, 7.0, 7.0, 7.0, 3.0, 7.0, 10.0, 7.0, 7.0, 10.0, 14.0, 21.0, 7.0, 8.0, 7.0,
        8.0, 4.0, 4.0, 3.0, 10.0, 4.0, 10.0, 7.0, 21.0, 14.0, 10.0, 7.0,
    ];
    let mut values = vec![0.0];
    for step in steps {
        let last = values[values.len() - 1];
        values.push(last + step);
    }
    let config = |allowed_deviation: f64| ExtractionConfig {
        allowed_deviation,
        min_seed_length: 2,
        gap_allowance_period: 14.0,
        gap_extension_threshold: 0.0,
        ..ExtractionConfig::default()
    };

    let narrow = extract_sequence(&values, &config(1.676)).expect("sequence should be found");
    assert_eq!(narrow.common_interval, 14.0);
    assert_eq!((narrow.start_index, narrow.end_index), (6, 26));
    assert_eq!(narrow.time_span, 183.0);

    let wide = extract_sequence(&values, &config(2.534)).expect("sequence should be found");
    assert_eq!(wide.common_interval, 21.0);
    assert_eq!((wide.start_index, wide.end_index), (6, 25));
    assert_eq!(wide.time_span, 169.0);

    let count = |allowed_deviation: f64| ExtractionConfig {
        objective: Objective::Count,
        ..config(allowed_deviation)
    };
    let narrow = extract_sequence(&values, &count(1.676)).expect("sequence should be found");
    let wide = extract_sequence(&values, &count(2.534)).expect("sequence should be found");
    assert!(wide.sequence_length >= narrow.sequence_length);
}
