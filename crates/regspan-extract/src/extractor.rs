// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::assemble::assemble;
use crate::extend::{Extender, Extension};
use crate::intervals::derive_intervals;
use crate::seeds::{SeedScan, find_seeds};
use crate::select::{objective_value, select_best};
use regspan_core::{
    BudgetStatus, Constraints, Diagnostics, ExecutionContext, ExtractionConfig, ExtractionResult,
    RegspanError, Seed, Sequence, SequenceExtractor, TimestampSeries,
};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::borrow::Cow;
use std::time::Instant;

/// The single configurable extraction engine.
///
/// Strict, tolerant, and skip/gap-flexible behavior are all selected through
/// [`ExtractionConfig`]; see its presets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlexibleExtractor {
    config: ExtractionConfig,
}

#[derive(Clone, Debug, Default)]
struct RuntimeStats {
    seeds_evaluated: usize,
    extension_steps: usize,
    soft_budget_exceeded: bool,
    used_parallel: bool,
}

fn checked_counter_add(counter: &mut usize, delta: usize, name: &str) -> Result<(), RegspanError> {
    *counter = counter
        .checked_add(delta)
        .ok_or_else(|| RegspanError::resource_limit(format!("{name} counter overflow")))?;
    Ok(())
}

fn trace_extension(extension: &Extension) {
    tracing::trace!(
        seed_index = extension.seed_index,
        seed_start = extension.seed.start_index,
        seed_end = extension.seed.end_index,
        common_interval = extension.seed.common_interval,
        start_index = extension.start_index,
        end_index = extension.end_index,
        skipped = extension.skipped.len(),
        gaps = extension.bridges.len(),
        steps = extension.steps,
        "seed extended"
    );
}

fn evaluate_sequential(
    extender: &Extender<'_, '_>,
    seeds: &[Seed],
    ctx: &ExecutionContext<'_>,
    started_at: Instant,
    runtime: &mut RuntimeStats,
) -> Result<Vec<Extension>, RegspanError> {
    let total = seeds.len();
    let mut extensions = Vec::with_capacity(total);

    for (seed_index, seed) in seeds.iter().enumerate() {
        ctx.check_cancelled()?;

        let extension = extender.extend_after(seed_index, *seed, runtime.extension_steps)?;
        trace_extension(&extension);
        checked_counter_add(
            &mut runtime.extension_steps,
            extension.steps,
            "extension_steps",
        )?;
        runtime.seeds_evaluated += 1;
        extensions.push(extension);
        ctx.report_progress(runtime.seeds_evaluated as f32 / total as f32);

        let step_status = ctx.check_step_budget(runtime.extension_steps)?;
        let time_status = ctx.check_time_budget(started_at)?;
        if step_status == BudgetStatus::ExceededSoftDegrade
            || time_status == BudgetStatus::ExceededSoftDegrade
        {
            tracing::warn!(
                seeds_evaluated = runtime.seeds_evaluated,
                seeds_total = total,
                extension_steps = runtime.extension_steps,
                "budget exceeded under SoftDegrade; keeping best sequence so far"
            );
            runtime.soft_budget_exceeded = true;
            break;
        }
    }

    Ok(extensions)
}

#[cfg(feature = "rayon")]
fn evaluate_parallel(
    extender: &Extender<'_, '_>,
    seeds: &[Seed],
    runtime: &mut RuntimeStats,
) -> Result<Vec<Extension>, RegspanError> {
    let extensions = seeds
        .par_iter()
        .enumerate()
        .map(|(seed_index, seed)| {
            let extension = extender.extend(seed_index, *seed)?;
            trace_extension(&extension);
            Ok(extension)
        })
        .collect::<Result<Vec<_>, RegspanError>>()?;

    for extension in &extensions {
        checked_counter_add(
            &mut runtime.extension_steps,
            extension.steps,
            "extension_steps",
        )?;
    }
    runtime.seeds_evaluated = extensions.len();
    runtime.used_parallel = true;
    Ok(extensions)
}

impl FlexibleExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self, RegspanError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn evaluate_seeds(
        &self,
        series: TimestampSeries<'_>,
        seeds: &[Seed],
        ctx: &ExecutionContext<'_>,
        started_at: Instant,
        runtime: &mut RuntimeStats,
    ) -> Result<Vec<Extension>, RegspanError> {
        let extender = Extender::new(series, &self.config, ctx);

        #[cfg(feature = "rayon")]
        if ctx.allows_parallel() {
            let extensions = evaluate_parallel(&extender, seeds, runtime)?;
            ctx.report_progress(1.0);
            return Ok(extensions);
        }

        evaluate_sequential(&extender, seeds, ctx, started_at, runtime)
    }

    fn build_diagnostics(
        &self,
        series: &TimestampSeries<'_>,
        ctx: &ExecutionContext<'_>,
        scan: &SeedScan,
        runtime: &RuntimeStats,
        runtime_ms: u64,
        sequence: &Sequence,
    ) -> Diagnostics {
        let mut notes = vec![
            "gap_policy=interleaved".to_string(),
            format!(
                "runs_total={}, runs_too_short={}, runs_above_max_interval={}",
                scan.runs_total, scan.too_short, scan.above_max_interval
            ),
            format!(
                "winner_seed=[{}, {}], common_interval={}",
                sequence.seed.start_index, sequence.seed.end_index, sequence.common_interval
            ),
        ];
        notes.push(format!("used_parallel={}", runtime.used_parallel));

        let mut warnings = vec![];
        if runtime.soft_budget_exceeded {
            warnings.push(format!(
                "budget exceeded under SoftDegrade mode; evaluated {} of {} seeds",
                runtime.seeds_evaluated,
                scan.seeds.len()
            ));
        }

        #[cfg(feature = "rayon")]
        let thread_count = if runtime.used_parallel {
            Some(rayon::current_num_threads())
        } else {
            Some(1)
        };

        #[cfg(not(feature = "rayon"))]
        let thread_count = Some(1);

        Diagnostics {
            n: series.len(),
            runtime_ms: Some(runtime_ms),
            notes,
            warnings,
            algorithm: Cow::Borrowed("flexible"),
            objective: self.config.objective,
            repro_mode: ctx.repro_mode,
            thread_count,
            #[cfg(feature = "serde")]
            params_json: serde_json::to_value(&self.config).ok(),
            seeds_found: scan.seeds.len(),
            seeds_evaluated: runtime.seeds_evaluated,
            extension_steps: runtime.extension_steps,
            ..Diagnostics::default()
        }
    }
}

impl SequenceExtractor for FlexibleExtractor {
    fn extract(
        &self,
        series: &TimestampSeries<'_>,
        ctx: &ExecutionContext<'_>,
    ) -> Result<ExtractionResult, RegspanError> {
        self.config.validate()?;
        ctx.constraints.validate()?;

        let span = tracing::debug_span!(
            "extract",
            algorithm = "flexible",
            n = series.len(),
            objective = self.config.objective.as_str()
        );
        let _entered = span.enter();

        let started_at = Instant::now();
        let intervals = derive_intervals(series, self.config.min_seed_length)?;
        let scan = find_seeds(&intervals, &self.config)?;
        tracing::debug!(
            seeds = scan.seeds.len(),
            runs_total = scan.runs_total,
            runs_too_short = scan.too_short,
            runs_above_max_interval = scan.above_max_interval,
            "seed scan complete"
        );

        let mut runtime = RuntimeStats::default();
        let extensions =
            self.evaluate_seeds(*series, &scan.seeds, ctx, started_at, &mut runtime)?;
        let best = select_best(extensions, series, &self.config)?;
        let score = objective_value(&best, series, self.config.objective);
        let sequence = assemble(best, series, &self.config)?;

        tracing::info!(
            start_index = sequence.start_index,
            end_index = sequence.end_index,
            sequence_length = sequence.sequence_length,
            time_span = sequence.time_span,
            objective_value = score,
            "selected sequence"
        );

        let runtime_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        ctx.record_scalar("extract.flexible.seeds_found", scan.seeds.len() as f64);
        ctx.record_scalar(
            "extract.flexible.seeds_evaluated",
            runtime.seeds_evaluated as f64,
        );
        ctx.record_scalar(
            "extract.flexible.extension_steps",
            runtime.extension_steps as f64,
        );
        ctx.record_scalar("extract.flexible.runtime_ms", runtime_ms as f64);
        ctx.report_progress(1.0);

        let diagnostics =
            self.build_diagnostics(series, ctx, &scan, &runtime, runtime_ms, &sequence);
        Ok(ExtractionResult {
            sequence,
            diagnostics,
        })
    }
}

/// Runs [`FlexibleExtractor`] over raw timestamps with an unbounded context.
pub fn extract_sequence(
    timestamps: &[f64],
    config: &ExtractionConfig,
) -> Result<Sequence, RegspanError> {
    let series = TimestampSeries::new(timestamps)?;
    let constraints = Constraints::default();
    let ctx = ExecutionContext::new(&constraints);
    let extractor = FlexibleExtractor::new(config.clone())?;
    Ok(extractor.extract(&series, &ctx)?.sequence)
}
