// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::RegspanError;
use crate::constraints::Constraints;
use crate::control::{BudgetMode, BudgetStatus, CancelToken};
use crate::observability::{ProgressSink, TelemetrySink};
use crate::repro::ReproMode;
use std::time::Instant;

/// Runtime hooks and limits for one extraction call.
///
/// Built with [`ExecutionContext::new`] and the `with_*` setters; every hook
/// is optional and borrowed for the duration of the call.
pub struct ExecutionContext<'a> {
    pub constraints: &'a Constraints,
    pub cancel: Option<&'a CancelToken>,
    pub budget_mode: BudgetMode,
    pub repro_mode: ReproMode,
    pub progress: Option<&'a dyn ProgressSink>,
    pub telemetry: Option<&'a dyn TelemetrySink>,
}

impl<'a> ExecutionContext<'a> {
    /// Hard-fail budgets, balanced repro mode, no hooks.
    pub fn new(constraints: &'a Constraints) -> Self {
        Self {
            constraints,
            cancel: None,
            budget_mode: BudgetMode::HardFail,
            repro_mode: ReproMode::Balanced,
            progress: None,
            telemetry: None,
        }
    }

    pub fn with_cancel(self, cancel: &'a CancelToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self
        }
    }

    pub fn with_budget_mode(self, budget_mode: BudgetMode) -> Self {
        Self {
            budget_mode,
            ..self
        }
    }

    pub fn with_repro_mode(self, repro_mode: ReproMode) -> Self {
        Self { repro_mode, ..self }
    }

    pub fn with_progress_sink(self, progress: &'a dyn ProgressSink) -> Self {
        Self {
            progress: Some(progress),
            ..self
        }
    }

    pub fn with_telemetry_sink(self, telemetry: &'a dyn TelemetrySink) -> Self {
        Self {
            telemetry: Some(telemetry),
            ..self
        }
    }

    pub fn check_cancelled(&self) -> Result<(), RegspanError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(RegspanError::cancelled()),
            _ => Ok(()),
        }
    }

    /// Polls the cancel token on every `every`-th iteration; `every == 0` polls always.
    pub fn check_cancelled_every(&self, iteration: usize, every: usize) -> Result<(), RegspanError> {
        if iteration.is_multiple_of(every.max(1)) {
            self.check_cancelled()
        } else {
            Ok(())
        }
    }

    /// Checks `steps` (cumulative across seeds) against `max_extension_steps`.
    pub fn check_step_budget(&self, steps: usize) -> Result<BudgetStatus, RegspanError> {
        match self.constraints.max_extension_steps {
            Some(limit) if steps > limit => self.over_budget(format_args!(
                "constraints.max_extension_steps exceeded: used={steps}, limit={limit}"
            )),
            _ => Ok(BudgetStatus::WithinBudget),
        }
    }

    /// Checks wall-clock time since `started_at` against `time_budget_ms`.
    pub fn check_time_budget(&self, started_at: Instant) -> Result<BudgetStatus, RegspanError> {
        let Some(limit_ms) = self.constraints.time_budget_ms else {
            return Ok(BudgetStatus::WithinBudget);
        };
        let elapsed_ms = started_at.elapsed().as_millis();
        if elapsed_ms <= u128::from(limit_ms) {
            return Ok(BudgetStatus::WithinBudget);
        }
        self.over_budget(format_args!(
            "constraints.time_budget_ms exceeded: elapsed_ms={elapsed_ms}, limit_ms={limit_ms}"
        ))
    }

    fn over_budget(&self, detail: std::fmt::Arguments<'_>) -> Result<BudgetStatus, RegspanError> {
        match self.budget_mode {
            BudgetMode::HardFail => Err(RegspanError::resource_limit(format!(
                "{detail}, budget_mode=HardFail"
            ))),
            BudgetMode::SoftDegrade => Ok(BudgetStatus::ExceededSoftDegrade),
        }
    }

    /// Seeds may run concurrently only when no hook or budget could observe
    /// evaluation order.
    pub fn allows_parallel(&self) -> bool {
        self.repro_mode.allows_parallel() && self.cancel.is_none() && !self.constraints.is_bounded()
    }

    /// Forwards `fraction`, clamped to `[0, 1]`; non-finite values are dropped.
    pub fn report_progress(&self, fraction: f32) {
        if let Some(sink) = self.progress
            && fraction.is_finite()
        {
            sink.on_progress(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn record_scalar(&self, key: &'static str, value: f64) {
        if let Some(sink) = self.telemetry {
            sink.record_scalar(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionContext;
    use crate::constraints::Constraints;
    use crate::control::{BudgetMode, BudgetStatus, CancelToken};
    use crate::observability::{ProgressSink, TelemetrySink};
    use crate::repro::ReproMode;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<f32>>,
        scalars: Mutex<Vec<(&'static str, f64)>>,
    }

    impl ProgressSink for Recorder {
        fn on_progress(&self, fraction: f32) {
            self.progress
                .lock()
                .expect("progress mutex should lock")
                .push(fraction);
        }
    }

    impl TelemetrySink for Recorder {
        fn record_scalar(&self, key: &'static str, value: f64) {
            self.scalars
                .lock()
                .expect("telemetry mutex should lock")
                .push((key, value));
        }
    }

    fn step_limited(limit: usize) -> Constraints {
        Constraints {
            max_extension_steps: Some(limit),
            ..Constraints::default()
        }
    }

    #[test]
    fn defaults_allow_parallel_until_something_observes_order() {
        let unbounded = Constraints::default();
        let ctx = ExecutionContext::new(&unbounded);
        assert_eq!(ctx.budget_mode, BudgetMode::HardFail);
        assert_eq!(ctx.repro_mode, ReproMode::Balanced);
        assert!(ctx.cancel.is_none() && ctx.progress.is_none() && ctx.telemetry.is_none());
        assert!(ctx.allows_parallel());

        assert!(
            !ExecutionContext::new(&unbounded)
                .with_repro_mode(ReproMode::Strict)
                .allows_parallel()
        );
        let cancel = CancelToken::new();
        assert!(
            !ExecutionContext::new(&unbounded)
                .with_cancel(&cancel)
                .allows_parallel()
        );
        let bounded = step_limited(100);
        assert!(!ExecutionContext::new(&bounded).allows_parallel());
    }

    #[test]
    fn cancellation_is_polled_on_cadence() {
        let constraints = Constraints::default();
        let cancel = CancelToken::new();
        let ctx = ExecutionContext::new(&constraints).with_cancel(&cancel);
        assert_eq!(ctx.check_cancelled(), Ok(()));

        cancel.cancel();
        assert_eq!(ctx.check_cancelled_every(3, 2), Ok(()));
        assert_eq!(
            ctx.check_cancelled_every(4, 2),
            Err(crate::RegspanError::Cancelled)
        );
        assert_eq!(
            ctx.check_cancelled_every(3, 0),
            Err(crate::RegspanError::Cancelled)
        );

        let no_token = ExecutionContext::new(&constraints);
        assert_eq!(no_token.check_cancelled(), Ok(()));
    }

    #[test]
    fn step_budget_is_inclusive_and_mode_dependent() {
        let unbounded = Constraints::default();
        assert_eq!(
            ExecutionContext::new(&unbounded).check_step_budget(usize::MAX),
            Ok(BudgetStatus::WithinBudget)
        );

        let bounded = step_limited(10);
        let hard = ExecutionContext::new(&bounded);
        assert_eq!(hard.check_step_budget(10), Ok(BudgetStatus::WithinBudget));
        let err = hard
            .check_step_budget(11)
            .expect_err("hard fail should error past the limit");
        assert_eq!(
            err.to_string(),
            "resource limit exceeded: constraints.max_extension_steps exceeded: used=11, limit=10, budget_mode=HardFail"
        );

        let soft = ExecutionContext::new(&bounded).with_budget_mode(BudgetMode::SoftDegrade);
        assert_eq!(
            soft.check_step_budget(11),
            Ok(BudgetStatus::ExceededSoftDegrade)
        );
    }

    #[test]
    fn time_budget_is_mode_dependent() {
        let constraints = Constraints {
            time_budget_ms: Some(1),
            ..Constraints::default()
        };
        let started_at = Instant::now()
            .checked_sub(Duration::from_millis(20))
            .expect("checked_sub should produce a valid earlier instant");

        let err = ExecutionContext::new(&constraints)
            .check_time_budget(started_at)
            .expect_err("hard fail should error on time budget exceed");
        assert!(err.to_string().contains("constraints.time_budget_ms exceeded"));
        assert!(err.to_string().ends_with("budget_mode=HardFail"));

        let soft = ExecutionContext::new(&constraints).with_budget_mode(BudgetMode::SoftDegrade);
        assert_eq!(
            soft.check_time_budget(started_at),
            Ok(BudgetStatus::ExceededSoftDegrade)
        );
    }

    #[test]
    fn sinks_receive_clamped_progress_and_scalars() {
        let constraints = Constraints::default();
        let silent = ExecutionContext::new(&constraints);
        silent.report_progress(0.5);
        silent.record_scalar("noop", 1.0);

        let recorder = Recorder::default();
        let ctx = ExecutionContext::new(&constraints)
            .with_progress_sink(&recorder)
            .with_telemetry_sink(&recorder);
        for fraction in [-0.2, 0.25, 1.2, f32::NAN, f32::INFINITY] {
            ctx.report_progress(fraction);
        }
        ctx.record_scalar("seeds", 4.0);
        ctx.record_scalar("steps", 12.0);

        let progress = recorder
            .progress
            .lock()
            .expect("progress values should lock")
            .clone();
        assert_eq!(progress, vec![0.0, 0.25, 1.0]);
        let scalars = recorder
            .scalars
            .lock()
            .expect("telemetry values should lock")
            .clone();
        assert_eq!(scalars, vec![("seeds", 4.0), ("steps", 12.0)]);
    }
}
