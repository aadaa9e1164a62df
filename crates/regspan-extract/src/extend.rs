// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_core::{
    ExecutionContext, ExtractionConfig, GapBridge, RegspanError, Seed, TimestampSeries,
};

const GAP_MULTIPLES: [u32; 2] = [2, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Classification of one observed interval against the common interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalMatch {
    Exact,
    Deviated,
    Miss,
}

/// Acceptance rules for one seed, resolved from the config and the seed's
/// common interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtensionRules {
    pub common_interval: f64,
    pub tolerance: f64,
    pub allowed_deviation: f64,
    pub skips: bool,
    pub gaps: bool,
    pub gap_allowance_period: f64,
    pub gap_extension_threshold: f64,
}

impl ExtensionRules {
    pub fn new(config: &ExtractionConfig, common_interval: f64) -> Self {
        Self {
            common_interval,
            tolerance: config.tolerance,
            allowed_deviation: config.allowed_deviation,
            skips: config.skips_enabled(),
            gaps: config.gaps_enabled(),
            gap_allowance_period: config.gap_allowance_period,
            gap_extension_threshold: config.gap_extension_threshold,
        }
    }

    pub fn classify(&self, interval: f64) -> IntervalMatch {
        self.classify_against(interval, self.common_interval)
    }

    pub fn classify_against(&self, interval: f64, expected: f64) -> IntervalMatch {
        let deviation = (interval - expected).abs();
        if deviation <= self.tolerance {
            IntervalMatch::Exact
        } else if deviation <= self.allowed_deviation {
            IntervalMatch::Deviated
        } else {
            IntervalMatch::Miss
        }
    }

    /// An interval this short means an extra sample was inserted.
    fn is_short(&self, interval: f64) -> bool {
        interval < self.common_interval - self.allowed_deviation
    }

    fn gap_search_limit(&self) -> f64 {
        f64::from(GAP_MULTIPLES[GAP_MULTIPLES.len() - 1]) * self.common_interval
            + self.allowed_deviation
            + self.tolerance
    }
}

/// Mutable per-seed accumulation threaded through every extension step.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionState {
    pub start: usize,
    pub end: usize,
    pub skipped: Vec<usize>,
    pub gap_interior: Vec<usize>,
    pub bridges: Vec<GapBridge>,
    pub steps: usize,
    /// Steps already spent on earlier seeds of the same run.
    pub prior_steps: usize,
}

impl ExtensionState {
    pub fn from_seed(seed: &Seed) -> Self {
        Self {
            start: seed.start_index,
            end: seed.end_index,
            skipped: Vec::new(),
            gap_interior: Vec::new(),
            bridges: Vec::new(),
            steps: 0,
            prior_steps: 0,
        }
    }

    fn frontier(&self, direction: Direction) -> usize {
        match direction {
            Direction::Forward => self.end,
            Direction::Backward => self.start,
        }
    }

    fn advance(&mut self, direction: Direction, to: usize) {
        match direction {
            Direction::Forward => self.end = to,
            Direction::Backward => self.start = to,
        }
    }

    fn gaps_used(&self) -> usize {
        self.bridges.len()
    }

    /// Gap allowance earned by the current extent, shared by both directions.
    fn gaps_earned(&self, series: &TimestampSeries<'_>, rules: &ExtensionRules) -> usize {
        let earned = (series.span(self.start, self.end) / rules.gap_allowance_period).floor();
        if earned <= 0.0 {
            0
        } else {
            earned as usize
        }
    }
}

/// Fully extended seed, ready for objective scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct Extension {
    pub seed_index: usize,
    pub seed: Seed,
    pub start_index: usize,
    pub end_index: usize,
    pub skipped: Vec<usize>,
    pub gap_interior: Vec<usize>,
    pub bridges: Vec<GapBridge>,
    pub steps: usize,
}

impl Extension {
    pub fn excluded_count(&self) -> usize {
        self.skipped.len() + self.gap_interior.len()
    }

    pub fn sequence_length(&self) -> usize {
        self.end_index - self.start_index + 1 - self.excluded_count()
    }

    pub fn time_span(&self, series: &TimestampSeries<'_>) -> f64 {
        series.span(self.start_index, self.end_index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepOutcome {
    Advanced,
    Stopped,
}

fn offset_index(pos: usize, direction: Direction, offset: usize, n: usize) -> Option<usize> {
    match direction {
        Direction::Forward => pos.checked_add(offset).filter(|&idx| idx < n),
        Direction::Backward => pos.checked_sub(offset),
    }
}

fn between(series: &TimestampSeries<'_>, a: usize, b: usize) -> f64 {
    series.span(a.min(b), a.max(b))
}

/// Walks one seed outward under exact/deviated/skip/gap rules.
///
/// Forward and backward steps are interleaved one at a time and draw on one
/// shared gap allowance.
pub struct Extender<'s, 'c> {
    series: TimestampSeries<'s>,
    ctx: &'c ExecutionContext<'c>,
    config: &'c ExtractionConfig,
    cancel_check_every: usize,
}

impl<'s, 'c> Extender<'s, 'c> {
    pub fn new(
        series: TimestampSeries<'s>,
        config: &'c ExtractionConfig,
        ctx: &'c ExecutionContext<'c>,
    ) -> Self {
        Self {
            series,
            ctx,
            config,
            cancel_check_every: config.normalized_cancel_check_every(),
        }
    }

    pub fn extend(&self, seed_index: usize, seed: Seed) -> Result<Extension, RegspanError> {
        self.extend_after(seed_index, seed, 0)
    }

    /// Like [`Extender::extend`], charging the step budget on top of
    /// `prior_steps` already spent in this run.
    pub fn extend_after(
        &self,
        seed_index: usize,
        seed: Seed,
        prior_steps: usize,
    ) -> Result<Extension, RegspanError> {
        let rules = ExtensionRules::new(self.config, seed.common_interval);
        let mut state = ExtensionState {
            prior_steps,
            ..ExtensionState::from_seed(&seed)
        };

        let mut forward_open = true;
        let mut backward_open = true;
        while forward_open || backward_open {
            if forward_open {
                forward_open =
                    self.step(&rules, &mut state, Direction::Forward)? == StepOutcome::Advanced;
            }
            if backward_open {
                backward_open =
                    self.step(&rules, &mut state, Direction::Backward)? == StepOutcome::Advanced;
            }
        }

        state.skipped.sort_unstable();
        state.gap_interior.sort_unstable();
        state.bridges.sort_unstable_by_key(GapBridge::lower);

        Ok(Extension {
            seed_index,
            seed,
            start_index: state.start,
            end_index: state.end,
            skipped: state.skipped,
            gap_interior: state.gap_interior,
            bridges: state.bridges,
            steps: state.steps,
        })
    }

    fn tick(&self, state: &mut ExtensionState) -> Result<(), RegspanError> {
        state.steps = state
            .steps
            .checked_add(1)
            .ok_or_else(|| RegspanError::resource_limit("extension step counter overflow"))?;
        self.ctx
            .check_cancelled_every(state.steps, self.cancel_check_every)?;

        // Under SoftDegrade the current seed runs to completion; the seed loop
        // stops after it.
        let total = state
            .prior_steps
            .checked_add(state.steps)
            .ok_or_else(|| RegspanError::resource_limit("extension step counter overflow"))?;
        self.ctx.check_step_budget(total)?;
        Ok(())
    }

    fn step(
        &self,
        rules: &ExtensionRules,
        state: &mut ExtensionState,
        direction: Direction,
    ) -> Result<StepOutcome, RegspanError> {
        let n = self.series.len();
        let pos = state.frontier(direction);
        let Some(next) = offset_index(pos, direction, 1, n) else {
            return Ok(StepOutcome::Stopped);
        };
        self.tick(state)?;

        let interval = between(&self.series, pos, next);
        if rules.classify(interval) != IntervalMatch::Miss {
            state.advance(direction, next);
            return Ok(StepOutcome::Advanced);
        }

        if rules.skips
            && rules.is_short(interval)
            && let Some(after) = offset_index(pos, direction, 2, n)
            && rules.classify(between(&self.series, pos, after)) != IntervalMatch::Miss
        {
            state.skipped.push(next);
            state.advance(direction, after);
            return Ok(StepOutcome::Advanced);
        }

        if rules.gaps
            && state.gaps_used() < state.gaps_earned(&self.series, rules)
            && let Some(bridge) = self.find_gap(rules, state, pos, direction)?
        {
            state
                .gap_interior
                .extend(bridge.lower() + 1..bridge.upper());
            state.bridges.push(bridge);
            state.advance(direction, bridge.to);
            return Ok(StepOutcome::Advanced);
        }

        Ok(StepOutcome::Stopped)
    }

    /// Nearest position reachable across two or three common intervals whose
    /// lookahead confirms the sequence resumes.
    fn find_gap(
        &self,
        rules: &ExtensionRules,
        state: &mut ExtensionState,
        pos: usize,
        direction: Direction,
    ) -> Result<Option<GapBridge>, RegspanError> {
        let n = self.series.len();
        let limit = rules.gap_search_limit();
        let mut offset = 1usize;

        while let Some(candidate) = offset_index(pos, direction, offset, n) {
            self.tick(state)?;
            let distance = between(&self.series, pos, candidate);
            if distance > limit {
                break;
            }

            for multiple in GAP_MULTIPLES {
                let expected = f64::from(multiple) * rules.common_interval;
                if (distance - expected).abs() <= rules.allowed_deviation
                    && self.lookahead_reaches(rules, state, candidate, direction)?
                {
                    return Ok(Some(GapBridge {
                        from: pos,
                        to: candidate,
                        multiple,
                    }));
                }
            }
            offset += 1;
        }

        Ok(None)
    }

    /// True when exact/deviated extension from `origin` covers at least the
    /// configured threshold.
    fn lookahead_reaches(
        &self,
        rules: &ExtensionRules,
        state: &mut ExtensionState,
        origin: usize,
        direction: Direction,
    ) -> Result<bool, RegspanError> {
        let threshold = rules.gap_extension_threshold;
        if threshold <= 0.0 {
            return Ok(true);
        }

        let n = self.series.len();
        let mut cursor = origin;
        while let Some(next) = offset_index(cursor, direction, 1, n) {
            self.tick(state)?;
            if rules.classify(between(&self.series, cursor, next)) == IntervalMatch::Miss {
                break;
            }
            cursor = next;
            if between(&self.series, origin, cursor) >= threshold {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
