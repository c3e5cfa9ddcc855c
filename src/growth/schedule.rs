//! Drivers for growth tasks
//!
//! A [`GenerationRun`] keeps a stack of [`GrowthTask`]s. The task on top is
//! the one stepped; a spawned child is pushed above its parent and runs to
//! completion before the parent hands off to its next child. Immediate and
//! distributed pacing both walk exactly this sequence of steps and differ
//! only in when the steps happen, so from the same seed they build the same
//! map.
//!
//! Clearing part of the tree mid-run goes through [`GenerationRun::cancel`],
//! which drops the affected tasks. The rest of the tree keeps growing but can
//! no longer complete, so such a run ends as [`RunStatus::Cancelled`].

use std::time::Duration;

use crate::completion::CompletionPropagator;
use crate::error::{GenerationError, Result};
use crate::region::{RegionId, RegionTree};

use super::{GrowthContext, GrowthTask, StepOutcome};

/// State of a run after a call that drives it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Steps remain
    Running,
    /// Every region in the tree finished growing
    Complete,
    /// No steps remain, but a cancelled subtree never finished
    Cancelled,
}

/// One generation pass over a region tree
#[derive(Debug)]
pub struct GenerationRun {
    stack: Vec<GrowthTask>,
    delay: Duration,
    clock: Duration,
    next_due: Duration,
    steps: usize,
    failed: bool,
    cancelled: bool,
}

impl GenerationRun {
    /// Wrap the root task; `delay` only matters to [`advance`](Self::advance)
    pub fn new(root: GrowthTask, delay: Duration) -> Self {
        Self {
            stack: vec![root],
            delay,
            clock: Duration::ZERO,
            next_due: Duration::ZERO,
            steps: 0,
            failed: false,
            cancelled: false,
        }
    }

    /// Steps performed so far, across every region
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether no steps remain
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether an error aborted this run
    #[inline]
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Whether part of the tree was cancelled during this run
    #[inline]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Pause between steps in distributed pacing
    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn status(&self) -> RunStatus {
        if !self.stack.is_empty() {
            RunStatus::Running
        } else if self.cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::Complete
        }
    }

    /// Stop growing `region` and every region below it
    ///
    /// Drops their tasks from the run and tells the remaining tasks not to
    /// hand off to `region` later. Call it alongside
    /// [`RegionTree::clear`](crate::region::RegionTree::clear), which
    /// destroys the sections. Returns how many tasks were dropped.
    ///
    /// # Arguments
    ///
    /// * `regions` - The tree the run is growing
    /// * `region` - Root of the subtree to stop
    pub fn cancel(&mut self, regions: &RegionTree, region: RegionId) -> usize {
        let before = self.stack.len();
        self.stack.retain(|task| !regions.is_within(task.region(), region));
        for task in &mut self.stack {
            task.skip_child(region);
        }
        self.cancelled = true;

        let dropped = before - self.stack.len();
        log::debug!("cancelled growth under region {} ({} tasks dropped)", region, dropped);
        dropped
    }

    /// Perform exactly one step
    ///
    /// # Errors
    ///
    /// Propagates the growth error that aborted the run; every later call
    /// returns `RunAborted`.
    pub fn step(
        &mut self,
        ctx: &mut GrowthContext<'_>,
        completions: &mut CompletionPropagator,
    ) -> Result<RunStatus> {
        if self.failed {
            return Err(GenerationError::RunAborted);
        }
        let Some(task) = self.stack.last_mut() else {
            return Ok(self.status());
        };

        let region = task.region();
        let outcome = match task.step(ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.failed = true;
                return Err(err);
            }
        };
        self.steps += 1;

        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::Finished => {
                self.stack.pop();
                completions.post(region);
            }
            StepOutcome::Spawned { child, finished } => {
                if finished {
                    self.stack.pop();
                    completions.post(region);
                }
                self.stack.push(child);
            }
        }
        completions.pump(ctx.regions);

        Ok(self.status())
    }

    /// Step back to back until no steps remain, returning the final status
    pub fn run_to_completion(
        &mut self,
        ctx: &mut GrowthContext<'_>,
        completions: &mut CompletionPropagator,
    ) -> Result<RunStatus> {
        loop {
            let status = self.step(ctx, completions)?;
            if status != RunStatus::Running {
                return Ok(status);
            }
        }
    }

    /// Let `elapsed` time pass and run every step whose timer came due
    ///
    /// Steps are `delay` apart, the first one due immediately. With a zero
    /// delay a step still waits for the next call, so each call runs at most
    /// one.
    pub fn advance(
        &mut self,
        ctx: &mut GrowthContext<'_>,
        completions: &mut CompletionPropagator,
        elapsed: Duration,
    ) -> Result<RunStatus> {
        self.clock = self.clock.saturating_add(elapsed);
        if self.delay.is_zero() {
            return self.step(ctx, completions);
        }

        let mut status = self.status();
        while status == RunStatus::Running && self.clock >= self.next_due {
            status = self.step(ctx, completions)?;
            self.next_due = self.next_due.saturating_add(self.delay);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::graph::SectionGraph;
    use crate::region::GrowthStatus;

    fn setup(root: RegionConfig) -> (SectionGraph, RegionTree, CompletionPropagator) {
        (SectionGraph::new(), RegionTree::from_config(&root), CompletionPropagator::new())
    }

    #[test]
    fn test_run_to_completion_signals_once() {
        let (mut graph, mut regions, mut completions) =
            setup(RegionConfig::new("root", 6).with_child(RegionConfig::new("child", 4)));
        let signal = completions.subscribe();
        let mut ctx = GrowthContext {
            graph: &mut graph,
            regions: &mut regions,
            diagonal_chance: 0.2,
        };
        let root = ctx.regions.root();
        let task = GrowthTask::begin(&mut ctx, root, 8).unwrap();
        let mut run = GenerationRun::new(task, Duration::ZERO);

        run.run_to_completion(&mut ctx, &mut completions).unwrap();
        assert!(run.is_complete());
        assert_eq!(signal.try_recv(), Ok(()));
        assert!(signal.try_recv().is_err());
        assert!(ctx.regions.iter().all(|r| r.is_done()));

        // stepping a finished run is harmless
        assert_eq!(run.step(&mut ctx, &mut completions), Ok(RunStatus::Complete));
    }

    #[test]
    fn test_advance_honours_delay() {
        let (mut graph, mut regions, mut completions) = setup(RegionConfig::new("root", 50));
        let mut ctx = GrowthContext {
            graph: &mut graph,
            regions: &mut regions,
            diagonal_chance: 0.2,
        };
        let root = ctx.regions.root();
        let task = GrowthTask::begin(&mut ctx, root, 2).unwrap();
        let mut run = GenerationRun::new(task, Duration::from_millis(100));

        // first step is due at once
        run.advance(&mut ctx, &mut completions, Duration::ZERO).unwrap();
        assert_eq!(run.steps(), 1);

        run.advance(&mut ctx, &mut completions, Duration::from_millis(50)).unwrap();
        assert_eq!(run.steps(), 1);

        run.advance(&mut ctx, &mut completions, Duration::from_millis(50)).unwrap();
        assert_eq!(run.steps(), 2);

        run.advance(&mut ctx, &mut completions, Duration::from_millis(300)).unwrap();
        assert_eq!(run.steps(), 5);
    }

    #[test]
    fn test_zero_delay_runs_one_step_per_call() {
        let (mut graph, mut regions, mut completions) = setup(RegionConfig::new("root", 50));
        let mut ctx = GrowthContext {
            graph: &mut graph,
            regions: &mut regions,
            diagonal_chance: 0.2,
        };
        let root = ctx.regions.root();
        let task = GrowthTask::begin(&mut ctx, root, 2).unwrap();
        let mut run = GenerationRun::new(task, Duration::ZERO);

        for expected in 1..=3 {
            run.advance(&mut ctx, &mut completions, Duration::from_secs(10)).unwrap();
            assert_eq!(run.steps(), expected);
        }
    }

    #[test]
    fn test_failed_run_refuses_more_steps() {
        let (mut graph, mut regions, mut completions) = setup(RegionConfig::new("boxed", 2));
        for pos in [glam::IVec2::X, glam::IVec2::Y, glam::IVec2::NEG_X, glam::IVec2::NEG_Y] {
            graph.create_section(pos, crate::section::Archetype::Normal).unwrap();
        }
        let mut ctx = GrowthContext {
            graph: &mut graph,
            regions: &mut regions,
            diagonal_chance: 0.2,
        };
        let root = ctx.regions.root();
        let task = GrowthTask::begin(&mut ctx, root, 0).unwrap();
        let mut run = GenerationRun::new(task, Duration::ZERO);

        let err = run.run_to_completion(&mut ctx, &mut completions).unwrap_err();
        assert_eq!(err, GenerationError::SpaceExhausted { region: root });
        assert!(run.has_failed());
        assert_eq!(
            run.step(&mut ctx, &mut completions),
            Err(GenerationError::RunAborted)
        );
        assert!(!completions.has_fired());
    }

    #[test]
    fn test_cancel_drops_subtree_tasks() {
        let (mut graph, mut regions, mut completions) =
            setup(RegionConfig::new("root", 3).with_child(RegionConfig::new("child", 40)));
        let mut ctx = GrowthContext {
            graph: &mut graph,
            regions: &mut regions,
            diagonal_chance: 0.2,
        };
        let root = ctx.regions.root();
        let task = GrowthTask::begin(&mut ctx, root, 5).unwrap();
        let mut run = GenerationRun::new(task, Duration::ZERO);

        let child = RegionId(1);
        while ctx.regions[child].status() != GrowthStatus::Growing {
            run.step(&mut ctx, &mut completions).unwrap();
        }
        // root's last hand-off already popped it; only the child is left
        assert_eq!(run.cancel(ctx.regions, child), 1);
        ctx.regions.clear(ctx.graph, child);

        assert_eq!(run.step(&mut ctx, &mut completions), Ok(RunStatus::Cancelled));
        assert!(run.was_cancelled());
        assert!(run.is_complete());
        assert!(!completions.has_fired());
        assert_eq!(ctx.graph.len(), ctx.regions[root].owned_count());
    }
}
