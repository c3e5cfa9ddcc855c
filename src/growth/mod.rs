//! Region growth
//!
//! A [`GrowthTask`] grows one region as a sequence of discrete steps. Each
//! call to [`GrowthTask::step`] does one unit of work (process one frontier
//! cursor, or hand one section to a child region) and returns; whoever owns
//! the task decides when the next step runs. [`schedule`] provides the two
//! drivers, immediate and distributed.
//!
//! # Algorithm
//!
//! 1. The anchor section is pushed onto a FIFO frontier.
//! 2. While the region owns no more than `target_size` sections, pop a
//!    cursor (falling back to the newest owned section that still has room),
//!    pick a random number of its unlinked cardinal directions and grow into
//!    them, creating sections or linking to ones the region already owns.
//! 3. With the quota met, hand one owned section to each child region, which
//!    then grows from it. A region without children may mark its last
//!    processed section as the map's end.

pub mod schedule;

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use glam::IVec2;

use crate::error::{GenerationError, Result};
use crate::graph::SectionGraph;
use crate::region::{GrowthStatus, RegionId, RegionTree};
use crate::section::{Archetype, SectionId};

pub use schedule::{GenerationRun, RunStatus};

/// How far back the next child's hand-off scan starts after the previous one
pub const HANDOFF_STRIDE: usize = 3;

/// Mutable state shared by every task of a run
pub struct GrowthContext<'a> {
    pub graph: &'a mut SectionGraph,
    pub regions: &'a mut RegionTree,
    /// Probability of diagonal co-links per side of each cardinal link
    pub diagonal_chance: f32,
}

/// What a step produced
#[derive(Debug)]
pub enum StepOutcome {
    /// More steps needed
    Continue,
    /// A child region received its anchor and should be driven next
    ///
    /// `finished` is set when this was the parent's last hand-off.
    Spawned { child: GrowthTask, finished: bool },
    /// The region's own growth is complete
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Growing,
    HandingOff,
    Finished,
}

/// Step-wise growth of a single region
#[derive(Debug)]
pub struct GrowthTask {
    region: RegionId,
    anchor: SectionId,
    rng: ChaCha8Rng,
    frontier: VecDeque<SectionId>,
    last_cursor: Option<SectionId>,
    phase: Phase,
    next_child: usize,
    scan_from: Option<usize>,
    /// Children cleared before their hand-off; never started
    skipped: Vec<RegionId>,
    steps: usize,
}

impl GrowthTask {
    /// Start growing `region` from a new `Start` section at the grid origin
    ///
    /// The region must have been cleared beforehand.
    pub fn begin(ctx: &mut GrowthContext<'_>, region: RegionId, seed: u64) -> Result<Self> {
        let start = ctx.graph.create_section(IVec2::ZERO, Archetype::Start)?;
        ctx.graph.set_region(start, region)?;
        ctx.regions.adopt(region, start);
        Ok(Self::new(ctx, region, start, seed))
    }

    /// Start growing `region` from a section it was handed
    fn resume_from(ctx: &mut GrowthContext<'_>, region: RegionId, anchor: SectionId, seed: u64) -> Self {
        Self::new(ctx, region, anchor, seed)
    }

    fn new(ctx: &mut GrowthContext<'_>, region: RegionId, anchor: SectionId, seed: u64) -> Self {
        ctx.regions.set_status(region, GrowthStatus::Growing);
        log::debug!(
            "region {} '{}' growing from section {}",
            region,
            ctx.regions[region].name,
            anchor
        );
        Self {
            region,
            anchor,
            rng: ChaCha8Rng::seed_from_u64(seed),
            frontier: VecDeque::from([anchor]),
            last_cursor: None,
            phase: Phase::Growing,
            next_child: 0,
            scan_from: None,
            skipped: Vec::new(),
            steps: 0,
        }
    }

    #[inline]
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Section this task started growing from
    #[inline]
    pub fn anchor(&self) -> SectionId {
        self.anchor
    }

    /// Steps taken so far
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Never hand off to `child`, if it has not been started yet
    pub(crate) fn skip_child(&mut self, child: RegionId) {
        if !self.skipped.contains(&child) {
            self.skipped.push(child);
        }
    }

    /// Perform one unit of work
    ///
    /// # Errors
    ///
    /// `SpaceExhausted` when growth has nowhere left to go and
    /// `HandoffFailed` when no owned section can seed a child. Both leave
    /// the region part-grown; the run must be cleared and restarted.
    pub fn step(&mut self, ctx: &mut GrowthContext<'_>) -> Result<StepOutcome> {
        match self.phase {
            Phase::Finished => Ok(StepOutcome::Finished),
            Phase::HandingOff => {
                self.steps += 1;
                self.hand_off(ctx)
            }
            Phase::Growing => {
                self.steps += 1;
                if !self.quota_met(ctx) {
                    self.grow_once(ctx)?;
                    if !self.quota_met(ctx) {
                        return Ok(StepOutcome::Continue);
                    }
                    return self.end_growth(ctx);
                }

                // quota met before any growth: a zero quota
                match self.end_growth(ctx)? {
                    StepOutcome::Continue => self.hand_off(ctx),
                    other => Ok(other),
                }
            }
        }
    }

    #[inline]
    fn quota_met(&self, ctx: &GrowthContext<'_>) -> bool {
        let region = &ctx.regions[self.region];
        region.owned_count() > region.target_size
    }

    /// Process one cursor
    fn grow_once(&mut self, ctx: &mut GrowthContext<'_>) -> Result<()> {
        let cursor = match self.frontier.pop_front() {
            Some(cursor) => cursor,
            None => {
                let index = self
                    .find_free_owned(ctx, None)?
                    .ok_or(GenerationError::SpaceExhausted { region: self.region })?;
                let cursor = ctx.regions[self.region].owned()[index];
                log::debug!("region {} frontier empty, backing up to {}", self.region, cursor);
                cursor
            }
        };
        self.last_cursor = Some(cursor);

        let mut free = ctx.graph.free_directions(cursor)?;
        if free.is_empty() {
            return Ok(());
        }

        // gen_range(1..1) would panic; one free direction means one branch
        let branches = if free.len() == 1 {
            1
        } else {
            self.rng.gen_range(1..free.len())
        };
        free.shuffle(&mut self.rng);

        let origin = ctx.graph.section(cursor)?.position;
        for dir in free.into_iter().take(branches) {
            if self.quota_met(ctx) {
                break;
            }

            let target = origin + dir.offset();
            match ctx.graph.occupant(target) {
                Some(existing) => {
                    let owner = ctx.graph.section(existing)?.region;
                    if owner.is_some_and(|owner| ctx.regions.is_within(owner, self.region)) {
                        ctx.graph
                            .link(cursor, dir, existing, ctx.diagonal_chance, &mut self.rng)?;
                    }
                }
                None => {
                    let room = ctx.graph.create_section(target, Archetype::Normal)?;
                    ctx.graph
                        .link(cursor, dir, room, ctx.diagonal_chance, &mut self.rng)?;
                    ctx.graph.set_region(room, self.region)?;
                    ctx.regions.push_grown(self.region, room);
                    self.frontier.push_back(room);
                }
            }
        }
        Ok(())
    }

    /// Index of the newest owned section at or below `from` with room to grow
    fn find_free_owned(&self, ctx: &GrowthContext<'_>, from: Option<usize>) -> Result<Option<usize>> {
        let owned = ctx.regions[self.region].owned();
        let Some(last) = owned.len().checked_sub(1) else {
            return Ok(None);
        };
        let start = from.map_or(last, |from| from.min(last));
        for index in (0..=start).rev() {
            if ctx.graph.has_free_space(owned[index])? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Quota met: either move on to hand-offs or wrap up as a terminal region
    fn end_growth(&mut self, ctx: &mut GrowthContext<'_>) -> Result<StepOutcome> {
        let region = &ctx.regions[self.region];
        let has_end = region.has_end;
        if region.child_ids().next().is_some() {
            self.phase = Phase::HandingOff;
            self.scan_from = region.owned_count().checked_sub(1);
            ctx.regions.set_status(self.region, GrowthStatus::HandingOff);
            return Ok(StepOutcome::Continue);
        }

        ctx.regions.set_status(self.region, GrowthStatus::Terminating);
        if has_end {
            let end = self.last_cursor.unwrap_or(self.anchor);
            ctx.graph.set_archetype(end, Archetype::End)?;
            log::debug!("region {} marked section {} as the end", self.region, end);
        }
        self.finish(ctx);
        Ok(StepOutcome::Finished)
    }

    /// Seed the next child region
    fn hand_off(&mut self, ctx: &mut GrowthContext<'_>) -> Result<StepOutcome> {
        let children: Vec<RegionId> = ctx.regions[self.region].child_ids().collect();
        while children
            .get(self.next_child)
            .is_some_and(|child| self.skipped.contains(child))
        {
            self.next_child += 1;
        }
        let Some(&child) = children.get(self.next_child) else {
            self.finish(ctx);
            return Ok(StepOutcome::Finished);
        };

        let index = match self.scan_from {
            Some(from) => self.find_free_owned(ctx, Some(from))?,
            None => None,
        }
        .ok_or(GenerationError::HandoffFailed {
            region: self.region,
            child,
        })?;

        let section = ctx.regions.transfer(ctx.graph, self.region, index, child)?;
        self.scan_from = index.checked_sub(HANDOFF_STRIDE);
        self.next_child += 1;
        log::debug!("region {} handed section {} to region {}", self.region, section, child);

        let finished = self.next_child == children.len();
        if finished {
            self.finish(ctx);
        }
        let seed = self.rng.gen();
        Ok(StepOutcome::Spawned {
            child: GrowthTask::resume_from(ctx, child, section, seed),
            finished,
        })
    }

    fn finish(&mut self, ctx: &mut GrowthContext<'_>) {
        self.phase = Phase::Finished;
        ctx.regions.set_status(self.region, GrowthStatus::Completed);
    }
}
