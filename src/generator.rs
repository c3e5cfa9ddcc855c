//! Generator: the entry point tying growth, completion and tiles together

use std::fmt;
use std::thread;

use crossbeam_channel::Receiver;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::completion::CompletionPropagator;
use crate::config::{GeneratorConfig, Pacing};
use crate::error::{GenerationError, Result};
use crate::graph::SectionGraph;
use crate::growth::{GenerationRun, GrowthContext, GrowthTask, RunStatus};
use crate::region::{RegionId, RegionTree};
use crate::section::SectionId;
use crate::tiles::{TilePlacement, TileSet};

#[cfg(feature = "spatial-index")]
use crate::spatial::NearestSectionIndex;

/// Coarse progress label for an external progress display
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Nothing generated yet, or the map was cleared
    #[default]
    Idle,
    RegionGeneration,
    /// Growth finished; waiting for or performing tile placement
    TilePlacement,
    Complete,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::RegionGeneration => "region generation",
            Stage::TilePlacement => "tile placement",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tiles assigned to a finished map
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayout {
    /// Index of the tile set that was chosen
    pub tile_set: usize,
    /// One placement per section, in section creation order
    pub placements: Vec<TilePlacement>,
}

/// A region-growth dungeon generator
///
/// Owns the region tree (built once from configuration) and the section
/// graph of the current run. Each [`generate`](Self::generate) clears the
/// previous map and grows a new one.
///
/// # Example
///
/// ```
/// use dungeon_regions::*;
///
/// let config = GeneratorConfigBuilder::new()
///     .seed(42)
///     .root(RegionConfig::new("halls", 20).with_child(RegionConfig::new("vault", 6)))
///     .pacing(Pacing::Immediate)
///     .build()
///     .unwrap();
///
/// let mut generator = Generator::new(config);
/// let done = generator.completion();
/// generator.generate().unwrap();
/// assert!(done.try_recv().is_ok());
///
/// let layout = generator.place_tiles(&[tiles::catalog::canonical()]).unwrap();
/// assert_eq!(layout.placements.len(), generator.graph().len());
/// ```
pub struct Generator {
    config: GeneratorConfig,
    graph: SectionGraph,
    regions: RegionTree,
    completions: CompletionPropagator,
    run: Option<GenerationRun>,
    stage: Stage,
    rng: ChaCha8Rng,
    #[cfg(feature = "spatial-index")]
    nearest: Option<NearestSectionIndex>,
}

impl Generator {
    /// Build the region tree from `config`; nothing is grown yet
    pub fn new(config: GeneratorConfig) -> Self {
        let regions = RegionTree::from_config(&config.root);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            graph: SectionGraph::new(),
            regions,
            completions: CompletionPropagator::new(),
            run: None,
            stage: Stage::Idle,
            rng,
            #[cfg(feature = "spatial-index")]
            nearest: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    #[inline]
    pub fn graph(&self) -> &SectionGraph {
        &self.graph
    }

    #[inline]
    pub fn regions(&self) -> &RegionTree {
        &self.regions
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Receiver for the whole-tree completion signal
    ///
    /// Each call subscribes a new receiver; every receiver gets one `()` per
    /// completed run. A cancelled run sends nothing.
    pub fn completion(&mut self) -> Receiver<()> {
        self.completions.subscribe()
    }

    /// Sum of every region's quota
    pub fn full_target_size(&self) -> usize {
        self.regions.full_target_size(self.regions.root())
    }

    /// Sections grown so far across the whole tree
    pub fn full_section_count(&self) -> usize {
        self.regions.full_section_count(self.regions.root())
    }

    /// Growth progress as a fraction in `[0, 1]`
    pub fn progress(&self) -> f32 {
        let target = self.full_target_size();
        if target == 0 {
            return if self.stage == Stage::Idle { 0.0 } else { 1.0 };
        }
        (self.full_section_count() as f32 / target as f32).min(1.0)
    }

    /// Number of regions in the tree
    pub fn region_count(&self) -> usize {
        self.regions.region_count(self.regions.root())
    }

    /// World-space centre of a section
    pub fn world_position(&self, section: SectionId) -> Option<Vec2> {
        self.graph
            .get(section)
            .map(|s| s.world_position(self.config.cell_size))
    }

    /// Section nearest to a world-space point, once growth has completed
    #[cfg(feature = "spatial-index")]
    pub fn find_section_at(&self, position: Vec2) -> Option<SectionId> {
        self.nearest.as_ref()?.find_nearest(position)
    }

    /// Clear the previous map and start growing a new one
    ///
    /// With [`Pacing::Immediate`] the whole tree grows before this returns;
    /// with [`Pacing::Distributed`] the run waits for [`advance`](Self::advance),
    /// [`step`](Self::step) or [`run_paced`](Self::run_paced).
    pub fn generate(&mut self) -> Result<RunStatus> {
        self.start_run()?;
        match self.config.pacing {
            Pacing::Immediate => {
                self.drive(|run, ctx, completions| run.run_to_completion(ctx, completions))
            }
            Pacing::Distributed => Ok(RunStatus::Running),
        }
    }

    /// Clear the previous map and grow a new one synchronously, whatever the
    /// configured pacing
    pub fn generate_immediate(&mut self) -> Result<()> {
        self.start_run()?;
        self.drive(|run, ctx, completions| run.run_to_completion(ctx, completions))?;
        Ok(())
    }

    /// Run exactly one growth step
    pub fn step(&mut self) -> Result<RunStatus> {
        self.drive(|run, ctx, completions| run.step(ctx, completions))
    }

    /// Let `elapsed` time pass in distributed pacing
    pub fn advance(&mut self, elapsed: std::time::Duration) -> Result<RunStatus> {
        self.drive(|run, ctx, completions| run.advance(ctx, completions, elapsed))
    }

    /// Step the current run, sleeping the configured delay between steps
    ///
    /// `observer` sees the generator after every step, e.g. to redraw a
    /// preview.
    pub fn run_paced<F>(&mut self, mut observer: F) -> Result<()>
    where
        F: FnMut(&Generator),
    {
        let delay = self.config.step_delay();
        loop {
            let status = self.step()?;
            observer(self);
            if status != RunStatus::Running {
                return Ok(());
            }
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    /// Cancel any run and destroy every section
    pub fn clear(&mut self) {
        self.run = None;
        let root = self.regions.root();
        self.regions.clear(&mut self.graph, root);
        self.completions.reset();
        self.stage = Stage::Idle;
        #[cfg(feature = "spatial-index")]
        {
            self.nearest = None;
        }
    }

    /// Cancel growth of `region` and its descendants and destroy their sections
    ///
    /// The rest of the current run carries on, but the tree can no longer
    /// complete: the run ends as [`RunStatus::Cancelled`] and the completion
    /// signal does not fire. Clearing the root is the same as
    /// [`clear`](Self::clear).
    ///
    /// # Errors
    ///
    /// `RegionNotFound` if `region` is not part of the tree
    pub fn clear_region(&mut self, region: RegionId) -> Result<()> {
        if self.regions.get(region).is_none() {
            return Err(GenerationError::RegionNotFound(region));
        }
        if region == self.regions.root() {
            self.clear();
            return Ok(());
        }

        if let Some(run) = self.run.as_mut() {
            run.cancel(&self.regions, region);
        }
        self.regions.clear(&mut self.graph, region);
        #[cfg(feature = "spatial-index")]
        {
            if self.nearest.is_some() {
                self.nearest = Some(self.graph.nearest_index(self.config.cell_size));
            }
        }
        Ok(())
    }

    /// Pick one of `tile_sets` at random and tile every section
    ///
    /// # Errors
    ///
    /// `GrowthIncomplete` before the tree has finished growing,
    /// `InvalidTemplate` if `tile_sets` is empty, and `UnmatchedAdjacency`
    /// if the chosen set has no tile for some section.
    pub fn place_tiles<P>(&mut self, tile_sets: &[TileSet<P>]) -> Result<TileLayout> {
        if !matches!(self.stage, Stage::TilePlacement | Stage::Complete) {
            return Err(GenerationError::GrowthIncomplete);
        }
        if tile_sets.is_empty() {
            return Err(GenerationError::InvalidTemplate(
                "no tile sets to choose from".to_string(),
            ));
        }

        let index = self.rng.gen_range(0..tile_sets.len());
        let set = &tile_sets[index];
        log::info!("placing tiles using the '{}' tile set", set.name());

        self.stage = Stage::TilePlacement;
        let placements = set.place(&self.graph)?;
        self.stage = Stage::Complete;

        Ok(TileLayout {
            tile_set: index,
            placements,
        })
    }

    fn start_run(&mut self) -> Result<()> {
        self.clear();
        self.stage = Stage::RegionGeneration;

        let seed = self.rng.gen();
        let root = self.regions.root();
        let mut ctx = GrowthContext {
            graph: &mut self.graph,
            regions: &mut self.regions,
            diagonal_chance: self.config.diagonal_chance,
        };
        let task = GrowthTask::begin(&mut ctx, root, seed)?;
        self.run = Some(GenerationRun::new(task, self.config.step_delay()));

        log::info!(
            "generating {} sections across {} regions",
            self.full_target_size(),
            self.region_count()
        );
        Ok(())
    }

    /// Hand the current run its context and note completion afterwards
    fn drive<F>(&mut self, f: F) -> Result<RunStatus>
    where
        F: FnOnce(&mut GenerationRun, &mut GrowthContext<'_>, &mut CompletionPropagator) -> Result<RunStatus>,
    {
        let run = self.run.as_mut().ok_or(GenerationError::NotStarted)?;
        let mut ctx = GrowthContext {
            graph: &mut self.graph,
            regions: &mut self.regions,
            diagonal_chance: self.config.diagonal_chance,
        };
        let status = f(run, &mut ctx, &mut self.completions)?;

        if status == RunStatus::Complete && self.stage == Stage::RegionGeneration {
            self.stage = Stage::TilePlacement;
            #[cfg(feature = "spatial-index")]
            {
                self.nearest = Some(self.graph.nearest_index(self.config.cell_size));
            }
            log::info!(
                "generation complete: {} sections in {} regions",
                self.graph.len(),
                self.region_count()
            );
        }
        Ok(status)
    }
}
