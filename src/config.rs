//! Generator configuration and builder
//!
//! This module describes everything a run needs besides the tile library:
//! the region hierarchy with its quotas, pacing, grid scale and the random
//! seed that makes a layout reproducible.

use std::time::Duration;

use glam::Vec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};
use crate::graph::DEFAULT_DIAGONAL_CHANCE;

/// Default quota for a region built with [`RegionConfig::default`]
pub const DEFAULT_TARGET_SIZE: usize = 30;

/// Description of one region and, recursively, its children
///
/// Child slots may be `None`; empty slots are kept so that a hierarchy edited
/// by hand (or deserialized with `null` entries) keeps its ordering, and are
/// skipped by growth and clearing.
///
/// # Example
///
/// ```rust
/// use dungeon_regions::RegionConfig;
///
/// let castle = RegionConfig::new("courtyard", 12)
///     .with_child(RegionConfig::new("keep", 8))
///     .with_child(RegionConfig::new("dungeon", 20).has_end(true));
///
/// assert_eq!(castle.children.len(), 2);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    /// Name used in log output and diagnostics
    pub name: String,

    /// Sections this region grows itself, excluding its children's quotas
    pub target_size: usize,

    /// Mark the last processed section as the map end (terminal regions only)
    pub has_end: bool,

    /// Child regions, seeded in this order once the quota is met
    pub children: Vec<Option<RegionConfig>>,
}

impl RegionConfig {
    /// A childless region; `has_end` defaults to true
    pub fn new(name: impl Into<String>, target_size: usize) -> Self {
        Self {
            name: name.into(),
            target_size,
            has_end: true,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: RegionConfig) -> Self {
        self.children.push(Some(child));
        self
    }

    /// Append an empty child slot
    pub fn with_empty_slot(mut self) -> Self {
        self.children.push(None);
        self
    }

    pub fn has_end(mut self, has_end: bool) -> Self {
        self.has_end = has_end;
        self
    }

    /// Number of configured regions in this subtree, empty slots excluded
    pub fn region_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(RegionConfig::region_count)
            .sum::<usize>()
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig::new("main", DEFAULT_TARGET_SIZE)
    }
}

/// How growth steps are scheduled
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// One step per timer tick, `generation_delay` seconds apart
    #[default]
    Distributed,
    /// Every step back to back in a single call
    Immediate,
}

/// Configuration for a dungeon generator
///
/// The same configuration (seed included) always grows the same map,
/// whichever pacing drives it.
///
/// # Example
///
/// ```rust
/// use dungeon_regions::*;
///
/// let config = GeneratorConfigBuilder::new()
///     .seed(7)
///     .root(RegionConfig::new("halls", 15))
///     .pacing(Pacing::Immediate)
///     .build()
///     .unwrap();
///
/// # #[cfg(feature = "serde")]
/// # {
/// let json = serde_json::to_string(&config).unwrap();
/// let restored: GeneratorConfig = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, restored);
/// # }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Random seed for growth and tile-set selection
    pub seed: u64,

    /// Root of the region hierarchy
    pub root: RegionConfig,

    pub pacing: Pacing,

    /// Seconds between steps in distributed pacing
    pub generation_delay: f32,

    /// World-space size of one grid cell
    pub cell_size: Vec2,

    /// Probability that a cardinal link also forms diagonal co-links
    pub diagonal_chance: f32,
}

impl GeneratorConfig {
    /// `generation_delay` as a duration
    ///
    /// The builder only accepts delays that fit a [`Duration`]; a value that
    /// does not (set through the public field or deserialized) counts as no
    /// delay.
    #[inline]
    pub fn step_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.generation_delay).unwrap_or(Duration::ZERO)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfigBuilder::new().assemble()
    }
}

/// Builder for [`GeneratorConfig`] with validation
///
/// Defaults:
/// - seed: random
/// - root: a single region of [`DEFAULT_TARGET_SIZE`] sections with an end
/// - pacing: distributed, no delay
/// - cell_size: 1 × 1
/// - diagonal_chance: 0.2
#[derive(Debug, Clone)]
pub struct GeneratorConfigBuilder {
    seed: Option<u64>,
    root: RegionConfig,
    pacing: Pacing,
    generation_delay: f32,
    cell_size: Vec2,
    diagonal_chance: f32,
}

impl GeneratorConfigBuilder {
    pub fn new() -> Self {
        Self {
            seed: None,
            root: RegionConfig::default(),
            pacing: Pacing::default(),
            generation_delay: 0.0,
            cell_size: Vec2::ONE,
            diagonal_chance: DEFAULT_DIAGONAL_CHANCE,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn root(mut self, root: RegionConfig) -> Self {
        self.root = root;
        self
    }

    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the pause between steps for distributed pacing
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the delay is negative, not finite or too
    /// large to represent as a [`Duration`]
    pub fn generation_delay(mut self, seconds: f32) -> Result<Self> {
        if Duration::try_from_secs_f32(seconds).is_err() {
            return Err(GenerationError::InvalidConfig(format!(
                "generation delay must be a finite number of seconds >= 0 (got {})",
                seconds
            )));
        }
        self.generation_delay = seconds;
        Ok(self)
    }

    /// Set the world-space size of a grid cell
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` unless both components are positive and finite
    pub fn cell_size(mut self, cell_size: Vec2) -> Result<Self> {
        if !cell_size.is_finite() || cell_size.cmple(Vec2::ZERO).any() {
            return Err(GenerationError::InvalidConfig(format!(
                "cell size must be positive (got {})",
                cell_size
            )));
        }
        self.cell_size = cell_size;
        Ok(self)
    }

    /// Set the diagonal co-link probability
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the chance is outside `[0, 1]`
    pub fn diagonal_chance(mut self, chance: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&chance) {
            return Err(GenerationError::InvalidConfig(format!(
                "diagonal chance must be within [0, 1] (got {})",
                chance
            )));
        }
        self.diagonal_chance = chance;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// If no seed was provided, a random one is drawn.
    pub fn build(self) -> Result<GeneratorConfig> {
        Ok(self.assemble())
    }

    fn assemble(self) -> GeneratorConfig {
        GeneratorConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            root: self.root,
            pacing: self.pacing,
            generation_delay: self.generation_delay,
            cell_size: self.cell_size,
            diagonal_chance: self.diagonal_chance,
        }
    }
}

impl Default for GeneratorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = GeneratorConfigBuilder::new().build().unwrap();
        assert_eq!(config.root.target_size, DEFAULT_TARGET_SIZE);
        assert!(config.root.has_end);
        assert_eq!(config.pacing, Pacing::Distributed);
        assert_eq!(config.cell_size, Vec2::ONE);
        assert_eq!(config.diagonal_chance, 0.2);
        assert_eq!(config.step_delay(), Duration::ZERO);
    }

    #[test]
    fn test_builder_custom() {
        let config = GeneratorConfigBuilder::new()
            .seed(42)
            .root(RegionConfig::new("a", 3).with_child(RegionConfig::new("b", 4)))
            .pacing(Pacing::Immediate)
            .generation_delay(0.25)
            .unwrap()
            .cell_size(Vec2::new(2.0, 3.0))
            .unwrap()
            .diagonal_chance(0.5)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.root.region_count(), 2);
        assert_eq!(config.pacing, Pacing::Immediate);
        assert_eq!(config.step_delay(), Duration::from_millis(250));
        assert_eq!(config.cell_size, Vec2::new(2.0, 3.0));
        assert_eq!(config.diagonal_chance, 0.5);
    }

    #[test]
    fn test_invalid_delay() {
        assert!(GeneratorConfigBuilder::new().generation_delay(-0.1).is_err());
        assert!(GeneratorConfigBuilder::new().generation_delay(f32::NAN).is_err());
        assert!(GeneratorConfigBuilder::new().generation_delay(f32::INFINITY).is_err());
        assert!(GeneratorConfigBuilder::new().generation_delay(0.0).is_ok());
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let err = GeneratorConfigBuilder::new().generation_delay(1e20).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig(_)));

        // a field edited past the builder degrades to no delay
        let mut config = GeneratorConfigBuilder::new().seed(1).build().unwrap();
        config.generation_delay = 1e20;
        assert_eq!(config.step_delay(), Duration::ZERO);
        config.generation_delay = -3.0;
        assert_eq!(config.step_delay(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_cell_size() {
        assert!(GeneratorConfigBuilder::new().cell_size(Vec2::new(0.0, 1.0)).is_err());
        assert!(GeneratorConfigBuilder::new().cell_size(Vec2::new(1.0, -2.0)).is_err());
    }

    #[test]
    fn test_invalid_diagonal_chance() {
        assert!(GeneratorConfigBuilder::new().diagonal_chance(1.5).is_err());
        assert!(GeneratorConfigBuilder::new().diagonal_chance(-0.01).is_err());
        assert!(GeneratorConfigBuilder::new().diagonal_chance(1.0).is_ok());
    }

    #[test]
    fn test_region_count_skips_empty_slots() {
        let root = RegionConfig::new("root", 1)
            .with_empty_slot()
            .with_child(RegionConfig::new("leaf", 1))
            .with_empty_slot();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.region_count(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization_keeps_empty_slots() {
        let config = GeneratorConfigBuilder::new()
            .seed(12345)
            .root(RegionConfig::new("root", 5).with_empty_slot().with_child(RegionConfig::new("c", 2)))
            .build()
            .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("null"));
        let restored: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
