//! Hierarchical region-growth dungeon layout
//!
//! A standalone library that grows a connected, grid-aligned map as a tree
//! of regions, each claiming an exclusive quota of sections, then assigns
//! every section a tile template and rotation from its neighbour pattern.
//! Rendering is left to the caller: the output is a section graph plus one
//! `(template, rotation)` pair per section.
//!
//! # Quick Start
//!
//! ```rust
//! use dungeon_regions::*;
//!
//! // A courtyard that seeds a keep and a crypt once it is full
//! let config = GeneratorConfigBuilder::new()
//!     .seed(42)
//!     .root(
//!         RegionConfig::new("courtyard", 25)
//!             .with_child(RegionConfig::new("keep", 10))
//!             .with_child(RegionConfig::new("crypt", 15)),
//!     )
//!     .pacing(Pacing::Immediate)
//!     .build()
//!     .unwrap();
//!
//! let mut generator = Generator::new(config);
//! generator.generate().unwrap();
//!
//! // Assign tiles for rendering
//! let layout = generator.place_tiles(&[tiles::catalog::canonical()]).unwrap();
//! println!("Placed {} tiles", layout.placements.len());
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): nearest-section lookups from world positions via a KD-tree
//! - `serde`: serialization support for configuration and sections

// Modules
pub mod error;
pub mod config;
pub mod direction;
pub mod section;
pub mod spatial;
pub mod graph;
pub mod region;
pub mod growth;
pub mod completion;
pub mod tiles;
pub mod generator;

// Re-export core types for convenience
pub use error::{GenerationError, Result};
pub use config::{GeneratorConfig, GeneratorConfigBuilder, Pacing, RegionConfig};
pub use direction::Direction;
pub use section::{Archetype, Section, SectionId};
pub use spatial::SpatialIndex;
pub use graph::{SectionGraph, DEFAULT_DIAGONAL_CHANCE};
pub use region::{GrowthStatus, Region, RegionId, RegionTree};
pub use growth::{GenerationRun, GrowthContext, GrowthTask, RunStatus, StepOutcome};
pub use completion::CompletionPropagator;
pub use tiles::{CheckVector, TileMatch, TilePlacement, TileSet, TileTemplate};
pub use generator::{Generator, Stage, TileLayout};

#[cfg(feature = "spatial-index")]
pub use spatial::NearestSectionIndex;

// Re-export glam vectors for convenience
pub use glam::{IVec2, Vec2};
