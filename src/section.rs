//! Section node structure
//!
//! A section is one grid cell of the generated map. It knows its position,
//! its archetype, which sections it is linked to in each of the eight
//! directions, and which region currently owns it.

use std::fmt;

use glam::{IVec2, Vec2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::region::RegionId;

/// Index of a section in the [`SectionGraph`](crate::graph::SectionGraph) arena
///
/// Ids are never reused within a graph, so a stale id from a cleared run
/// simply resolves to nothing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub usize);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role of a section in the finished map
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Archetype {
    /// Any section grown by a region
    #[default]
    Normal,
    /// Where the root region started growing
    Start,
    /// Last section processed by a terminal region with `has_end`
    End,
}

/// A single grid-aligned section
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Section {
    /// Arena id of this section
    pub id: SectionId,

    /// Integer grid coordinate
    pub position: IVec2,

    /// Role of the section in the finished map
    pub archetype: Archetype,

    /// Linked neighbour per direction, indexed by [`Direction::index`]
    pub adjacent: [Option<SectionId>; 8],

    /// Region that currently owns this section (a back-reference only)
    pub region: Option<RegionId>,
}

impl Section {
    /// Create an unlinked, unowned section
    pub fn new(id: SectionId, position: IVec2, archetype: Archetype) -> Self {
        Self {
            id,
            position,
            archetype,
            adjacent: [None; 8],
            region: None,
        }
    }

    /// Neighbour linked in `dir`, if any
    #[inline]
    pub fn adjacent_in(&self, dir: Direction) -> Option<SectionId> {
        self.adjacent[dir.index()]
    }

    /// 8-bit presence vector, bit `i` set when direction `i` is linked
    pub fn presence_mask(&self) -> u8 {
        self.adjacent
            .iter()
            .enumerate()
            .filter(|(_, adj)| adj.is_some())
            .fold(0u8, |mask, (i, _)| mask | (1 << i))
    }

    /// Number of linked neighbours
    #[inline]
    pub fn link_count(&self) -> usize {
        self.adjacent.iter().filter(|adj| adj.is_some()).count()
    }

    /// World-space centre, with each grid cell `cell_size` wide
    #[inline]
    pub fn world_position(&self, cell_size: Vec2) -> Vec2 {
        self.position.as_vec2() * cell_size
    }
}
