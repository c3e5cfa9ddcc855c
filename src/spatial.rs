//! Spatial lookups for sections
//!
//! [`SpatialIndex`] answers the exact question growth needs: which section,
//! if any, occupies a grid cell. [`NearestSectionIndex`] (with the
//! `spatial-index` feature) answers the renderer's question: which section is
//! closest to an arbitrary world-space point.

use std::collections::HashMap;

use glam::IVec2;

#[cfg(feature = "spatial-index")]
use glam::Vec2;
#[cfg(feature = "spatial-index")]
use kiddo::immutable::float::kdtree::ImmutableKdTree;
#[cfg(feature = "spatial-index")]
use kiddo::SquaredEuclidean;

use crate::section::SectionId;

/// Grid occupancy map
///
/// One entry per live section; a cell can never hold two sections.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    cells: HashMap<IVec2, SectionId>,
}

impl SpatialIndex {
    /// Create an empty occupancy map
    pub fn new() -> Self {
        Self::default()
    }

    /// Section occupying `position`, if any
    #[inline]
    pub fn occupant(&self, position: IVec2) -> Option<SectionId> {
        self.cells.get(&position).copied()
    }

    /// Whether any section holds `position`
    #[inline]
    pub fn is_occupied(&self, position: IVec2) -> bool {
        self.cells.contains_key(&position)
    }

    /// Claim `position` for `section`
    ///
    /// Returns the current occupant instead of overwriting it when the cell
    /// is already taken.
    ///
    /// # Arguments
    ///
    /// * `position` - Grid cell to claim
    /// * `section` - Section that will occupy it
    ///
    /// # Example
    ///
    /// ```
    /// use dungeon_regions::{IVec2, SectionId, SpatialIndex};
    ///
    /// let mut index = SpatialIndex::new();
    /// assert!(index.insert(IVec2::ZERO, SectionId(0)).is_ok());
    /// assert_eq!(index.insert(IVec2::ZERO, SectionId(1)), Err(SectionId(0)));
    /// ```
    pub fn insert(&mut self, position: IVec2, section: SectionId) -> Result<(), SectionId> {
        match self.cells.get(&position) {
            Some(&existing) => Err(existing),
            None => {
                self.cells.insert(position, section);
                Ok(())
            }
        }
    }

    /// Free `position` if it is held by `section`
    ///
    /// A cell held by some other section is left alone; returns whether the
    /// cell was freed.
    pub fn remove(&mut self, position: IVec2, section: SectionId) -> bool {
        if self.cells.get(&position) == Some(&section) {
            self.cells.remove(&position);
            true
        } else {
            false
        }
    }

    /// Number of occupied cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no cell is occupied
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Free every cell
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

/// KD-tree over section world positions for nearest-section lookups
///
/// Built once from a finished map; O(log n) queries convert clicks, ray hits
/// or entity positions into section ids.
#[cfg(feature = "spatial-index")]
#[derive(Clone)]
pub struct NearestSectionIndex {
    tree: Option<ImmutableKdTree<f32, usize, 2, 32>>,
    ids: Vec<SectionId>,
}

#[cfg(feature = "spatial-index")]
impl NearestSectionIndex {
    /// Build the index from `(section, world position)` pairs
    ///
    /// Called once when growth completes. An empty slice gives an index
    /// that answers every query with `None`.
    ///
    /// # Arguments
    ///
    /// * `entries` - Section ids paired with their world-space centres
    ///
    /// # Example
    ///
    /// ```
    /// use dungeon_regions::*;
    /// use glam::Vec2;
    ///
    /// # #[cfg(feature = "spatial-index")]
    /// # {
    /// let index = NearestSectionIndex::new(&[
    ///     (SectionId(4), Vec2::new(0.0, 0.0)),
    ///     (SectionId(9), Vec2::new(1.0, 0.0)),
    /// ]);
    /// assert_eq!(index.find_nearest(Vec2::new(0.8, 0.1)), Some(SectionId(9)));
    /// # }
    /// ```
    pub fn new(entries: &[(SectionId, Vec2)]) -> Self {
        let points: Vec<[f32; 2]> = entries.iter().map(|(_, p)| [p.x, p.y]).collect();
        let ids = entries.iter().map(|(id, _)| *id).collect();

        // kiddo cannot build a tree from zero points
        let tree = if points.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(&points))
        };

        Self { tree, ids }
    }

    /// Section whose centre is nearest to `position`
    ///
    /// Returns `None` only when the index is empty.
    pub fn find_nearest(&self, position: Vec2) -> Option<SectionId> {
        let tree = self.tree.as_ref()?;
        let result = tree.nearest_one::<SquaredEuclidean>(&[position.x, position.y]);
        self.ids.get(result.item as usize).copied()
    }

    /// Number of indexed sections
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no sections
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
