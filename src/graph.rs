//! Section graph arena
//!
//! Sections live in a slot arena indexed by [`SectionId`]; links and region
//! ownership are plain ids, so the graph can hold cycles (convergence links,
//! diagonal shortcuts) without any shared-ownership bookkeeping.

use glam::IVec2;
use rand::Rng;

#[cfg(feature = "spatial-index")]
use glam::Vec2;

use crate::direction::Direction;
use crate::error::{GenerationError, Result};
use crate::region::RegionId;
use crate::section::{Archetype, Section, SectionId};
use crate::spatial::SpatialIndex;

#[cfg(feature = "spatial-index")]
use crate::spatial::NearestSectionIndex;

/// Default probability of forming diagonal co-links alongside a cardinal link
pub const DEFAULT_DIAGONAL_CHANCE: f32 = 0.2;

/// Arena of sections plus their grid occupancy
#[derive(Debug, Clone, Default)]
pub struct SectionGraph {
    slots: Vec<Option<Section>>,
    index: SpatialIndex,
}

impl SectionGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unlinked section at `position`
    ///
    /// Ids are handed out in creation order and never reused, even after
    /// [`remove_section`](Self::remove_section).
    ///
    /// # Arguments
    ///
    /// * `position` - Grid cell for the new section
    /// * `archetype` - Role of the section in the finished map
    ///
    /// # Example
    ///
    /// ```
    /// use dungeon_regions::*;
    ///
    /// let mut graph = SectionGraph::new();
    /// let a = graph.create_section(IVec2::ZERO, Archetype::Start).unwrap();
    /// let b = graph.create_section(IVec2::X, Archetype::Normal).unwrap();
    /// graph.connect(a, Direction::Right, b).unwrap();
    ///
    /// // b sees a on its left (direction 4)
/// assert_eq!(graph.adjacency_mask(b).unwrap(), 0b0001_0000);
    /// assert!(graph.create_section(IVec2::X, Archetype::Normal).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PositionOccupied` if another section already holds the cell.
    pub fn create_section(&mut self, position: IVec2, archetype: Archetype) -> Result<SectionId> {
        let id = SectionId(self.slots.len());
        self.index
            .insert(position, id)
            .map_err(|_| GenerationError::PositionOccupied { position })?;
        self.slots.push(Some(Section::new(id, position, archetype)));
        Ok(id)
    }

    /// Destroy a section, unlinking every neighbour that pointed at it
    ///
    /// Returns `false` if the section was already gone.
    pub fn remove_section(&mut self, id: SectionId) -> bool {
        let Some(section) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return false;
        };

        for dir in Direction::ALL {
            if let Some(neighbour) = section.adjacent_in(dir) {
                if let Some(Some(other)) = self.slots.get_mut(neighbour.0) {
                    let back = &mut other.adjacent[dir.opposite().index()];
                    if *back == Some(id) {
                        *back = None;
                    }
                }
            }
        }
        self.index.remove(section.position, id);
        true
    }

    /// Destroy every section
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.index.clear();
    }

    /// Section with `id`, unless it was never created or has been removed
    #[inline]
    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Like [`get`](Self::get), but a missing section is an error
    pub fn section(&self, id: SectionId) -> Result<&Section> {
        self.get(id).ok_or(GenerationError::SectionNotFound(id))
    }

    fn section_mut(&mut self, id: SectionId) -> Result<&mut Section> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GenerationError::SectionNotFound(id))
    }

    /// Whether `id` names a live section
    pub fn contains(&self, id: SectionId) -> bool {
        self.get(id).is_some()
    }

    /// Section occupying a grid cell, if any
    #[inline]
    pub fn occupant(&self, position: IVec2) -> Option<SectionId> {
        self.index.occupant(position)
    }

    /// Number of live sections
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the graph has no live sections
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live sections in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Change the role of a section
    ///
    /// # Errors
    ///
    /// Returns `SectionNotFound` if the section does not exist.
    pub fn set_archetype(&mut self, id: SectionId, archetype: Archetype) -> Result<()> {
        self.section_mut(id)?.archetype = archetype;
        Ok(())
    }

    /// Record `region` as the owner of a section
    ///
    /// Only the back-reference changes; the region's own owned list is kept
    /// by [`RegionTree`](crate::region::RegionTree).
    ///
    /// # Errors
    ///
    /// Returns `SectionNotFound` if the section does not exist.
    pub fn set_region(&mut self, id: SectionId, region: RegionId) -> Result<()> {
        self.section_mut(id)?.region = Some(region);
        Ok(())
    }

    /// Bidirectional link with no diagonal side effects
    pub fn connect(&mut self, a: SectionId, dir: Direction, b: SectionId) -> Result<()> {
        // validate both ends before touching either
        self.section(b)?;
        self.section_mut(a)?.adjacent[dir.index()] = Some(b);
        self.section_mut(b)?.adjacent[dir.opposite().index()] = Some(a);
        Ok(())
    }

    /// Link `a` to `b` in cardinal direction `dir`, then try diagonal co-links
    ///
    /// Each side of the link rolls once against `diagonal_chance`. On success
    /// it looks through the other section for neighbours two eighth-turns
    /// either side of the link; each one found sits diagonally next to this
    /// side and gets linked directly, in both directions.
    pub fn link<R: Rng + ?Sized>(
        &mut self,
        a: SectionId,
        dir: Direction,
        b: SectionId,
        diagonal_chance: f32,
        rng: &mut R,
    ) -> Result<()> {
        self.connect(a, dir, b)?;
        self.co_link_diagonals(a, dir, b, diagonal_chance, rng)?;
        self.co_link_diagonals(b, dir.opposite(), a, diagonal_chance, rng)
    }

    fn co_link_diagonals<R: Rng + ?Sized>(
        &mut self,
        from: SectionId,
        dir: Direction,
        via: SectionId,
        diagonal_chance: f32,
        rng: &mut R,
    ) -> Result<()> {
        let roll: f32 = rng.gen();
        if roll >= diagonal_chance {
            return Ok(());
        }

        let via_adjacent = self.section(via)?.adjacent;
        for side in [1, -1] {
            if let Some(diagonal) = via_adjacent[dir.rotate(2 * side).index()] {
                if diagonal != from {
                    self.connect(from, dir.rotate(side), diagonal)?;
                }
            }
        }
        Ok(())
    }

    /// 8-bit presence vector of a section's links
    pub fn adjacency_mask(&self, id: SectionId) -> Result<u8> {
        Ok(self.section(id)?.presence_mask())
    }

    /// Cardinal directions the section has no link in yet
    pub fn free_directions(&self, id: SectionId) -> Result<Vec<Direction>> {
        let section = self.section(id)?;
        Ok(Direction::CARDINALS
            .into_iter()
            .filter(|dir| section.adjacent_in(*dir).is_none())
            .collect())
    }

    /// Whether the grid cell next to the section in `dir` is empty
    pub fn is_space_free(&self, id: SectionId, dir: Direction) -> Result<bool> {
        let position = self.section(id)?.position + dir.offset();
        Ok(!self.index.is_occupied(position))
    }

    /// Whether some cardinal direction is both unlinked and physically empty
    pub fn has_free_space(&self, id: SectionId) -> Result<bool> {
        let section = self.section(id)?;
        Ok(Direction::CARDINALS.into_iter().any(|dir| {
            section.adjacent_in(dir).is_none()
                && !self.index.is_occupied(section.position + dir.offset())
        }))
    }

    /// KD-tree over the world positions of all live sections
    #[cfg(feature = "spatial-index")]
    pub fn nearest_index(&self, cell_size: Vec2) -> NearestSectionIndex {
        let entries: Vec<(SectionId, Vec2)> = self
            .iter()
            .map(|s| (s.id, s.world_position(cell_size)))
            .collect();
        NearestSectionIndex::new(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn graph_with(positions: &[(i32, i32)]) -> (SectionGraph, Vec<SectionId>) {
        let mut graph = SectionGraph::new();
        let ids = positions
            .iter()
            .map(|&(x, y)| graph.create_section(IVec2::new(x, y), Archetype::Normal).unwrap())
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_rejects_overlap() {
        let (mut graph, ids) = graph_with(&[(0, 0)]);
        let err = graph.create_section(IVec2::ZERO, Archetype::Normal).unwrap_err();
        assert_eq!(err, GenerationError::PositionOccupied { position: IVec2::ZERO });
        assert_eq!(graph.occupant(IVec2::ZERO), Some(ids[0]));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_connect_is_bidirectional() {
        let (mut graph, ids) = graph_with(&[(0, 0), (0, 1)]);
        graph.connect(ids[0], Direction::Up, ids[1]).unwrap();

        assert_eq!(graph.get(ids[0]).unwrap().adjacent_in(Direction::Up), Some(ids[1]));
        assert_eq!(graph.get(ids[1]).unwrap().adjacent_in(Direction::Down), Some(ids[0]));
        assert_eq!(graph.adjacency_mask(ids[0]).unwrap(), 1 << Direction::Up.index());
    }

    #[test]
    fn test_link_without_chance_forms_no_diagonals() {
        // a at origin, b to its right, c above b
        let (mut graph, ids) = graph_with(&[(0, 0), (1, 0), (1, 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        graph.connect(ids[1], Direction::Up, ids[2]).unwrap();
        graph.link(ids[0], Direction::Right, ids[1], 0.0, &mut rng).unwrap();

        assert_eq!(graph.get(ids[0]).unwrap().adjacent_in(Direction::UpRight), None);
        assert_eq!(graph.get(ids[0]).unwrap().link_count(), 1);
    }

    #[test]
    fn test_link_with_certain_chance_forms_both_diagonals() {
        // a at origin, b to its right, c above b, d below b
        let (mut graph, ids) = graph_with(&[(0, 0), (1, 0), (1, 1), (1, -1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        graph.connect(ids[1], Direction::Up, ids[2]).unwrap();
        graph.connect(ids[1], Direction::Down, ids[3]).unwrap();
        graph.link(ids[0], Direction::Right, ids[1], 1.0, &mut rng).unwrap();

        let a = graph.get(ids[0]).unwrap();
        assert_eq!(a.adjacent_in(Direction::UpRight), Some(ids[2]));
        assert_eq!(a.adjacent_in(Direction::DownRight), Some(ids[3]));
        assert_eq!(graph.get(ids[2]).unwrap().adjacent_in(Direction::DownLeft), Some(ids[0]));
        assert_eq!(graph.get(ids[3]).unwrap().adjacent_in(Direction::UpLeft), Some(ids[0]));
    }

    #[test]
    fn test_reverse_side_also_co_links() {
        // b to the right of a; a already has a neighbour above it
        let (mut graph, ids) = graph_with(&[(0, 0), (1, 0), (0, 1)]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        graph.connect(ids[0], Direction::Up, ids[2]).unwrap();
        graph.link(ids[0], Direction::Right, ids[1], 1.0, &mut rng).unwrap();

        // seen from b, the section above a is up-left
        assert_eq!(graph.get(ids[1]).unwrap().adjacent_in(Direction::UpLeft), Some(ids[2]));
        assert_eq!(graph.get(ids[2]).unwrap().adjacent_in(Direction::DownRight), Some(ids[1]));
    }

    #[test]
    fn test_remove_section_unlinks_and_is_idempotent() {
        let (mut graph, ids) = graph_with(&[(0, 0), (1, 0)]);
        graph.connect(ids[0], Direction::Right, ids[1]).unwrap();

        assert!(graph.remove_section(ids[1]));
        assert!(!graph.remove_section(ids[1]));
        assert_eq!(graph.adjacency_mask(ids[0]).unwrap(), 0);
        assert_eq!(graph.occupant(IVec2::new(1, 0)), None);
        assert_eq!(graph.len(), 1);
        assert_eq!(
            graph.adjacency_mask(ids[1]),
            Err(GenerationError::SectionNotFound(ids[1]))
        );
    }

    #[test]
    fn test_free_directions_and_space() {
        // centre with a linked neighbour right and an unlinked one above
        let (mut graph, ids) = graph_with(&[(0, 0), (1, 0), (0, 1)]);
        graph.connect(ids[0], Direction::Right, ids[1]).unwrap();

        let free = graph.free_directions(ids[0]).unwrap();
        assert_eq!(free, vec![Direction::Up, Direction::Left, Direction::Down]);
        assert!(!graph.is_space_free(ids[0], Direction::Up).unwrap());
        assert!(graph.is_space_free(ids[0], Direction::Left).unwrap());
        assert!(graph.has_free_space(ids[0]).unwrap());
    }

    #[test]
    fn test_enclosed_section_has_no_free_space() {
        let (graph, ids) = graph_with(&[(0, 0), (1, 0), (0, 1), (-1, 0), (0, -1)]);
        assert!(!graph.has_free_space(ids[0]).unwrap());
        assert_eq!(graph.free_directions(ids[0]).unwrap().len(), 4);
    }

    #[test]
    fn test_ids_are_not_reused_after_clear() {
        let (mut graph, ids) = graph_with(&[(0, 0)]);
        graph.clear();
        assert!(graph.is_empty());
        let fresh = graph.create_section(IVec2::ZERO, Archetype::Start).unwrap();
        assert_ne!(fresh, ids[0]);
        assert!(graph.get(ids[0]).is_none());
    }
}
