//! Region tree
//!
//! Regions form a tree built once from [`RegionConfig`]. Each region grows an
//! exclusive quota of sections, then seeds its child regions from sections it
//! owns. Regions are stored in a flat arena; the root is always `RegionId(0)`.

use std::fmt;
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::RegionConfig;
use crate::error::Result;
use crate::graph::SectionGraph;
use crate::section::SectionId;

/// Index of a region in its [`RegionTree`]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Where a region is in its own growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthStatus {
    #[default]
    Idle,
    Growing,
    HandingOff,
    Terminating,
    /// Own quota met and children started; descendants may still be growing
    Completed,
}

/// A node of the region tree
#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    /// Sections this region must grow itself, excluding descendants
    pub target_size: usize,
    /// Whether a terminal region marks its last processed section as the end
    pub has_end: bool,
    /// Child slots in hand-off order; empty slots are skipped
    pub children: Vec<Option<RegionId>>,
    pub parent: Option<RegionId>,
    owned: Vec<SectionId>,
    grown: usize,
    status: GrowthStatus,
    done: bool,
}

impl Region {
    /// Directly-owned sections, in the order they were acquired
    #[inline]
    pub fn owned(&self) -> &[SectionId] {
        &self.owned
    }

    #[inline]
    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    /// Sections this region created by growing (its anchor excluded)
    #[inline]
    pub fn grown_count(&self) -> usize {
        self.grown
    }

    #[inline]
    pub fn status(&self) -> GrowthStatus {
        self.status
    }

    /// Own growth and every descendant's growth have finished
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Non-empty child slots
    pub fn child_ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.children.iter().flatten().copied()
    }
}

/// Arena holding every region of a generator
#[derive(Debug, Clone)]
pub struct RegionTree {
    regions: Vec<Region>,
}

impl RegionTree {
    /// Build the tree from a root configuration (depth-first ids, root first)
    pub fn from_config(root: &RegionConfig) -> Self {
        let mut tree = Self { regions: Vec::new() };
        tree.insert(root, None);
        tree
    }

    fn insert(&mut self, config: &RegionConfig, parent: Option<RegionId>) -> RegionId {
        let id = RegionId(self.regions.len());
        self.regions.push(Region {
            id,
            name: config.name.clone(),
            target_size: config.target_size,
            has_end: config.has_end,
            children: Vec::with_capacity(config.children.len()),
            parent,
            owned: Vec::new(),
            grown: 0,
            status: GrowthStatus::Idle,
            done: false,
        });

        for child in &config.children {
            let slot = child.as_ref().map(|c| self.insert(c, Some(id)));
            self.regions[id.0].children.push(slot);
        }
        id
    }

    #[inline]
    pub fn root(&self) -> RegionId {
        RegionId(0)
    }

    #[inline]
    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Total number of regions in the tree
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// `region` and all of its descendants, parents before children
    pub fn subtree(&self, region: RegionId) -> Vec<RegionId> {
        let mut out = Vec::new();
        let mut stack = vec![region];
        while let Some(id) = stack.pop() {
            out.push(id);
            // reversed so children come out in slot order
            stack.extend(self[id].child_ids().collect::<Vec<_>>().into_iter().rev());
        }
        out
    }

    /// Number of regions in the subtree rooted at `region`
    pub fn region_count(&self, region: RegionId) -> usize {
        self.subtree(region).len()
    }

    /// Quota of `region` plus the quotas of all its descendants
    pub fn full_target_size(&self, region: RegionId) -> usize {
        let node = &self[region];
        node.target_size
            + node
                .child_ids()
                .map(|child| self.full_target_size(child))
                .sum::<usize>()
    }

    /// Sections grown so far by `region` and all its descendants
    pub fn full_section_count(&self, region: RegionId) -> usize {
        let node = &self[region];
        node.grown
            + node
                .child_ids()
                .map(|child| self.full_section_count(child))
                .sum::<usize>()
    }

    /// Whether `region` is `ancestor` or lies below it
    pub fn is_within(&self, region: RegionId, ancestor: RegionId) -> bool {
        let mut current = Some(region);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|r| r.parent);
        }
        false
    }

    /// Reset `region` and its descendants to `Idle` and destroy every
    /// section they own
    ///
    /// Sections that are already gone are skipped silently. Tasks still
    /// growing these regions must be dropped with
    /// [`GenerationRun::cancel`](crate::growth::GenerationRun::cancel);
    /// [`Generator::clear_region`](crate::generator::Generator::clear_region)
    /// does both.
    ///
    /// # Panics
    ///
    /// Panics if `region` does not belong to this tree.
    pub fn clear(&mut self, graph: &mut SectionGraph, region: RegionId) {
        for id in self.subtree(region) {
            let node = &mut self.regions[id.0];
            for section in node.owned.drain(..) {
                graph.remove_section(section);
            }
            node.grown = 0;
            node.status = GrowthStatus::Idle;
            node.done = false;
        }
    }

    pub(crate) fn set_status(&mut self, id: RegionId, status: GrowthStatus) {
        self.regions[id.0].status = status;
    }

    pub(crate) fn set_done(&mut self, id: RegionId) {
        self.regions[id.0].done = true;
    }

    /// Record a freshly grown section as owned by `region`
    pub(crate) fn push_grown(&mut self, id: RegionId, section: SectionId) {
        let node = &mut self.regions[id.0];
        node.owned.push(section);
        node.grown += 1;
    }

    /// Record a section `region` acquired without growing it
    pub(crate) fn adopt(&mut self, id: RegionId, section: SectionId) {
        self.regions[id.0].owned.push(section);
    }

    /// Remove the owned section at `index` from `from` and hand it to `to`
    pub(crate) fn transfer(
        &mut self,
        graph: &mut SectionGraph,
        from: RegionId,
        index: usize,
        to: RegionId,
    ) -> Result<SectionId> {
        let section = self.regions[from.0].owned.remove(index);
        graph.set_region(section, to)?;
        self.regions[to.0].owned.push(section);
        Ok(section)
    }
}

impl Index<RegionId> for RegionTree {
    type Output = Region;

    /// Panics if `id` does not belong to this tree
    fn index(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }
}
