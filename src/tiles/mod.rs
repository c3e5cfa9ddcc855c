//! Adjacency tile matching
//!
//! Each finished section is described by which of its eight neighbours it is
//! linked to. A [`TileSet`] resolves that pattern to exactly one template and
//! a rotation by comparing quaternary check-vectors:
//!
//! - two bits per direction, direction `i` at bits `2i..2i + 2`
//! - digit `0` means the neighbour must be absent, `1` present, `2` either
//! - rotating a vector left by four bits turns the pattern 90° counter-clockwise
//!
//! Templates are tried in reverse catalog order, so templates registered
//! later (the more specific ones) win over earlier, more generic ones.

pub mod catalog;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::error::{GenerationError, Result};
use crate::graph::SectionGraph;
use crate::section::SectionId;

/// Quaternary digit: neighbour must be absent
pub const ABSENT: u8 = 0;
/// Quaternary digit: neighbour must be present
pub const PRESENT: u8 = 1;
/// Quaternary digit: neighbour is ignored
pub const WILDCARD: u8 = 2;

/// A 16-bit, 2-bits-per-direction adjacency pattern
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CheckVector(pub u16);

impl CheckVector {
    /// Build a vector from one digit per direction, in [`Direction`] order
    pub const fn from_digits(digits: [u8; 8]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < 8 {
            bits |= ((digits[i] & 0b11) as u16) << (2 * i);
            i += 1;
        }
        CheckVector(bits)
    }

    /// Expand a section's presence mask; the result never holds wildcards
    pub fn from_presence(mask: u8) -> Self {
        let mut bits = 0u16;
        for i in 0..Direction::COUNT {
            if mask & (1 << i) != 0 {
                bits |= (PRESENT as u16) << (2 * i);
            }
        }
        CheckVector(bits)
    }

    #[inline]
    pub fn digit(self, dir: Direction) -> u8 {
        self.digit_at(dir.index())
    }

    #[inline]
    fn digit_at(self, index: usize) -> u8 {
        ((self.0 >> (2 * index)) & 0b11) as u8
    }

    /// Rotate by `steps` quarter turns counter-clockwise
    #[inline]
    pub fn rotated(self, steps: u32) -> Self {
        CheckVector(self.0.rotate_left(4 * (steps % 4)))
    }

    /// Every digit is 0, 1 or 2
    pub fn is_valid(self) -> bool {
        (0..Direction::COUNT).all(|i| self.digit_at(i) != 0b11)
    }
}

impl fmt::Display for CheckVector {
    /// Digits from `DownRight` down to `Right`, matching the bit layout
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..Direction::COUNT).rev() {
            write!(f, "{}", self.digit_at(i))?;
        }
        Ok(())
    }
}

/// Wildcard-aware comparison of a template against a section pattern
///
/// For each direction the template's digit is kept when either side is a
/// wildcard or both digits agree; otherwise the pattern's digit is written
/// in its place. The template accepts the pattern exactly when the result
/// equals the template.
pub fn matches(template: CheckVector, pattern: CheckVector) -> CheckVector {
    let mut bits = 0u16;
    for i in 0..Direction::COUNT {
        let t = template.digit_at(i);
        let p = pattern.digit_at(i);
        let digit = if t == WILDCARD || p == WILDCARD || t == p { t } else { p };
        bits |= (digit as u16) << (2 * i);
    }
    CheckVector(bits)
}

/// One entry of a tile catalog
#[derive(Debug, Clone, PartialEq)]
pub struct TileTemplate<P> {
    pub name: String,
    pub check: CheckVector,
    /// Distinct quarter-turn orientations this template stands for: 1, 2 or 4
    pub rotations: u8,
    /// Caller data handed back with each placement (a prefab, an asset key...)
    pub payload: P,
}

impl<P> TileTemplate<P> {
    pub fn new(name: impl Into<String>, check: CheckVector, rotations: u8, payload: P) -> Self {
        Self {
            name: name.into(),
            check,
            rotations,
            payload,
        }
    }

    /// Whether this template, turned `steps` quarter turns, accepts `pattern`
    pub fn accepts(&self, pattern: CheckVector, steps: u32) -> bool {
        let rotated = self.check.rotated(steps);
        matches(rotated, pattern) == rotated
    }
}

/// Result of matching one adjacency pattern
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileMatch {
    /// Catalog index of the winning template
    pub template: usize,
    /// Quarter turns applied to the template
    pub rotation_steps: u8,
    /// Counter-clockwise rotation in degrees (`90 * rotation_steps`)
    pub angle: f32,
}

/// Tile chosen for one section
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub section: SectionId,
    /// Catalog index into the [`TileSet`] used for placement
    pub template: usize,
    /// Counter-clockwise rotation in degrees
    pub rotation: f32,
}

/// A validated, immutable tile catalog
#[derive(Debug, Clone)]
pub struct TileSet<P> {
    name: String,
    templates: Vec<TileTemplate<P>>,
}

impl<P> TileSet<P> {
    /// Validate and wrap a catalog
    ///
    /// # Errors
    ///
    /// Returns `InvalidTemplate` if the catalog is empty, a rotation count is
    /// not 1, 2 or 4, or a check-vector uses the unused digit 3.
    pub fn new(name: impl Into<String>, templates: Vec<TileTemplate<P>>) -> Result<Self> {
        let name = name.into();
        if templates.is_empty() {
            return Err(GenerationError::InvalidTemplate(format!(
                "tile set '{}' has no templates",
                name
            )));
        }
        for template in &templates {
            if !matches!(template.rotations, 1 | 2 | 4) {
                return Err(GenerationError::InvalidTemplate(format!(
                    "template '{}' has rotation count {} (expected 1, 2 or 4)",
                    template.name, template.rotations
                )));
            }
            if !template.check.is_valid() {
                return Err(GenerationError::InvalidTemplate(format!(
                    "template '{}' check-vector {} uses digit 3",
                    template.name, template.check
                )));
            }
        }
        Ok(Self { name, templates })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn templates(&self) -> &[TileTemplate<P>] {
        &self.templates
    }

    #[inline]
    pub fn template(&self, index: usize) -> Option<&TileTemplate<P>> {
        self.templates.get(index)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Find the template and rotation for an 8-bit presence mask
    ///
    /// # Example
    ///
    /// ```
    /// use dungeon_regions::tiles::catalog;
    ///
    /// let tiles = catalog::canonical();
    /// let hit = tiles.find_match(0b0000_0000).unwrap();
    /// assert_eq!(tiles.templates()[hit.template].name, "solid block");
    /// assert_eq!(hit.angle, 0.0);
    /// ```
    pub fn find_match(&self, mask: u8) -> Option<TileMatch> {
        let pattern = CheckVector::from_presence(mask);
        self.templates
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, template)| {
                (0..template.rotations as u32)
                    .find(|&steps| template.accepts(pattern, steps))
                    .map(|steps| TileMatch {
                        template: index,
                        rotation_steps: steps as u8,
                        angle: 90.0 * steps as f32,
                    })
            })
    }

    /// Match one section of a graph
    ///
    /// # Errors
    ///
    /// `UnmatchedAdjacency` if no template accepts the section's mask, and
    /// `SectionNotFound` if the section does not exist.
    pub fn match_section(&self, graph: &SectionGraph, section: SectionId) -> Result<TileMatch> {
        let mask = graph.adjacency_mask(section)?;
        self.find_match(mask)
            .ok_or(GenerationError::UnmatchedAdjacency { section, mask })
    }

    /// Assign a tile to every live section, in creation order
    pub fn place(&self, graph: &SectionGraph) -> Result<Vec<TilePlacement>> {
        graph
            .iter()
            .map(|section| {
                let hit = self.match_section(graph, section.id)?;
                Ok(TilePlacement {
                    section: section.id,
                    template: hit.template,
                    rotation: hit.angle,
                })
            })
            .collect()
    }
}
