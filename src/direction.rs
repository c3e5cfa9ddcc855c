//! The eight grid directions around a section
//!
//! Directions are numbered counter-clockwise starting at `Right`, so even
//! indices are cardinal and odd indices diagonal. Adjacency arrays, presence
//! masks and tile check-vectors all use this index order.

use glam::IVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the eight neighbour directions of a grid cell
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Right = 0,
    UpRight = 1,
    Up = 2,
    UpLeft = 3,
    Left = 4,
    DownLeft = 5,
    Down = 6,
    DownRight = 7,
}

impl Direction {
    /// Number of directions
    pub const COUNT: usize = 8;

    /// All directions in index order
    pub const ALL: [Direction; 8] = [
        Direction::Right,
        Direction::UpRight,
        Direction::Up,
        Direction::UpLeft,
        Direction::Left,
        Direction::DownLeft,
        Direction::Down,
        Direction::DownRight,
    ];

    /// The four cardinal directions in index order
    pub const CARDINALS: [Direction; 4] = [
        Direction::Right,
        Direction::Up,
        Direction::Left,
        Direction::Down,
    ];

    /// Direction for an index, wrapping modulo 8
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::COUNT]
    }

    /// Index of this direction (0..8)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Right, up, left and down are cardinal
    #[inline]
    pub fn is_cardinal(self) -> bool {
        self.index() % 2 == 0
    }

    /// Rotate by `steps` eighth-turns; positive is counter-clockwise
    #[inline]
    pub fn rotate(self, steps: i32) -> Self {
        let index = (self as i32 + steps).rem_euclid(Self::COUNT as i32);
        Self::ALL[index as usize]
    }

    /// The direction pointing back
    #[inline]
    pub fn opposite(self) -> Self {
        self.rotate(4)
    }

    /// Unit grid step for this direction (`Up` is +y)
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::Right => IVec2::new(1, 0),
            Direction::UpRight => IVec2::new(1, 1),
            Direction::Up => IVec2::new(0, 1),
            Direction::UpLeft => IVec2::new(-1, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::DownLeft => IVec2::new(-1, -1),
            Direction::Down => IVec2::new(0, -1),
            Direction::DownRight => IVec2::new(1, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposites() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.offset() + dir.opposite().offset(), IVec2::ZERO);
        }
    }

    #[test]
    fn test_rotate_wraps_both_ways() {
        assert_eq!(Direction::Right.rotate(-1), Direction::DownRight);
        assert_eq!(Direction::DownRight.rotate(1), Direction::Right);
        assert_eq!(Direction::Up.rotate(-10), Direction::Right);
        assert_eq!(Direction::Left.rotate(8), Direction::Left);
    }

    #[test]
    fn test_diagonal_offset_is_sum_of_flanking_cardinals() {
        for dir in Direction::CARDINALS {
            let ccw = dir.rotate(2);
            assert_eq!(dir.rotate(1).offset(), dir.offset() + ccw.offset());
        }
    }

    #[test]
    fn test_cardinals_are_even() {
        let cardinals: Vec<_> = Direction::ALL.iter().filter(|d| d.is_cardinal()).copied().collect();
        assert_eq!(cardinals, Direction::CARDINALS.to_vec());
    }
}
