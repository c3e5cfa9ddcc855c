//! The canonical 15-template tile catalog
//!
//! The first six templates only look at the cardinal neighbours and, between
//! them and their rotations, cover every possible presence mask. The other
//! nine refine the open shapes by which diagonal neighbours are present and
//! win ties because they come later in the catalog.

use super::{CheckVector, TileSet, TileTemplate, WILDCARD as W};

/// Names and patterns in catalog order, digits in `Direction` order:
/// right, up-right, up, up-left, left, down-left, down, down-right
const CANONICAL: [(&str, [u8; 8], u8); 15] = [
    ("solid block", [0, W, 0, W, 0, W, 0, W], 1),
    ("dead end", [1, W, 0, W, 0, W, 0, W], 4),
    ("corridor", [1, W, 0, W, 1, W, 0, W], 2),
    ("corner", [1, W, 1, W, 0, W, 0, W], 4),
    ("tee", [1, W, 1, W, 1, W, 0, W], 4),
    ("crossroads", [1, W, 1, W, 1, W, 1, W], 1),
    ("corner room", [1, 1, 1, W, 0, W, 0, W], 4),
    ("room edge", [1, 1, 1, 1, 1, W, 0, W], 4),
    ("tee, right room", [1, 1, 1, 0, 1, W, 0, W], 4),
    ("tee, left room", [1, 0, 1, 1, 1, W, 0, W], 4),
    ("cross, one room corner", [1, 1, 1, 0, 1, 0, 1, 0], 4),
    ("cross, room side", [1, 1, 1, 1, 1, 0, 1, 0], 4),
    ("cross, diagonal rooms", [1, 1, 1, 0, 1, 1, 1, 0], 2),
    ("room inner corner", [1, 1, 1, 1, 1, 1, 1, 0], 4),
    ("room center", [1, 1, 1, 1, 1, 1, 1, 1], 1),
];

/// Number of templates in the canonical catalog
pub const CANONICAL_LEN: usize = CANONICAL.len();

/// The canonical catalog with no payload
pub fn canonical() -> TileSet<()> {
    canonical_with(|_| ())
}

/// The canonical catalog, attaching a payload to each template by name
///
/// # Example
///
/// ```
/// use dungeon_regions::tiles::catalog;
///
/// let tiles = catalog::canonical_with(|name| format!("prefabs/{}.ron", name.replace(' ', "_")));
/// assert_eq!(tiles.templates()[0].payload, "prefabs/solid_block.ron");
/// ```
pub fn canonical_with<P, F>(mut payload: F) -> TileSet<P>
where
    F: FnMut(&'static str) -> P,
{
    let templates = CANONICAL
        .iter()
        .map(|&(name, digits, rotations)| {
            TileTemplate::new(name, CheckVector::from_digits(digits), rotations, payload(name))
        })
        .collect();

    // the table above is fixed and covered by tests, so it skips validation
    TileSet {
        name: "canonical".to_string(),
        templates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::matches;

    #[test]
    fn test_canonical_catalog_is_valid() {
        let set = canonical();
        assert_eq!(set.len(), CANONICAL_LEN);
        let revalidated = TileSet::new("copy", set.templates().to_vec());
        assert!(revalidated.is_ok());
    }

    #[test]
    fn test_closed_over_every_presence_mask() {
        let set = canonical();
        for mask in 0..=u8::MAX {
            let hit = set.find_match(mask);
            assert!(hit.is_some(), "mask {:#010b} has no tile", mask);

            let hit = hit.unwrap();
            let template = &set.templates()[hit.template];
            let rotated = template.check.rotated(hit.rotation_steps as u32);
            assert_eq!(matches(rotated, CheckVector::from_presence(mask)), rotated);
            assert!(hit.rotation_steps < template.rotations);
        }
    }

    #[test]
    fn test_isolated_is_solid_block() {
        let set = canonical();
        let hit = set.find_match(0b0000_0000).unwrap();
        assert_eq!(set.templates()[hit.template].name, "solid block");
        assert_eq!(hit.rotation_steps, 0);
    }

    #[test]
    fn test_surrounded_is_room_center() {
        let set = canonical();
        let hit = set.find_match(0b1111_1111).unwrap();
        assert_eq!(set.templates()[hit.template].name, "room center");
        assert_eq!(hit.angle, 0.0);
    }

    #[test]
    fn test_cardinal_shapes_and_rotations() {
        let set = canonical();
        let name = |mask: u8| set.templates()[set.find_match(mask).unwrap().template].name.clone();
        let angle = |mask: u8| set.find_match(mask).unwrap().angle;

        // down only: a dead end turned three quarters
        assert_eq!(name(0b0100_0000), "dead end");
        assert_eq!(angle(0b0100_0000), 270.0);

        // up and down: a corridor turned once
        assert_eq!(name(0b0100_0100), "corridor");
        assert_eq!(angle(0b0100_0100), 90.0);

        // left and down without the diagonal between them
        assert_eq!(name(0b0101_0000), "corner");
        assert_eq!(angle(0b0101_0000), 180.0);

        assert_eq!(name(0b0101_0101), "crossroads");
    }

    #[test]
    fn test_diagonals_refine_open_shapes() {
        let set = canonical();
        let name = |mask: u8| set.templates()[set.find_match(mask).unwrap().template].name.clone();

        // right, up-right, up
        assert_eq!(name(0b0000_0111), "corner room");
        // right, up, left with both upper diagonals
        assert_eq!(name(0b0001_1111), "room edge");
        // same tee with only the up-right diagonal
        assert_eq!(name(0b0001_0111), "tee, right room");
        // all but the down-right diagonal
        assert_eq!(name(0b0111_1111), "room inner corner");
        // two opposite diagonals
        assert_eq!(name(0b0111_0111), "cross, diagonal rooms");
    }
}
