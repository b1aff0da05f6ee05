use serde::{Deserialize, Serialize};

use crate::error::IllegalAction;

use super::track::{Placement, Track};
use super::{PlayerId, Position};

/// Which face of a modifier tile is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarity {
    /// +1 space in the mover's direction; arrivals land on top.
    Amplify,
    /// -1 space against the mover's direction; arrivals slide underneath.
    Dampen,
}

impl Polarity {
    pub const BOTH: [Polarity; 2] = [Polarity::Amplify, Polarity::Dampen];

    #[inline]
    pub fn offset(self) -> i16 {
        match self {
            Polarity::Amplify => 1,
            Polarity::Dampen => -1,
        }
    }

    #[inline]
    pub fn placement(self) -> Placement {
        match self {
            Polarity::Amplify => Placement::Top,
            Polarity::Dampen => Placement::Under,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierTile {
    pub position: Position,
    pub polarity: Polarity,
    pub owner: PlayerId,
}

/// Tiles currently on the track, kept sorted by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSet {
    tiles: Vec<ModifierTile>,
}

impl TileSet {
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn at(&self, position: Position) -> Option<&ModifierTile> {
        self.tiles.iter().find(|t| t.position == position)
    }

    pub fn owned_by(&self, player: PlayerId) -> Option<&ModifierTile> {
        self.tiles.iter().find(|t| t.owner == player)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModifierTile> { self.tiles.iter() }

    pub fn len(&self) -> usize { self.tiles.len() }

    pub fn is_empty(&self) -> bool { self.tiles.is_empty() }

    /// Check whether `owner` may put a tile on `position` given the current track.
    ///
    /// Rejects the first space, anything past the last space, occupied spaces,
    /// spaces on or next to an existing tile, and a second tile for the same owner.
    pub fn check_placement(&self, position: Position, owner: PlayerId, track: &Track) -> Result<(), IllegalAction> {
        let last = track.length();
        if position < 2 || position > last {
            return Err(IllegalAction::TileOutOfBounds { position, last });
        }
        if self.owned_by(owner).is_some() {
            return Err(IllegalAction::TileAlreadyPlaced(owner));
        }
        if track.is_occupied(position) {
            return Err(IllegalAction::TileOnOccupiedSpace(position));
        }
        if let Some(existing) = self.tiles.iter().find(|t| t.position.abs_diff(position) <= 1) {
            return Err(IllegalAction::TileTooClose { position, existing: existing.position });
        }
        Ok(())
    }

    pub fn place(&mut self, tile: ModifierTile, track: &Track) -> Result<(), IllegalAction> {
        self.check_placement(tile.position, tile.owner, track)?;
        let idx = self.tiles.partition_point(|t| t.position < tile.position);
        self.tiles.insert(idx, tile);
        Ok(())
    }

    /// Positions where `owner` could legally place a tile right now.
    pub fn legal_positions(&self, owner: PlayerId, track: &Track) -> Vec<Position> {
        (2..=track.length()).filter(|&p| self.check_placement(p, owner, track).is_ok()).collect()
    }

    pub fn clear(&mut self) { self.tiles.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Camel;

    fn track_with_blue_at(pos: Position) -> Track {
        let mut track = Track::new(16);
        track.place(Camel::Blue, pos);
        track
    }

    #[test]
    fn rejects_bounds_and_occupied() {
        let track = track_with_blue_at(4);
        let tiles = TileSet::new();
        assert_eq!(tiles.check_placement(1, 0, &track), Err(IllegalAction::TileOutOfBounds { position: 1, last: 16 }));
        assert_eq!(tiles.check_placement(17, 0, &track), Err(IllegalAction::TileOutOfBounds { position: 17, last: 16 }));
        assert_eq!(tiles.check_placement(4, 0, &track), Err(IllegalAction::TileOnOccupiedSpace(4)));
        assert!(tiles.check_placement(2, 0, &track).is_ok());
        assert!(tiles.check_placement(16, 0, &track).is_ok());
    }

    #[test]
    fn rejects_same_and_adjacent_and_second_tile() {
        let track = track_with_blue_at(2);
        let mut tiles = TileSet::new();
        tiles.place(ModifierTile { position: 8, polarity: Polarity::Amplify, owner: 0 }, &track).unwrap();
        assert_eq!(tiles.check_placement(8, 1, &track), Err(IllegalAction::TileTooClose { position: 8, existing: 8 }));
        assert_eq!(tiles.check_placement(7, 1, &track), Err(IllegalAction::TileTooClose { position: 7, existing: 8 }));
        assert_eq!(tiles.check_placement(9, 1, &track), Err(IllegalAction::TileTooClose { position: 9, existing: 8 }));
        assert!(tiles.check_placement(10, 1, &track).is_ok());
        assert_eq!(tiles.check_placement(12, 0, &track), Err(IllegalAction::TileAlreadyPlaced(0)));
    }

    #[test]
    fn failed_place_leaves_set_untouched() {
        let track = track_with_blue_at(5);
        let mut tiles = TileSet::new();
        let before = tiles.clone();
        assert!(tiles.place(ModifierTile { position: 5, polarity: Polarity::Dampen, owner: 2 }, &track).is_err());
        assert_eq!(tiles, before);
    }

    #[test]
    fn legal_positions_skip_neighbours() {
        let track = track_with_blue_at(3);
        let mut tiles = TileSet::new();
        tiles.place(ModifierTile { position: 10, polarity: Polarity::Dampen, owner: 1 }, &track).unwrap();
        let legal = tiles.legal_positions(0, &track);
        assert!(!legal.contains(&3));
        assert!(!legal.contains(&9) && !legal.contains(&10) && !legal.contains(&11));
        assert!(legal.contains(&2) && legal.contains(&12));
        assert_eq!(legal.len(), 15 - 1 - 3);
    }

    #[test]
    fn kept_sorted_by_position() {
        let track = Track::new(16);
        let mut tiles = TileSet::new();
        tiles.place(ModifierTile { position: 12, polarity: Polarity::Amplify, owner: 0 }, &track).unwrap();
        tiles.place(ModifierTile { position: 4, polarity: Polarity::Dampen, owner: 1 }, &track).unwrap();
        let order: Vec<_> = tiles.iter().map(|t| t.position).collect();
        assert_eq!(order, vec![4, 12]);
    }
}
