//! Static rule parameters. `RuleSet::default()` carries the reference game.

use serde::{Deserialize, Serialize};

use crate::engine::{DiceTables, OutcomeTable, Position};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSet {
    /// Last space of the track; a racing camel past it ends the game.
    pub track_length: Position,
    pub dice: DiceTables,
    /// Round ticket faces per colour, top of the stack first.
    pub ticket_values: Vec<u8>,
    /// Payout of the n-th correct overall bet; the last value repeats.
    pub overall_payouts: Vec<i32>,
    pub overall_wrong: i32,
    /// Value of each guaranteed-draw token at round settlement.
    pub draw_payout: i32,
    /// Coins paid to a tile owner each time a group lands on the tile.
    pub tile_payout: i32,
    pub starting_coins: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            track_length: 16,
            dice: DiceTables::default(),
            ticket_values: vec![5, 3, 2, 2],
            overall_payouts: vec![8, 5, 3, 2, 1, 1, 1, 1],
            overall_wrong: -1,
            draw_payout: 1,
            tile_payout: 1,
            starting_coins: 3,
        }
    }
}

impl RuleSet {
    /// Replace the movement die with one built from its physical faces.
    ///
    /// ```
    /// use camel_odds::rules::RuleSet;
    /// let uniform = RuleSet::default().with_movement_faces([1, 1, 2, 2, 3, 3]);
    /// assert!((uniform.dice.movement.probability(&1) - 1.0 / 3.0).abs() < 1e-12);
    /// ```
    pub fn with_movement_faces(mut self, faces: impl IntoIterator<Item = u8>) -> Self {
        self.dice.movement = OutcomeTable::from_faces(faces);
        self
    }

    /// Starting space of a crazy camel for a grey-die value: 1 → last space, 2 → one before, ...
    #[inline]
    pub fn crazy_start(&self, value: u8) -> Position { (self.track_length + 1).saturating_sub(value).max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_constants() {
        let r = RuleSet::default();
        assert_eq!(r.track_length, 16);
        assert_eq!(r.ticket_values, vec![5, 3, 2, 2]);
        assert_eq!([r.crazy_start(1), r.crazy_start(2), r.crazy_start(3)], [16, 15, 14]);
    }
}
