use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IllegalAction;

use super::camel::Camel;
use super::dice::{Die, Roll};
use super::tiles::{ModifierTile, Polarity, TileSet};
use super::track::{MoveReport, Ranking, Track};
use super::{PlayerId, Position};

/// Camels plus the modifier tiles lying on the track.
///
/// This is everything a die roll can touch, so it is also the part of the
/// state the enumerator clones and caches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    pub track: Track,
    pub tiles: TileSet,
}

impl Board {
    pub fn new(length: Position) -> Self { Self { track: Track::new(length), tiles: TileSet::new() } }

    /// Board with camels stacked bottom to top at each listed space.
    ///
    /// ```
    /// use camel_odds::engine::{Board, Camel};
    /// let b = Board::from_stacks(16, &[(3, &[Camel::Blue, Camel::Red])]);
    /// assert_eq!(b.track.stack(3), &[Camel::Blue, Camel::Red]);
    /// ```
    pub fn from_stacks(length: Position, stacks: &[(Position, &[Camel])]) -> Self {
        let mut board = Self::new(length);
        for &(pos, camels) in stacks {
            for &camel in camels {
                board.track.place(camel, pos);
            }
        }
        board
    }

    /// Resolve the camel a roll moves: the racing colour, or the crazy camel
    /// chosen by the carry rules for the grey die.
    #[inline]
    pub fn mover(&self, roll: &Roll) -> Camel {
        match roll.die {
            Die::Racing(camel) => camel,
            Die::Grey => self.track.crazy_to_move(roll.shown),
        }
    }

    /// Apply a resolved die to the track.
    pub fn apply_roll(&mut self, roll: &Roll) -> Result<MoveReport, IllegalAction> {
        let camel = self.mover(roll);
        self.track.shift(camel, roll.steps, &self.tiles)
    }

    pub fn place_tile(&mut self, position: Position, polarity: Polarity, owner: PlayerId) -> Result<(), IllegalAction> {
        self.tiles.place(ModifierTile { position, polarity, owner }, &self.track)
    }

    #[inline]
    pub fn race_finished(&self) -> bool { self.track.race_finished() }

    #[inline]
    pub fn ranking(&self) -> Ranking { self.track.ranking() }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.track.length() as usize;
        let width = last + 4;
        let columns: Vec<&[Camel]> = (1..=width).map(|p| self.track.stack(p as Position)).collect();
        let height = columns.iter().map(|s| s.len()).max().unwrap_or(0);
        writeln!(f)?;
        for level in (0..height).rev() {
            for col in &columns {
                let c = col.get(level).map_or(' ', |c| c.letter());
                write!(f, " {c} ")?;
            }
            writeln!(f)?;
        }
        for p in 1..=width {
            let mark = match self.tiles.at(p as Position).map(|t| t.polarity) {
                Some(Polarity::Amplify) => '+',
                Some(Polarity::Dampen) => '-',
                None if p > last => '>',
                None => '_',
            };
            write!(f, " {mark} ")?;
        }
        writeln!(f)?;
        for p in 1..=width {
            write!(f, "{p:>3}")?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_roll_moves_the_carrier() {
        let mut b = Board::from_stacks(16, &[(12, &[Camel::Black, Camel::Blue]), (14, &[Camel::White])]);
        let roll = Roll { die: Die::Grey, shown: Camel::White, steps: 2 };
        let report = b.apply_roll(&roll).unwrap();
        assert_eq!(report.camel, Camel::Black);
        assert_eq!(b.track.stack(10), &[Camel::Black, Camel::Blue]);
        assert_eq!(b.track.position(Camel::White), Some(14));
    }

    #[test]
    fn grey_roll_with_racer_between_crazies_moves_the_shown_one() {
        let mut b = Board::from_stacks(16, &[(12, &[Camel::White, Camel::Green, Camel::Black, Camel::Blue])]);
        let roll = Roll { die: Die::Grey, shown: Camel::White, steps: 1 };
        let report = b.apply_roll(&roll).unwrap();
        assert_eq!(report.camel, Camel::White);
        assert_eq!(b.track.stack(11), &[Camel::White, Camel::Green, Camel::Black, Camel::Blue]);
        assert!(b.track.stack(12).is_empty());
    }

    #[test]
    fn tile_trigger_reports_owner() {
        let mut b = Board::from_stacks(16, &[(3, &[Camel::Blue])]);
        b.place_tile(5, Polarity::Amplify, 2).unwrap();
        let report = b.apply_roll(&Roll { die: Die::Racing(Camel::Blue), shown: Camel::Blue, steps: 2 }).unwrap();
        assert_eq!(report.to, 6);
        assert_eq!(report.tile.map(|t| t.owner), Some(2));
    }

    #[test]
    fn display_marks_tiles_and_camels() {
        let mut b = Board::from_stacks(16, &[(2, &[Camel::Green, Camel::White])]);
        b.place_tile(6, Polarity::Dampen, 0).unwrap();
        let text = b.to_string();
        assert!(text.contains('G') && text.contains('W') && text.contains('-'));
    }
}
