use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, IllegalAction};

use super::camel::{Camel, CamelSet, ALL_CAMELS, CAMEL_COUNT};
use super::tiles::{ModifierTile, TileSet};
use super::Position;

/// Spaces kept past the last track position so a finishing move never reallocates.
const FINISH_OVERRUN: usize = 8;

/// Where an arriving group goes relative to camels already on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Top,
    Under,
}

/// What a single [`Track::shift`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    /// The camel whose die was resolved (bottom of the moving group).
    pub camel: Camel,
    pub from: Position,
    /// Space reached before any tile effect; this is where a tile triggers.
    pub target: Position,
    /// Final resting space after the tile effect.
    pub to: Position,
    /// Size of the moving group, the resolved camel included.
    pub group_len: usize,
    pub tile: Option<ModifierTile>,
    /// A racing camel is past the last space after this move.
    pub finished: bool,
}

/// The camel track: an arena of camels indexed by [`Camel::index`] plus,
/// for every space, its stack of camels from bottom to top.
///
/// Invariant: every placed camel appears in exactly one stack, at the space its
/// arena slot records; stacks are gap-free vectors so heights are total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    length: Position,
    spots: [Option<Position>; CAMEL_COUNT],
    stacks: Vec<Vec<Camel>>,
}

impl Track {
    /// Empty track with spaces `1..=length`.
    pub fn new(length: Position) -> Self {
        Self {
            length,
            spots: [None; CAMEL_COUNT],
            stacks: vec![Vec::new(); length as usize + 1 + FINISH_OVERRUN],
        }
    }

    #[inline]
    pub fn length(&self) -> Position { self.length }

    /// Put `camel` on top of the stack at `position` (setup helper).
    ///
    /// A camel that is already on the track is pulled out of its stack first,
    /// alone; the camels above it drop down one level.
    pub fn place(&mut self, camel: Camel, position: Position) {
        let position = position.max(1);
        if let Some(from) = self.spots[camel.index()] {
            self.stacks[from as usize].retain(|&c| c != camel);
        }
        self.drop_group(vec![camel], position, Placement::Top);
    }

    #[inline]
    pub fn position(&self, camel: Camel) -> Option<Position> { self.spots[camel.index()] }

    /// Height in its stack, 0 = bottom.
    pub fn height(&self, camel: Camel) -> Option<usize> {
        let pos = self.position(camel)?;
        self.stacks[pos as usize].iter().position(|&c| c == camel)
    }

    /// Stack at `position`, bottom to top. Empty for unknown positions.
    pub fn stack(&self, position: Position) -> &[Camel] {
        self.stacks.get(position as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn is_occupied(&self, position: Position) -> bool { !self.stack(position).is_empty() }

    pub fn placed(&self) -> CamelSet { ALL_CAMELS.into_iter().filter(|c| self.spots[c.index()].is_some()).collect() }

    /// Racing camels currently on the track.
    pub fn racers(&self) -> CamelSet { self.placed().iter().filter(|c| c.is_racing()).collect() }

    /// True if any racing camel sits above `camel` in its stack.
    pub fn carries_racers(&self, camel: Camel) -> bool {
        match (self.position(camel), self.height(camel)) {
            (Some(pos), Some(h)) => self.stacks[pos as usize][h + 1..].iter().any(|c| c.is_racing()),
            _ => false,
        }
    }

    /// Resolve which crazy camel moves when the grey die shows `shown`.
    ///
    /// If exactly one crazy camel carries racing camels it moves. Otherwise, if
    /// both share a space with no racing camel between them, the upper one
    /// moves. Otherwise the shown one moves.
    pub fn crazy_to_move(&self, shown: Camel) -> Camel {
        let white = self.carries_racers(Camel::White);
        let black = self.carries_racers(Camel::Black);
        if white != black {
            return if white { Camel::White } else { Camel::Black };
        }
        if let (Some(pw), Some(pb)) = (self.position(Camel::White), self.position(Camel::Black)) {
            if let (true, Some(hw), Some(hb)) = (pw == pb, self.height(Camel::White), self.height(Camel::Black)) {
                let (lo, hi) = (hw.min(hb), hw.max(hb));
                let racer_between = self.stacks[pw as usize][lo + 1..hi].iter().any(|c| c.is_racing());
                if !racer_between {
                    return if hw > hb { Camel::White } else { Camel::Black };
                }
            }
        }
        shown
    }

    /// Move `camel` and everything stacked on it `steps` spaces in its own direction.
    ///
    /// A tile on the reached space shifts the group one more space (amplify) or one
    /// space back (dampen) and decides whether it lands on top or underneath.
    /// Nothing moves below space 1.
    pub fn shift(&mut self, camel: Camel, steps: u8, tiles: &TileSet) -> Result<MoveReport, IllegalAction> {
        let from = self.position(camel).ok_or(IllegalAction::CamelNotPlaced(camel))?;
        let dir = camel.direction();
        let target = step_from(from, dir * steps as i16);
        let tile = tiles.at(target).copied();
        let (to, placement) = match tile {
            Some(t) => (step_from(target, dir * t.polarity.offset()), t.polarity.placement()),
            None => (target, Placement::Top),
        };
        let group = self.lift(camel, from);
        let group_len = group.len();
        self.drop_group(group, to, placement);
        Ok(MoveReport { camel, from, target, to, group_len, tile, finished: self.race_finished() })
    }

    /// A racing camel has crossed the last space.
    pub fn race_finished(&self) -> bool {
        self.racers().iter().any(|c| self.spots[c.index()].is_some_and(|p| p > self.length))
    }

    /// Racing camels from first to last: higher space first, then higher in the stack.
    pub fn ranking(&self) -> Ranking {
        let mut order = Vec::with_capacity(5);
        for stack in self.stacks.iter().rev() {
            order.extend(stack.iter().rev().filter(|c| c.is_racing()));
        }
        Ranking(order)
    }

    /// Verify the arena/stack invariant.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        let mut seen = [0u8; CAMEL_COUNT];
        for (pos, stack) in self.stacks.iter().enumerate() {
            if pos == 0 && !stack.is_empty() {
                return Err(EngineError::invariant("camel on space 0"));
            }
            for &camel in stack {
                seen[camel.index()] += 1;
                if self.spots[camel.index()] != Some(pos as Position) {
                    return Err(EngineError::invariant(format!("{camel} stacked at {pos} but recorded elsewhere")));
                }
            }
        }
        for camel in ALL_CAMELS {
            let expected = u8::from(self.spots[camel.index()].is_some());
            if seen[camel.index()] != expected {
                return Err(EngineError::invariant(format!("{camel} appears {} times", seen[camel.index()])));
            }
        }
        Ok(())
    }

    fn lift(&mut self, camel: Camel, from: Position) -> Vec<Camel> {
        let stack = &mut self.stacks[from as usize];
        let h = stack.iter().position(|&c| c == camel).unwrap_or(stack.len());
        stack.split_off(h)
    }

    fn drop_group(&mut self, group: Vec<Camel>, to: Position, placement: Placement) {
        let idx = to as usize;
        if idx >= self.stacks.len() {
            self.stacks.resize(idx + 1, Vec::new());
        }
        for &c in &group {
            self.spots[c.index()] = Some(to);
        }
        let dest = &mut self.stacks[idx];
        match placement {
            Placement::Top => dest.extend(group),
            Placement::Under => {
                dest.splice(0..0, group);
            }
        }
    }
}

#[inline]
fn step_from(from: Position, delta: i16) -> Position { (from as i16 + delta).clamp(1, Position::MAX as i16) as Position }

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, stack) in self.stacks.iter().enumerate().filter(|(_, s)| !s.is_empty()) {
            let tag = if pos > self.length as usize { "FIN".to_string() } else { format!("{pos:>3}") };
            let camels: String = stack.iter().map(|c| c.letter()).collect();
            writeln!(f, "[{tag}] {camels}")?;
        }
        Ok(())
    }
}

/// Racing camels from first to last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ranking(Vec<Camel>);

impl Ranking {
    /// Build a ranking, rejecting crazy camels and duplicates.
    pub fn try_new(order: Vec<Camel>) -> Result<Self, EngineError> {
        let mut seen = CamelSet::EMPTY;
        for &camel in &order {
            if !camel.is_racing() {
                return Err(EngineError::invariant(format!("{camel} cannot be ranked")));
            }
            if seen.contains(camel) {
                return Err(EngineError::invariant(format!("{camel} ranked twice")));
            }
            seen.insert(camel);
        }
        Ok(Ranking(order))
    }

    #[inline]
    pub fn as_slice(&self) -> &[Camel] { &self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn first(&self) -> Option<Camel> { self.0.first().copied() }

    pub fn second(&self) -> Option<Camel> { self.0.get(1).copied() }

    pub fn last(&self) -> Option<Camel> { self.0.last().copied() }

    /// 0-based place of `camel`.
    pub fn place_of(&self, camel: Camel) -> Option<usize> { self.0.iter().position(|&c| c == camel) }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(" > "))
    }
}
