use std::fmt;

use serde::{Deserialize, Serialize};

/// Camel identity. Doubles as the stable arena index of the piece on a [`Track`](super::Track).
///
/// The five racing camels move forward and are ranked; White and Black are the
/// crazy camels, which move backward and never rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Camel {
    Blue,
    Green,
    Yellow,
    Red,
    Purple,
    White,
    Black,
}

/// Movement category of a camel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CamelKind {
    /// Forward mover, ranked by (position, stack height).
    Racing,
    /// Reverse mover, excluded from ranking; carries whatever sits on its back.
    Crazy,
}

pub const CAMEL_COUNT: usize = 7;

pub const RACING_CAMELS: [Camel; 5] = [Camel::Blue, Camel::Green, Camel::Yellow, Camel::Red, Camel::Purple];

pub const CRAZY_CAMELS: [Camel; 2] = [Camel::White, Camel::Black];

pub const ALL_CAMELS: [Camel; CAMEL_COUNT] = [
    Camel::Blue,
    Camel::Green,
    Camel::Yellow,
    Camel::Red,
    Camel::Purple,
    Camel::White,
    Camel::Black,
];

impl Camel {
    #[inline]
    pub fn index(self) -> usize { self as usize }

    #[inline]
    pub fn from_index(idx: usize) -> Option<Camel> { ALL_CAMELS.get(idx).copied() }

    #[inline]
    pub fn kind(self) -> CamelKind {
        match self {
            Camel::White | Camel::Black => CamelKind::Crazy,
            _ => CamelKind::Racing,
        }
    }

    #[inline]
    pub fn is_racing(self) -> bool { self.kind() == CamelKind::Racing }

    #[inline]
    pub fn is_crazy(self) -> bool { self.kind() == CamelKind::Crazy }

    /// +1 for forward movers, -1 for reverse movers.
    #[inline]
    pub fn direction(self) -> i16 {
        match self.kind() {
            CamelKind::Racing => 1,
            CamelKind::Crazy => -1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Camel::Blue => "blue",
            Camel::Green => "green",
            Camel::Yellow => "yellow",
            Camel::Red => "red",
            Camel::Purple => "purple",
            Camel::White => "white",
            Camel::Black => "black",
        }
    }

    /// One-letter tag used by the compact board rendering.
    pub fn letter(self) -> char {
        match self {
            Camel::Blue => 'B',
            Camel::Green => 'G',
            Camel::Yellow => 'Y',
            Camel::Red => 'R',
            Camel::Purple => 'P',
            Camel::White => 'W',
            Camel::Black => 'K',
        }
    }
}

impl fmt::Display for Camel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Compact set of camels, one bit per [`Camel::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CamelSet(u8);

impl CamelSet {
    pub const EMPTY: CamelSet = CamelSet(0);

    pub fn racing() -> Self { RACING_CAMELS.iter().copied().collect() }

    #[inline]
    pub fn contains(self, camel: Camel) -> bool { self.0 & (1 << camel.index()) != 0 }

    #[inline]
    pub fn insert(&mut self, camel: Camel) { self.0 |= 1 << camel.index(); }

    #[inline]
    pub fn remove(&mut self, camel: Camel) { self.0 &= !(1 << camel.index()); }

    #[inline]
    pub fn len(self) -> usize { self.0.count_ones() as usize }

    #[inline]
    pub fn is_empty(self) -> bool { self.0 == 0 }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Camel> {
        ALL_CAMELS.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Camel> for CamelSet {
    fn from_iter<I: IntoIterator<Item = Camel>>(iter: I) -> Self {
        let mut set = CamelSet::EMPTY;
        for camel in iter { set.insert(camel); }
        set
    }
}
