use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::IllegalAction;

use super::camel::{Camel, RACING_CAMELS};

/// Discrete outcome distribution with explicit integer multiplicities.
///
/// Probabilities are `weight / total`; keeping integers makes every table exact
/// and lets two tables built from the same faces compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeTable<T> {
    outcomes: Vec<(T, u32)>,
    total: u32,
}

impl<T: Copy + PartialEq> OutcomeTable<T> {
    /// Build from `(value, weight)` pairs. Zero weights are dropped and
    /// repeated values are merged into their first occurrence.
    pub fn from_weights(pairs: impl IntoIterator<Item = (T, u32)>) -> Self {
        let mut outcomes: Vec<(T, u32)> = Vec::new();
        for (value, weight) in pairs.into_iter().filter(|&(_, w)| w > 0) {
            match outcomes.iter_mut().find(|(v, _)| *v == value) {
                Some((_, w)) => *w += weight,
                None => outcomes.push((value, weight)),
            }
        }
        let total = outcomes.iter().map(|&(_, w)| w).sum();
        Self { outcomes, total }
    }

    /// Build from the physical faces of a die, one entry per face.
    ///
    /// ```
    /// use camel_odds::engine::OutcomeTable;
    /// let d = OutcomeTable::from_faces([1u8, 1, 2, 2, 3, 3]);
    /// assert_eq!(d.len(), 3);
    /// assert!((d.probability(&2) - 1.0 / 3.0).abs() < 1e-12);
    /// ```
    pub fn from_faces(faces: impl IntoIterator<Item = T>) -> Self {
        Self::from_weights(faces.into_iter().map(|f| (f, 1)))
    }

    pub fn len(&self) -> usize { self.outcomes.len() }

    pub fn is_empty(&self) -> bool { self.outcomes.is_empty() }

    pub fn total(&self) -> u32 { self.total }

    /// `(value, probability)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (T, f64)> + '_ {
        let total = self.total as f64;
        self.outcomes.iter().map(move |&(v, w)| (v, w as f64 / total))
    }

    pub fn probability(&self, value: &T) -> f64 {
        self.outcomes
            .iter()
            .find(|(v, _)| v == value)
            .map_or(0.0, |&(_, w)| w as f64 / self.total as f64)
    }

    /// Draw one value. Tables are never empty when built by [`DiceTables`].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<T> {
        if self.total == 0 {
            return None;
        }
        let mut ticket = rng.gen_range(0..self.total);
        for &(value, weight) in &self.outcomes {
            if ticket < weight {
                return Some(value);
            }
            ticket -= weight;
        }
        None
    }
}

/// One of the six pyramid dice: a racing colour or the shared grey die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Die {
    Racing(Camel),
    Grey,
}

pub const DIE_COUNT: usize = 6;

impl Die {
    /// Declaration order: racing colours, then grey.
    pub const ALL: [Die; DIE_COUNT] = [
        Die::Racing(RACING_CAMELS[0]),
        Die::Racing(RACING_CAMELS[1]),
        Die::Racing(RACING_CAMELS[2]),
        Die::Racing(RACING_CAMELS[3]),
        Die::Racing(RACING_CAMELS[4]),
        Die::Grey,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Die::Racing(camel) => camel.index(),
            Die::Grey => 5,
        }
    }

    #[inline]
    pub fn bit(self) -> u8 { 1 << self.index() }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Die::Racing(camel) => write!(f, "{camel} die"),
            Die::Grey => f.write_str("grey die"),
        }
    }
}

/// A resolved die: which die, which camel face it showed, and how far.
///
/// For the grey die `shown` is the crazy camel printed on the face; the camel
/// that actually moves is decided by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roll {
    pub die: Die,
    pub shown: Camel,
    pub steps: u8,
}

/// Which dice the enumerator branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventMode {
    #[default]
    AllDice,
    /// Never branch on the grey die. It still counts toward the one-die-left rule,
    /// so tile payouts reachable only through crazy-camel moves are not seen.
    RacingOnly,
}

impl EventMode {
    #[inline]
    pub fn includes(self, die: Die) -> bool { !(self == EventMode::RacingOnly && die == Die::Grey) }
}

/// Face tables for the two die families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceTables {
    pub movement: OutcomeTable<u8>,
    pub grey: OutcomeTable<(Camel, u8)>,
}

impl Default for DiceTables {
    fn default() -> Self {
        Self {
            movement: OutcomeTable::from_weights([(1, 2), (2, 5), (3, 5)]),
            grey: OutcomeTable::from_faces([
                (Camel::White, 1),
                (Camel::White, 2),
                (Camel::White, 3),
                (Camel::Black, 1),
                (Camel::Black, 2),
                (Camel::Black, 3),
            ]),
        }
    }
}

impl DiceTables {
    /// Every face of `die` as a [`Roll`] with its probability, in table order.
    pub fn rolls(&self, die: Die) -> Vec<(Roll, f64)> {
        match die {
            Die::Racing(camel) => self.movement.iter().map(|(steps, p)| (Roll { die, shown: camel, steps }, p)).collect(),
            Die::Grey => self.grey.iter().map(|((shown, steps), p)| (Roll { die, shown, steps }, p)).collect(),
        }
    }

    pub fn roll<R: Rng + ?Sized>(&self, die: Die, rng: &mut R) -> Option<Roll> {
        match die {
            Die::Racing(camel) => self.movement.sample(rng).map(|steps| Roll { die, shown: camel, steps }),
            Die::Grey => self.grey.sample(rng).map(|(shown, steps)| Roll { die, shown, steps }),
        }
    }
}

/// Dice still in the pyramid this round, one bit per [`Die::index`].
///
/// The round is complete when a single die remains; it is never revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventPool {
    remaining: u8,
}

impl Default for EventPool {
    fn default() -> Self { Self::full() }
}

impl EventPool {
    pub const FULL_MASK: u8 = (1 << DIE_COUNT) - 1;

    pub fn full() -> Self { Self { remaining: Self::FULL_MASK } }

    /// Pool holding exactly `dice`.
    pub fn with_dice(dice: impl IntoIterator<Item = Die>) -> Self {
        Self { remaining: dice.into_iter().fold(0, |m, d| m | d.bit()) }
    }

    #[inline]
    pub fn mask(self) -> u8 { self.remaining }

    #[inline]
    pub fn contains(self, die: Die) -> bool { self.remaining & die.bit() != 0 }

    #[inline]
    pub fn len(self) -> usize { self.remaining.count_ones() as usize }

    #[inline]
    pub fn is_empty(self) -> bool { self.remaining == 0 }

    #[inline]
    pub fn is_round_complete(self) -> bool { self.len() <= 1 }

    pub fn dice(self) -> impl Iterator<Item = Die> { Die::ALL.into_iter().filter(move |d| self.contains(*d)) }

    /// Remaining dice the enumerator may branch on under `mode`.
    pub fn eligible(self, mode: EventMode) -> impl Iterator<Item = Die> { self.dice().filter(move |d| mode.includes(*d)) }

    /// Remove `die` from the pool.
    pub fn take(&mut self, die: Die) -> Result<(), IllegalAction> {
        if self.is_round_complete() {
            return Err(IllegalAction::RoundComplete);
        }
        if !self.contains(die) {
            return Err(IllegalAction::DieNotInPool(die.to_string()));
        }
        self.remaining &= !die.bit();
        Ok(())
    }

    /// Pull a uniformly random die out of the pyramid.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Die, IllegalAction> {
        if self.is_round_complete() {
            return Err(IllegalAction::RoundComplete);
        }
        let pick = rng.gen_range(0..self.len());
        let die = self.dice().nth(pick).ok_or(IllegalAction::RoundComplete)?;
        self.take(die)?;
        Ok(die)
    }

    pub fn reset(&mut self) { *self = Self::full(); }
}
