//! Exact outcome enumerator for the rest of the current round.
//!
//! Two variants share one surface and one set of defaults:
//! - [`RoundEnumerator`]: single-threaded, `HashMap` memo.
//! - [`RoundEnumeratorParallel`]: rayon over the top of the branch tree, `DashMap` memo.
//!
//! Each node of the branch tree is summarised bottom-up as the conditional
//! outcome of the rest of the round from that node. A node is keyed by its board,
//! the dice still in the pool and the remaining depth, so identical states reached
//! through different draw orders are computed once. Children are always merged
//! in declaration order, which makes both variants bit-identical to each other
//! regardless of worker count, cache state or call order.
//!
//! Quick start
//! ```
//! use camel_odds::engine::{Board, Camel, Die, EventPool};
//! use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
//! use camel_odds::rules::RuleSet;
//!
//! let board = Board::from_stacks(16, &[(2, &[Camel::Blue]), (3, &[Camel::Red])]);
//! let pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Racing(Camel::Red), Die::Grey]);
//! let mut en = RoundEnumerator::with_config(EnumeratorConfig::reduced());
//! let out = en.enumerate_board(&board, pool, &RuleSet::default().dice).unwrap();
//! assert!((out.distribution.total_mass() - 1.0).abs() < 1e-9);
//! assert_eq!(out.leaves, 2 * 9);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::{Board, DiceTables, Die, EventMode, EventPool, GameState, Roll, CRAZY_CAMELS};
use crate::error::EngineError;

mod outcome;
mod search_par;
mod search_seq;
mod summary;

pub use outcome::{RankingDistribution, RoundOutcome, MASS_TOLERANCE};
pub use search_par::RoundEnumeratorParallel;
pub use search_seq::RoundEnumerator;

/// How the next die is chosen at each step of the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawOrder {
    /// Uniformly among the eligible dice left in the pyramid, as in live play.
    #[default]
    Drawn,
    /// Pool order (racing colours, then grey); the last die is never revealed.
    Declared,
}

/// Configurable knobs for the enumerator. Defaults enumerate every die exhaustively.
///
/// - `mode`: which dice are branched on.
/// - `order`: how the next die is picked.
/// - `depth_limit`: optional cap on resolutions enumerated from the root.
/// - `cache_enabled`: enable/disable the memo.
/// - `time_limit`: wall-clock bound; exceeding it fails the call.
/// - `par_thresholds`: used only by the parallel variant.
#[derive(Debug, Clone)]
pub struct EnumeratorConfig {
    pub mode: EventMode,
    pub order: DrawOrder,
    pub depth_limit: Option<u32>,
    pub cache_enabled: bool,
    pub time_limit: Option<Duration>,
    pub par_thresholds: ParThresholds,
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            mode: EventMode::AllDice,
            order: DrawOrder::Drawn,
            depth_limit: None,
            cache_enabled: true,
            time_limit: None,
            par_thresholds: ParThresholds::default(),
        }
    }
}

impl EnumeratorConfig {
    /// Racing dice only.
    pub fn reduced() -> Self { Self { mode: EventMode::RacingOnly, ..Self::default() } }
}

/// Thresholds used to balance parallel overheads.
#[derive(Debug, Clone, Copy)]
pub struct ParThresholds {
    /// Levels from the root whose children are evaluated with rayon.
    pub par_levels: u32,
    /// Minimum branching factor worth spawning for.
    pub min_branches: usize,
    /// Only nodes with at least this many draws left are memoised.
    pub cache_min_draws: u32,
}

impl Default for ParThresholds {
    fn default() -> Self { Self { par_levels: 2, min_branches: 4, cache_min_draws: 2 } }
}

/// Basic enumeration stats for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnumStats {
    pub nodes: u64,
    pub leaves: u64,
    pub cache_hits: u64,
    pub elapsed: Duration,
}

/// Shared cancellation signal for long enumerations.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self { Self::default() }

    pub fn abort(&self) { self.0.store(true, Ordering::Relaxed); }

    pub fn is_aborted(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

/// Common surface of both enumerator variants.
pub trait Enumerate {
    fn config(&self) -> &EnumeratorConfig;

    fn enumerate_board(&mut self, board: &Board, pool: EventPool, dice: &DiceTables) -> Result<RoundOutcome, EngineError>;

    fn enumerate(&mut self, state: &GameState) -> Result<RoundOutcome, EngineError> {
        self.enumerate_board(&state.board, state.pool, &state.rules.dice)
    }

    fn clear_cache(&mut self);

    fn last_stats(&self) -> EnumStats;
}

/// Memo key: everything a node's summary depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct NodeKey {
    board: Board,
    pool: u8,
    depth_left: u32,
    mode: EventMode,
    order: DrawOrder,
}

impl NodeKey {
    pub(crate) fn new(board: &Board, pool: EventPool, depth_left: u32, cfg: &EnumeratorConfig) -> Self {
        Self { board: board.clone(), pool: pool.mask(), depth_left, mode: cfg.mode, order: cfg.order }
    }
}

/// One outgoing branch of a node, already applied to a private board clone.
pub(crate) struct Edge {
    pub(crate) p: f64,
    pub(crate) target: usize,
    pub(crate) board: Board,
    pub(crate) pool: EventPool,
}

/// A node resolves nothing further when the race is over, the pool is down to
/// one die, the depth is spent, or no eligible die remains.
pub(crate) fn is_terminal(board: &Board, pool: EventPool, depth_left: u32, cfg: &EnumeratorConfig) -> bool {
    board.race_finished() || pool.is_round_complete() || depth_left == 0 || pool.eligible(cfg.mode).next().is_none()
}

/// The memo only holds nodes of one round: a root pool holding a die the
/// previous root had already spent means a new round began.
pub(crate) fn starts_new_round(previous: Option<u8>, pool: EventPool) -> bool {
    previous.is_some_and(|prev| pool.mask() & !prev != 0)
}

/// Reject boards on which an eligible grey die could be drawn while a crazy
/// camel is missing. Camels never leave the track, so checking the root is enough.
pub(crate) fn check_grey_resolvable(board: &Board, pool: EventPool, depth_left: u32, cfg: &EnumeratorConfig) -> Result<(), EngineError> {
    // Declared order reaches grey last, when it is the die left unrevealed.
    let grey_drawn = cfg.order == DrawOrder::Drawn && cfg.mode.includes(Die::Grey) && pool.contains(Die::Grey);
    if !grey_drawn || is_terminal(board, pool, depth_left, cfg) {
        return Ok(());
    }
    match CRAZY_CAMELS.into_iter().find(|&c| board.track.position(c).is_none()) {
        Some(missing) => Err(EngineError::UnplayableBoard(format!("the grey die can be drawn but {missing} is not on the track"))),
        None => Ok(()),
    }
}

/// Draws still to come from a non-terminal node, capped by depth. Used to decide what to memoise.
pub(crate) fn draws_left(pool: EventPool, depth_left: u32, cfg: &EnumeratorConfig) -> u32 {
    let eligible = pool.eligible(cfg.mode).count() as u32;
    let until_one_left = (pool.len() as u32).saturating_sub(1);
    eligible.min(until_one_left).min(depth_left)
}

/// Expand a non-terminal node into its weighted children, in declaration order.
pub(crate) fn expand(
    board: &Board,
    pool: EventPool,
    dice: &DiceTables,
    cfg: &EnumeratorConfig,
    layout: &summary::Layout,
) -> Result<Vec<Edge>, EngineError> {
    let dice_now: Vec<Die> = match cfg.order {
        DrawOrder::Drawn => pool.eligible(cfg.mode).collect(),
        DrawOrder::Declared => pool.eligible(cfg.mode).take(1).collect(),
    };
    let p_die = 1.0 / dice_now.len() as f64;
    let mut edges = Vec::with_capacity(dice_now.len() * 6);
    for die in dice_now {
        let mut rest = pool;
        rest.take(die)?;
        for (roll, p_face) in dice.rolls(die) {
            edges.push(apply_edge(board, rest, &roll, p_die * p_face, layout)?);
        }
    }
    Ok(edges)
}

fn apply_edge(board: &Board, pool: EventPool, roll: &Roll, p: f64, layout: &summary::Layout) -> Result<Edge, EngineError> {
    let mut child = board.clone();
    let report = child.apply_roll(roll)?;
    Ok(Edge { p, target: layout.slot(report.target), board: child, pool })
}

/// Wall-clock and abort checks, sampled every few hundred nodes.
#[derive(Debug, Clone)]
pub(crate) struct Deadline {
    until: Option<Instant>,
    abort: Option<AbortFlag>,
}

impl Deadline {
    const CHECK_EVERY: u64 = 256;

    pub(crate) fn new(cfg: &EnumeratorConfig, abort: Option<AbortFlag>, start: Instant) -> Self {
        Self { until: cfg.time_limit.map(|d| start + d), abort }
    }

    #[inline]
    pub(crate) fn check(&self, nodes: u64) -> Result<(), EngineError> {
        if nodes % Self::CHECK_EVERY != 0 {
            return Ok(());
        }
        let expired = self.until.is_some_and(|t| Instant::now() >= t);
        let aborted = self.abort.as_ref().is_some_and(AbortFlag::is_aborted);
        if expired || aborted {
            tracing::warn!(nodes, expired, aborted, "enumeration aborted");
            return Err(EngineError::DeadlineExceeded { nodes });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Camel;

    #[test]
    fn draws_left_respects_one_die_rule() {
        let cfg = EnumeratorConfig::default();
        assert_eq!(draws_left(EventPool::full(), u32::MAX, &cfg), 5);
        assert_eq!(draws_left(EventPool::full(), 2, &cfg), 2);
        let reduced = EnumeratorConfig::reduced();
        let pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Grey]);
        assert_eq!(draws_left(pool, u32::MAX, &reduced), 1);
        let pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Racing(Camel::Red)]);
        assert_eq!(draws_left(pool, u32::MAX, &reduced), 1);
    }

    #[test]
    fn abort_flag_trips_deadline() {
        let flag = AbortFlag::new();
        let deadline = Deadline::new(&EnumeratorConfig::default(), Some(flag.clone()), Instant::now());
        assert!(deadline.check(0).is_ok());
        flag.abort();
        assert_eq!(deadline.check(256), Err(EngineError::DeadlineExceeded { nodes: 256 }));
        assert!(deadline.check(257).is_ok());
    }
}
