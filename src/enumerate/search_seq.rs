use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::engine::{Board, DiceTables, EventPool};
use crate::error::EngineError;

use super::summary::{Layout, Summary};
use super::{check_grey_resolvable, draws_left, expand, is_terminal, AbortFlag, Deadline, EnumStats, Enumerate, EnumeratorConfig, NodeKey, RoundOutcome, starts_new_round};

/// Single-threaded round enumerator.
///
/// The memo survives across calls, so sibling decisions within one round
/// reuse each other's subtrees. It is dropped automatically when a call
/// arrives with different dice tables, or with a die back in the pool that
/// the previous call had already spent.
pub struct RoundEnumerator {
    cfg: EnumeratorConfig,
    abort: Option<AbortFlag>,
    cache: HashMap<NodeKey, Arc<Summary>>,
    cache_dice: Option<DiceTables>,
    /// Root pool of the last call, to spot round boundaries.
    cache_pool: Option<u8>,
    stats: EnumStats,
}

struct Walk<'a> {
    cfg: &'a EnumeratorConfig,
    dice: &'a DiceTables,
    layout: &'a Layout,
    deadline: &'a Deadline,
    cache: &'a mut HashMap<NodeKey, Arc<Summary>>,
    nodes: u64,
    hits: u64,
}

impl RoundEnumerator {
    pub fn new() -> Self { Self::with_config(EnumeratorConfig::default()) }

    pub fn with_config(cfg: EnumeratorConfig) -> Self {
        Self { cfg, abort: None, cache: HashMap::new(), cache_dice: None, cache_pool: None, stats: EnumStats::default() }
    }

    /// Attach a cancellation flag checked during enumeration.
    pub fn with_abort(mut self, flag: AbortFlag) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Enumerate the rest of the round from `board` with the dice in `pool`.
    ///
    /// Example
    /// ```
    /// use camel_odds::engine::{Board, Camel, Die, EventPool};
    /// use camel_odds::enumerate::{DrawOrder, EnumeratorConfig, RoundEnumerator};
    /// use camel_odds::rules::RuleSet;
    /// let board = Board::from_stacks(16, &[(10, &[Camel::Blue])]);
    /// let pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Grey]);
    /// let cfg = EnumeratorConfig { order: DrawOrder::Declared, ..EnumeratorConfig::default() };
    /// let out = RoundEnumerator::with_config(cfg).enumerate_board(&board, pool, &RuleSet::default().dice).unwrap();
    /// assert_eq!(out.position_distribution(Camel::Blue).len(), 3);
    /// ```
    pub fn enumerate_board(&mut self, board: &Board, pool: EventPool, dice: &DiceTables) -> Result<RoundOutcome, EngineError> {
        let start = Instant::now();
        if self.cache_dice.as_ref() != Some(dice) {
            self.cache.clear();
            self.cache_dice = Some(dice.clone());
        }
        if starts_new_round(self.cache_pool, pool) {
            self.cache.clear();
        }
        self.cache_pool = Some(pool.mask());
        board.track.check_invariants()?;
        let layout = Layout::for_board(board);
        let deadline = Deadline::new(&self.cfg, self.abort.clone(), start);
        let depth = self.cfg.depth_limit.unwrap_or(u32::MAX);
        check_grey_resolvable(board, pool, depth, &self.cfg)?;
        let mut walk = Walk { cfg: &self.cfg, dice, layout: &layout, deadline: &deadline, cache: &mut self.cache, nodes: 0, hits: 0 };
        let root = walk.node(board, pool, depth)?;
        let stats = EnumStats { nodes: walk.nodes, leaves: root.leaves, cache_hits: walk.hits, elapsed: start.elapsed() };
        self.stats = stats;
        debug!(nodes = stats.nodes, leaves = stats.leaves, cache_hits = stats.cache_hits, elapsed = ?stats.elapsed, "round enumerated");
        RoundOutcome::from_root(&root, &layout, board, stats)
    }

    /// Convenience wrapper over [`Self::enumerate_board`] for a full game state.
    pub fn enumerate(&mut self, state: &crate::engine::GameState) -> Result<RoundOutcome, EngineError> {
        self.enumerate_board(&state.board, state.pool, &state.rules.dice)
    }

    #[inline]
    pub fn config(&self) -> &EnumeratorConfig { &self.cfg }

    /// Statistics collected from the last enumeration.
    #[inline]
    pub fn last_stats(&self) -> EnumStats { self.stats }

    pub fn clear_cache(&mut self) { self.cache.clear(); }

    pub fn cache_len(&self) -> usize { self.cache.len() }
}

impl Walk<'_> {
    fn node(&mut self, board: &Board, pool: EventPool, depth_left: u32) -> Result<Arc<Summary>, EngineError> {
        self.nodes += 1;
        self.deadline.check(self.nodes)?;
        if is_terminal(board, pool, depth_left, self.cfg) {
            return Summary::leaf(board, self.layout).map(Arc::new);
        }
        let memo = self.cfg.cache_enabled && draws_left(pool, depth_left, self.cfg) >= self.cfg.par_thresholds.cache_min_draws;
        let key = memo.then(|| NodeKey::new(board, pool, depth_left, self.cfg));
        if let Some(hit) = key.as_ref().and_then(|k| self.cache.get(k)) {
            self.hits += 1;
            return Ok(Arc::clone(hit));
        }
        let mut acc = Summary::zeros(self.layout);
        for edge in expand(board, pool, self.dice, self.cfg, self.layout)? {
            let child = self.node(&edge.board, edge.pool, depth_left.saturating_sub(1))?;
            acc.absorb(edge.p, edge.target, &child);
        }
        let acc = Arc::new(acc);
        if let Some(k) = key {
            self.cache.insert(k, Arc::clone(&acc));
        }
        Ok(acc)
    }
}

impl Enumerate for RoundEnumerator {
    fn config(&self) -> &EnumeratorConfig { &self.cfg }

    fn enumerate_board(&mut self, board: &Board, pool: EventPool, dice: &DiceTables) -> Result<RoundOutcome, EngineError> {
        RoundEnumerator::enumerate_board(self, board, pool, dice)
    }

    fn clear_cache(&mut self) { RoundEnumerator::clear_cache(self) }

    fn last_stats(&self) -> EnumStats { self.stats }
}

impl Default for RoundEnumerator {
    fn default() -> Self { Self::new() }
}
