use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ahash::RandomState as AHasher;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::debug;

use crate::engine::{Board, DiceTables, EventPool, GameState};
use crate::error::EngineError;

use super::summary::{Layout, Summary};
use super::{
    check_grey_resolvable, draws_left, expand, is_terminal, AbortFlag, Deadline, EnumStats, Enumerate, EnumeratorConfig, NodeKey, ParThresholds,
    RoundOutcome, starts_new_round,
};

/// Parallel round enumerator using rayon and a shared `DashMap` memo.
///
/// Children of the top `par_levels` levels are evaluated concurrently, each on
/// its own board clone, then merged in declaration order. The result is
/// bit-identical to [`RoundEnumerator`](super::RoundEnumerator) for any pool size.
/// The memo follows the same round and dice-table lifetime as the sequential one.
pub struct RoundEnumeratorParallel {
    cfg: EnumeratorConfig,
    abort: Option<AbortFlag>,
    cache: DashMap<NodeKey, Arc<Summary>, AHasher>,
    cache_dice: Option<DiceTables>,
    /// Root pool of the last call, to spot round boundaries.
    cache_pool: Option<u8>,
    stats: EnumStats,
}

struct ParWalk<'a> {
    cfg: &'a EnumeratorConfig,
    dice: &'a DiceTables,
    layout: &'a Layout,
    deadline: &'a Deadline,
    cache: &'a DashMap<NodeKey, Arc<Summary>, AHasher>,
    nodes: AtomicU64,
    hits: AtomicU64,
}

impl RoundEnumeratorParallel {
    pub fn new() -> Self { Self::with_config(EnumeratorConfig::default()) }

    pub fn with_config(cfg: EnumeratorConfig) -> Self {
        Self { cfg, abort: None, cache: DashMap::with_hasher(AHasher::new()), cache_dice: None, cache_pool: None, stats: EnumStats::default() }
    }

    pub fn with_abort(mut self, flag: AbortFlag) -> Self {
        self.abort = Some(flag);
        self
    }

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
        let walk = ParWalk {
            cfg: &self.cfg,
            dice,
            layout: &layout,
            deadline: &deadline,
            cache: &self.cache,
            nodes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        };
        let root = walk.node(board, pool, depth, 0)?;
        let stats = EnumStats {
            nodes: walk.nodes.load(Ordering::Relaxed),
            leaves: root.leaves,
            cache_hits: walk.hits.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        };
        self.stats = stats;
        debug!(nodes = stats.nodes, leaves = stats.leaves, cache_hits = stats.cache_hits, elapsed = ?stats.elapsed, "round enumerated (parallel)");
        RoundOutcome::from_root(&root, &layout, board, stats)
    }

    pub fn enumerate(&mut self, state: &GameState) -> Result<RoundOutcome, EngineError> {
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

impl ParWalk<'_> {
    fn node(&self, board: &Board, pool: EventPool, depth_left: u32, level: u32) -> Result<Arc<Summary>, EngineError> {
        let n = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        self.deadline.check(n)?;
        if is_terminal(board, pool, depth_left, self.cfg) {
            return Summary::leaf(board, self.layout).map(Arc::new);
        }
        let memo = self.cfg.cache_enabled && draws_left(pool, depth_left, self.cfg) >= self.cfg.par_thresholds.cache_min_draws;
        let key = memo.then(|| NodeKey::new(board, pool, depth_left, self.cfg));
        if let Some(k) = key.as_ref() {
            if let Some(hit) = self.cache.get(k) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(hit.value()));
            }
        }
        let edges = expand(board, pool, self.dice, self.cfg, self.layout)?;
        let ParThresholds { par_levels, min_branches, .. } = self.cfg.par_thresholds;
        let children: Vec<Arc<Summary>> = if level < par_levels && edges.len() >= min_branches {
            edges
                .par_iter()
                .map(|e| self.node(&e.board, e.pool, depth_left.saturating_sub(1), level + 1))
                .collect::<Result<_, _>>()?
        } else {
            edges
                .iter()
                .map(|e| self.node(&e.board, e.pool, depth_left.saturating_sub(1), level + 1))
                .collect::<Result<_, _>>()?
        };
        let mut acc = Summary::zeros(self.layout);
        for (edge, child) in edges.iter().zip(&children) {
            acc.absorb(edge.p, edge.target, child);
        }
        let acc = Arc::new(acc);
        match key {
            Some(k) => Ok(Arc::clone(self.cache.entry(k).or_insert(acc).value())),
            None => Ok(acc),
        }
    }
}

impl Enumerate for RoundEnumeratorParallel {
    fn config(&self) -> &EnumeratorConfig { &self.cfg }

    fn enumerate_board(&mut self, board: &Board, pool: EventPool, dice: &DiceTables) -> Result<RoundOutcome, EngineError> {
        RoundEnumeratorParallel::enumerate_board(self, board, pool, dice)
    }

    fn clear_cache(&mut self) { RoundEnumeratorParallel::clear_cache(self) }

    fn last_stats(&self) -> EnumStats { self.stats }
}

impl Default for RoundEnumeratorParallel {
    fn default() -> Self { Self::new() }
}
