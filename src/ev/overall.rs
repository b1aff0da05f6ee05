use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::engine::{Camel, Die, GameState, CAMEL_COUNT, CRAZY_CAMELS};
use crate::enumerate::RankingDistribution;
use crate::error::EngineError;

/// Draw cap for one projected game; a reachable state finishes long before.
const MAX_DRAWS: usize = 10_000;

/// How overall-bet EVs are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverallMode {
    /// Read P(first)/P(last) off the current round's distribution.
    #[default]
    RoundProxy,
    /// Play the rest of the game `games` times with dice only, leg by leg.
    Rollout { games: u32, seed: u64 },
}

/// Which estimate an [`Evaluation`](super::Evaluation) used for overall bets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallPrecision {
    /// Immediate-round approximation; ignores every later round.
    RoundProxy,
    /// Monte Carlo over full games; standard error shrinks with `games`.
    Rollout { games: u32 },
    /// No overall bet was among the options.
    NotNeeded,
}

/// Probability of each camel winning or losing the whole race.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalOdds {
    pub p_first: [f64; CAMEL_COUNT],
    pub p_last: [f64; CAMEL_COUNT],
}

impl FinalOdds {
    pub fn from_round(dist: &RankingDistribution) -> Self {
        let mut odds = FinalOdds { p_first: [0.0; CAMEL_COUNT], p_last: [0.0; CAMEL_COUNT] };
        for (ranking, w) in dist.iter() {
            if let Some(c) = ranking.first() {
                odds.p_first[c.index()] += w;
            }
            if let Some(c) = ranking.last() {
                odds.p_last[c.index()] += w;
            }
        }
        odds
    }

    #[inline]
    pub fn first(&self, camel: Camel) -> f64 { self.p_first[camel.index()] }

    #[inline]
    pub fn last(&self, camel: Camel) -> f64 { self.p_last[camel.index()] }
}

/// Seeded Monte Carlo projection of the final order.
///
/// Game `g` uses `StdRng::seed_from_u64(seed + g)` and results are tallied in
/// game order, so the estimate does not depend on the worker count.
pub fn rollout(state: &GameState, games: u32, seed: u64) -> Result<FinalOdds, EngineError> {
    let outcomes: Vec<(Camel, Camel)> = (0..games)
        .into_par_iter()
        .map(|g| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(g as u64));
            play_out(state, &mut rng)
        })
        .collect::<Result<_, _>>()?;
    let mut firsts = [0u32; CAMEL_COUNT];
    let mut lasts = [0u32; CAMEL_COUNT];
    for (first, last) in outcomes {
        firsts[first.index()] += 1;
        lasts[last.index()] += 1;
    }
    let n = games.max(1) as f64;
    debug!(games, seed, ?firsts, "overall rollout");
    Ok(FinalOdds { p_first: firsts.map(|c| c as f64 / n), p_last: lasts.map(|c| c as f64 / n) })
}

fn play_out(state: &GameState, rng: &mut StdRng) -> Result<(Camel, Camel), EngineError> {
    let mut board = state.board.clone();
    let mut pool = state.pool;
    for _ in 0..MAX_DRAWS {
        if board.race_finished() {
            let ranking = board.ranking();
            return match (ranking.first(), ranking.last()) {
                (Some(first), Some(last)) => Ok((first, last)),
                _ => Err(EngineError::invariant("finished race without racers")),
            };
        }
        if pool.is_round_complete() {
            pool.reset();
            board.tiles.clear();
        }
        let die = pool.draw(rng)?;
        if die == Die::Grey {
            if let Some(missing) = CRAZY_CAMELS.into_iter().find(|&c| board.track.position(c).is_none()) {
                return Err(EngineError::UnplayableBoard(format!("the grey die was drawn but {missing} is not on the track")));
            }
        }
        let roll = state.rules.dice.roll(die, rng).ok_or_else(|| EngineError::invariant(format!("{die} has no faces")))?;
        board.apply_roll(&roll)?;
    }
    Err(EngineError::invariant(format!("race not finished after {MAX_DRAWS} draws")))
}
