//! Decision-making strategies and a seeded game runner.
//!
//! Strategies are a closed set of variants over one capability,
//! [`Strategy::choose_action`]. They only consume the enumerator and the EV
//! engine; none of them searches beyond the current decision.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::{ticket_ev, Action, EventMode, GameState, OverallSide, PlayerId, Polarity, RACING_CAMELS};
use crate::enumerate::{EnumeratorConfig, RoundEnumerator, RoundOutcome};
use crate::error::{EngineError, IllegalAction};
use crate::ev::{EvConfig, EvEngine};
use crate::rules::RuleSet;

/// Turn cap for one game; a live game ends far sooner.
const MAX_TURNS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Strategy {
    /// Uniform over the legal actions.
    Random,
    /// Highest immediate EV. Overall bets are only considered once the race is
    /// likely to end this round.
    Greedy { mode: EventMode, overall_threshold: f64 },
    /// Greedy over the next `depth` dice only.
    BoundedGreedy { depth: u32, mode: EventMode, overall_threshold: f64 },
    /// Casual rules of thumb: back a clear leader, cheer on busy spaces, else draw.
    Heuristic { leader_threshold: f64, min_dice_for_tile: usize, mode: EventMode },
    /// Low variance: confident tickets, then the guaranteed draw.
    Conservative { min_bet_prob: f64, min_overall_prob: f64, min_end_prob: f64, mode: EventMode },
}

impl Strategy {
    pub fn greedy() -> Self { Strategy::Greedy { mode: EventMode::AllDice, overall_threshold: 0.3 } }

    pub fn greedy_fast() -> Self { Strategy::Greedy { mode: EventMode::RacingOnly, overall_threshold: 0.3 } }

    pub fn bounded_greedy(depth: u32) -> Self { Strategy::BoundedGreedy { depth, mode: EventMode::AllDice, overall_threshold: 0.3 } }

    pub fn heuristic() -> Self { Strategy::Heuristic { leader_threshold: 0.4, min_dice_for_tile: 4, mode: EventMode::AllDice } }

    pub fn conservative() -> Self {
        Strategy::Conservative { min_bet_prob: 0.5, min_overall_prob: 0.6, min_end_prob: 0.4, mode: EventMode::AllDice }
    }

    /// Pick an action for the player on turn. `rng` only breaks ties and drives `Random`.
    pub fn choose_action(&self, state: &GameState, rng: &mut StdRng) -> Result<Action, EngineError> {
        let legal = state.legal_actions();
        let Some(&fallback) = legal.first() else {
            return Err(IllegalAction::GameOver.into());
        };
        let chosen = match *self {
            Strategy::Random => *legal.choose(rng).unwrap_or(&fallback),
            Strategy::Greedy { mode, overall_threshold } => greedy(state, enumerator_config(mode, None), overall_threshold, rng)?,
            Strategy::BoundedGreedy { depth, mode, overall_threshold } => {
                greedy(state, enumerator_config(mode, Some(depth)), overall_threshold, rng)?
            }
            Strategy::Heuristic { leader_threshold, min_dice_for_tile, mode } => {
                let outcome = RoundEnumerator::with_config(enumerator_config(mode, None)).enumerate(state)?;
                heuristic(state, &legal, &outcome, leader_threshold, min_dice_for_tile, mode).unwrap_or_else(|| *legal.choose(rng).unwrap_or(&fallback))
            }
            Strategy::Conservative { min_bet_prob, min_overall_prob, min_end_prob, mode } => {
                let outcome = RoundEnumerator::with_config(enumerator_config(mode, None)).enumerate(state)?;
                conservative(state, &legal, &outcome, min_bet_prob, min_overall_prob, min_end_prob)
                    .unwrap_or_else(|| *legal.choose(rng).unwrap_or(&fallback))
            }
        };
        trace!(player = state.current, action = %chosen, "chosen");
        Ok(chosen)
    }
}

fn enumerator_config(mode: EventMode, depth_limit: Option<u32>) -> EnumeratorConfig {
    EnumeratorConfig { mode, depth_limit, ..EnumeratorConfig::default() }
}

fn greedy(state: &GameState, cfg: EnumeratorConfig, overall_threshold: f64, rng: &mut StdRng) -> Result<Action, EngineError> {
    let mut engine = EvEngine::with_config(RoundEnumerator::with_config(cfg), EvConfig::default());
    let eval = engine.evaluate(state, state.current)?;
    let early = eval.outcome.p_race_ends < overall_threshold;
    let candidates: Vec<_> = eval
        .actions
        .iter()
        .filter(|a| !(early && matches!(a.action, Action::BetOverall { .. })))
        .collect();
    let Some(lead) = candidates.first() else {
        return eval.best().map(|a| a.action).ok_or_else(|| IllegalAction::GameOver.into());
    };
    let eps = engine.config().tie_epsilon;
    let tied: Vec<Action> = candidates.iter().take_while(|a| lead.ev - a.ev <= eps).map(|a| a.action).collect();
    Ok(*tied.choose(rng).unwrap_or(&lead.action))
}

fn heuristic(
    state: &GameState,
    legal: &[Action],
    outcome: &RoundOutcome,
    leader_threshold: f64,
    min_dice_for_tile: usize,
    mode: EventMode,
) -> Option<Action> {
    let dist = &outcome.distribution;
    let leader = RACING_CAMELS.into_iter().max_by(|a, b| dist.p_first(*a).total_cmp(&dist.p_first(*b)))?;
    if dist.p_first(leader) >= leader_threshold && legal.contains(&Action::TakeTicket(leader)) {
        return Some(Action::TakeTicket(leader));
    }
    if state.pool.eligible(mode).count() >= min_dice_for_tile {
        let best_tile = legal
            .iter()
            .filter_map(|a| match *a {
                Action::PlaceTile { position, polarity: Polarity::Amplify } => Some((*a, outcome.expected_landings(position))),
                _ => None,
            })
            .fold(None, |best: Option<(Action, f64)>, (a, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((a, p)),
            });
        if let Some((tile, p)) = best_tile {
            if p >= 0.2 {
                return Some(tile);
            }
        }
    }
    if legal.contains(&Action::Draw) {
        return Some(Action::Draw);
    }
    if outcome.p_race_ends > 0.5 {
        return obvious_overall(legal, outcome, 0.7);
    }
    None
}

fn conservative(
    state: &GameState,
    legal: &[Action],
    outcome: &RoundOutcome,
    min_bet_prob: f64,
    min_overall_prob: f64,
    min_end_prob: f64,
) -> Option<Action> {
    let dist = &outcome.distribution;
    let confident = legal
        .iter()
        .filter_map(|a| match *a {
            Action::TakeTicket(camel) => {
                let top_two = dist.p_first(camel) + dist.p_second(camel);
                let value = state.tickets.top(camel).unwrap_or(0);
                let ev = ticket_ev(value, dist.p_first(camel), dist.p_second(camel), dist.p_rest(camel));
                (top_two > min_bet_prob).then_some((*a, ev))
            }
            _ => None,
        })
        .fold(None, |best: Option<(Action, f64)>, (a, ev)| match best {
            Some((_, bev)) if bev >= ev => best,
            _ => Some((a, ev)),
        });
    if let Some((ticket, _)) = confident {
        return Some(ticket);
    }
    if legal.contains(&Action::Draw) {
        return Some(Action::Draw);
    }
    if outcome.p_race_ends >= min_end_prob {
        if let Some(bet) = obvious_overall(legal, outcome, min_overall_prob) {
            return Some(bet);
        }
    }
    legal.iter().copied().find(|a| matches!(a, Action::TakeTicket(_)))
}

/// First overall bet whose round-proxy probability exceeds `threshold`, winners before losers.
fn obvious_overall(legal: &[Action], outcome: &RoundOutcome, threshold: f64) -> Option<Action> {
    let dist = &outcome.distribution;
    let p = |a: &Action| match *a {
        Action::BetOverall { camel, side: OverallSide::Winner } => Some((0, dist.p_first(camel))),
        Action::BetOverall { camel, side: OverallSide::Loser } => Some((1, dist.p_last(camel))),
        _ => None,
    };
    let mut bets: Vec<(usize, f64, Action)> = legal.iter().filter_map(|a| p(a).map(|(side, prob)| (side, prob, *a))).collect();
    bets.sort_by_key(|&(side, _, _)| side);
    bets.into_iter().find(|&(_, prob, _)| prob > threshold).map(|(_, _, a)| a)
}

/// Explicit name → strategy table handed to the harness.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<(String, Strategy)>,
}

impl StrategyRegistry {
    pub fn new() -> Self { Self::default() }

    /// Every built-in strategy under its usual name.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register("random", Strategy::Random);
        reg.register("greedy", Strategy::greedy());
        reg.register("greedy-fast", Strategy::greedy_fast());
        reg.register("bounded", Strategy::bounded_greedy(2));
        reg.register("heuristic", Strategy::heuristic());
        reg.register("conservative", Strategy::conservative());
        reg
    }

    /// Add or replace `name`.
    pub fn register(&mut self, name: impl Into<String>, strategy: Strategy) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = strategy,
            None => self.entries.push((name, strategy)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> { self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.entries.iter().map(|(n, _)| n.as_str()) }
}

/// Summary of one finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub seed: u64,
    pub scores: Vec<u32>,
    pub winners: Vec<PlayerId>,
    pub rounds: u32,
    pub turns: usize,
}

/// Play one game with seat `i` controlled by `strategies[i]`.
///
/// The same seed always yields the same game: setup, dice and tie-breaks
/// all come from one `StdRng`.
pub fn play_game(strategies: &[Strategy], rules: RuleSet, seed: u64) -> Result<GameRecord, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = GameState::new_game(strategies.len(), rules, &mut rng)?;
    for turn in 0..MAX_TURNS {
        if state.finished {
            debug!(seed, turns = turn, rounds = state.round, scores = ?state.scores(), "game finished");
            return Ok(GameRecord { seed, scores: state.scores(), winners: state.winners(), rounds: state.round, turns: turn });
        }
        let action = strategies[state.current].choose_action(&state, &mut rng)?;
        state.apply(action, &mut rng)?;
    }
    Err(EngineError::invariant(format!("game {seed} did not finish within {MAX_TURNS} turns")))
}
